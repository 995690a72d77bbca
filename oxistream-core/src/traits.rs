//! Core types and traits shared by every stream engine.
//!
//! A codec plugs into the engine through [`CodecContext`]. The engine never
//! sees raw codec status codes; implementations translate them into a
//! [`Progress`] before returning.

use crate::error::{Result, StreamError};

/// Flush mode for a single streaming step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// No flush - the codec may buffer data for best compression.
    #[default]
    None,
    /// Partial flush - emit complete blocks, keep the last few bits pending.
    Partial,
    /// Sync flush - emit all pending output on a byte boundary.
    Sync,
    /// Full flush - emit all pending output and reset the history window.
    Full,
    /// Finish - complete the stream.
    Finish,
}

impl FlushMode {
    /// Whether a completed step in this mode leaves nothing buffered in the codec.
    pub fn drains(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Lifecycle state of a stream engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    /// No codec context exists yet.
    #[default]
    NotStarted,
    /// A codec context is live and streaming calls are accepted.
    Active,
    /// The context was released; a fresh start is required for reuse.
    Finished,
}

/// Outcome of a single streaming step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// All available input and pending output fit into the supplied output.
    Ok,
    /// Output was exhausted before draining; retry with more output space.
    NeedMoreOutput,
    /// The codec reached the logical end of the compressed unit.
    StreamEnd,
}

/// Bytes moved by one step and the classified outcome.
///
/// The counts are exact even when `status` is an error, so cursors can
/// always be advanced by the work the codec actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Progress {
    /// Bytes consumed from the input.
    pub consumed: usize,
    /// Bytes written to the output.
    pub produced: usize,
    /// Classified status, or the error the step failed with.
    pub status: Result<StepStatus>,
}

impl Progress {
    /// Create a new progress record.
    pub fn new(consumed: usize, produced: usize, status: Result<StepStatus>) -> Self {
        Self {
            consumed,
            produced,
            status,
        }
    }

    /// A step that moved no bytes and failed with `error`.
    pub fn failed(error: StreamError) -> Self {
        Self::new(0, 0, Err(error))
    }
}

/// Opaque state of a foreign block codec.
///
/// A context is created by [`CodecContext::initialize`] and destroyed when it
/// is dropped. The engine owns at most one context at a time and never hands
/// it out.
pub trait CodecContext: Sized {
    /// Initialization parameters (window size, header framing, ...).
    type Params: Copy + std::fmt::Debug;

    /// Create a fresh codec context.
    fn initialize(params: &Self::Params) -> Result<Self>;

    /// Transfer bytes from `input` into `output`.
    ///
    /// Reports exactly how many bytes were consumed and produced. Bytes not
    /// consumed must be offered again on the next call.
    fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Progress;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_mode_default() {
        assert_eq!(FlushMode::default(), FlushMode::None);
    }

    #[test]
    fn test_flush_mode_drains() {
        assert!(!FlushMode::None.drains());
        assert!(FlushMode::Partial.drains());
        assert!(FlushMode::Sync.drains());
        assert!(FlushMode::Full.drains());
        assert!(FlushMode::Finish.drains());
    }

    #[test]
    fn test_stream_state_default() {
        assert_eq!(StreamState::default(), StreamState::NotStarted);
    }
}
