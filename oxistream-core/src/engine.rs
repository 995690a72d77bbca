//! Stream engine: the lifecycle and streaming primitive shared by both directions.
//!
//! A [`StreamEngine`] owns at most one [`CodecContext`]. The context lives
//! inside the `Active` state, so it is created by [`StreamEngine::start`] and
//! released by [`StreamEngine::finish`], by a restart, or when the engine is
//! dropped. It is never reachable outside an active period.
//!
//! ```text
//!              start()                 finish()
//! NotStarted ──────────▶ Active ──────────────────▶ Finished
//!                          ▲  │ step()*                │
//!                          │  ▼                        │
//!                          └──┴──────── start() ◀──────┘
//! ```

use crate::buffer::{ReadCursor, WriteCursor};
use crate::error::{Result, StreamError};
use crate::traits::{CodecContext, FlushMode, Progress, StepStatus, StreamState};
use log::{debug, trace, warn};
use std::fmt;

enum Lifecycle<C> {
    NotStarted,
    Active(ActiveStream<C>),
    Finished,
}

struct ActiveStream<C> {
    context: C,
    /// The codec reported the end of the compressed unit.
    ended: bool,
    /// Terminal error replayed to every later call.
    poisoned: Option<StreamError>,
}

/// A single-direction stream over one codec context.
pub struct StreamEngine<C: CodecContext> {
    params: C::Params,
    lifecycle: Lifecycle<C>,
    total_in: u64,
    total_out: u64,
}

impl<C: CodecContext> StreamEngine<C> {
    /// Create an engine that has not started yet.
    pub fn new(params: C::Params) -> Self {
        Self {
            params,
            lifecycle: Lifecycle::NotStarted,
            total_in: 0,
            total_out: 0,
        }
    }

    /// Parameters used to initialize each codec context.
    pub fn params(&self) -> C::Params {
        self.params
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        match self.lifecycle {
            Lifecycle::NotStarted => StreamState::NotStarted,
            Lifecycle::Active(_) => StreamState::Active,
            Lifecycle::Finished => StreamState::Finished,
        }
    }

    /// Whether the codec reported the end of the unit during this active period.
    pub fn is_ended(&self) -> bool {
        matches!(&self.lifecycle, Lifecycle::Active(active) if active.ended)
    }

    /// Whether a terminal error has disabled further streaming.
    pub fn is_poisoned(&self) -> bool {
        matches!(&self.lifecycle, Lifecycle::Active(active) if active.poisoned.is_some())
    }

    /// Bytes consumed since the last start.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Bytes produced since the last start.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Create a fresh codec context and enter the `Active` state.
    ///
    /// Starting an already active engine discards its live context.
    pub fn start(&mut self) -> Result<()> {
        let context = C::initialize(&self.params)?;
        if matches!(self.lifecycle, Lifecycle::Active(_)) {
            debug!("restarting active stream, discarding codec context");
        }
        self.lifecycle = Lifecycle::Active(ActiveStream {
            context,
            ended: false,
            poisoned: None,
        });
        self.total_in = 0;
        self.total_out = 0;
        debug!("stream started with {:?}", self.params);
        Ok(())
    }

    /// Run one codec step over plain slices.
    ///
    /// The returned counts are exact on every path; the caller is responsible
    /// for advancing its own positions by them.
    pub fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Progress {
        let active = match &mut self.lifecycle {
            Lifecycle::Active(active) => active,
            _ => return Progress::failed(StreamError::StreamNotStarted),
        };
        if let Some(err) = &active.poisoned {
            return Progress::failed(err.clone());
        }

        let progress = active.context.step(input, output, flush);
        self.total_in += progress.consumed as u64;
        self.total_out += progress.produced as u64;
        trace!(
            "step flush={:?} in={} out={} consumed={} produced={} status={:?}",
            flush,
            input.len(),
            output.len(),
            progress.consumed,
            progress.produced,
            progress.status
        );

        match &progress.status {
            Ok(StepStatus::StreamEnd) => active.ended = true,
            Err(err) if err.is_terminal() => {
                warn!("stream disabled after terminal error: {}", err);
                active.poisoned = Some(err.clone());
            }
            _ => {}
        }
        progress
    }

    /// Run one codec step between two cursors, advancing both by the bytes moved.
    ///
    /// Cursors are advanced even when the step fails, so they always reflect
    /// the work done.
    pub fn step_cursors<R, W>(
        &mut self,
        input: &mut R,
        output: &mut W,
        flush: FlushMode,
    ) -> Result<StepStatus>
    where
        R: ReadCursor,
        W: WriteCursor,
    {
        let progress = output.append_with(|spare| {
            let progress = self.step(input.readable(), spare, flush);
            (progress.produced, progress)
        });
        input.advance_reader(progress.consumed);
        progress.status
    }

    /// Complete the stream and release the codec context.
    ///
    /// Unless the codec already reported the end of the unit, a final
    /// `Finish` step is run with no input and no output space; if that does
    /// not complete the unit the stream is incomplete and `CorruptData` is
    /// returned. The engine is `Finished` afterwards on every path.
    pub fn finish(&mut self) -> Result<()> {
        let mut active = match std::mem::replace(&mut self.lifecycle, Lifecycle::Finished) {
            Lifecycle::Active(active) => active,
            other => {
                self.lifecycle = other;
                return Err(StreamError::StreamNotStarted);
            }
        };

        if let Some(err) = active.poisoned.take() {
            debug!("finishing poisoned stream");
            return Err(err);
        }
        if active.ended {
            debug!(
                "stream finished: {} bytes in, {} bytes out",
                self.total_in, self.total_out
            );
            return Ok(());
        }

        let progress = active.context.step(&[], &mut [], FlushMode::Finish);
        match progress.status {
            Ok(StepStatus::StreamEnd) => Ok(()),
            Err(err) if err.is_terminal() => Err(err),
            _ => {
                debug!(
                    "stream finished before completion after {} bytes in",
                    self.total_in
                );
                Err(StreamError::corrupt(
                    "stream finished before the codec reached the end of the unit",
                ))
            }
        }
    }
}

impl<C: CodecContext> fmt::Debug for StreamEngine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamEngine")
            .field("params", &self.params)
            .field("state", &self.state())
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish_non_exhaustive()
    }
}

impl<C: CodecContext> Drop for StreamEngine<C> {
    fn drop(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Active(_)) {
            debug!("dropping active stream, releasing codec context");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static LIVE_CONTEXTS: Cell<usize> = const { Cell::new(0) };
    }

    #[derive(Debug, Clone, Copy)]
    struct EchoParams {
        fail_init: bool,
    }

    /// Copies input to output; a 0xEE byte is treated as corrupt data and an
    /// empty `Finish` step ends the unit.
    struct EchoCodec;

    impl CodecContext for EchoCodec {
        type Params = EchoParams;

        fn initialize(params: &EchoParams) -> Result<Self> {
            if params.fail_init {
                return Err(StreamError::resource("no memory"));
            }
            LIVE_CONTEXTS.with(|n| n.set(n.get() + 1));
            Ok(EchoCodec)
        }

        fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Progress {
            let count = input.len().min(output.len());
            if let Some(bad) = input[..count].iter().position(|&b| b == 0xEE) {
                output[..bad].copy_from_slice(&input[..bad]);
                return Progress::new(bad, bad, Err(StreamError::corrupt("bad byte")));
            }
            output[..count].copy_from_slice(&input[..count]);
            let status = if count < input.len() {
                StepStatus::NeedMoreOutput
            } else if input.is_empty() && flush == FlushMode::Finish {
                StepStatus::StreamEnd
            } else {
                StepStatus::Ok
            };
            Progress::new(count, count, Ok(status))
        }
    }

    impl Drop for EchoCodec {
        fn drop(&mut self) {
            LIVE_CONTEXTS.with(|n| n.set(n.get() - 1));
        }
    }

    fn live() -> usize {
        LIVE_CONTEXTS.with(|n| n.get())
    }

    fn engine() -> StreamEngine<EchoCodec> {
        StreamEngine::new(EchoParams { fail_init: false })
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut engine = engine();
        assert_eq!(engine.state(), StreamState::NotStarted);

        engine.start().unwrap();
        assert_eq!(engine.state(), StreamState::Active);

        let progress = engine.step(&[], &mut [], FlushMode::Finish);
        assert_eq!(progress.status, Ok(StepStatus::StreamEnd));
        assert!(engine.is_ended());

        engine.finish().unwrap();
        assert_eq!(engine.state(), StreamState::Finished);

        engine.start().unwrap();
        assert_eq!(engine.state(), StreamState::Active);
        assert_eq!(engine.total_in(), 0);
    }

    #[test]
    fn test_step_before_start() {
        let mut engine = engine();
        let progress = engine.step(b"abc", &mut [0u8; 8], FlushMode::None);
        assert_eq!(progress.status, Err(StreamError::StreamNotStarted));
        assert_eq!(engine.finish(), Err(StreamError::StreamNotStarted));
        assert_eq!(engine.state(), StreamState::NotStarted);
    }

    #[test]
    fn test_finish_twice() {
        let mut engine = engine();
        engine.start().unwrap();
        engine.finish().unwrap();
        assert_eq!(engine.finish(), Err(StreamError::StreamNotStarted));
    }

    #[test]
    fn test_cursor_partial_progress() {
        let mut engine = engine();
        engine.start().unwrap();

        let mut input: &[u8] = b"0123456789";
        let mut output: Vec<u8> = Vec::with_capacity(4);
        let status = engine
            .step_cursors(&mut input, &mut output, FlushMode::None)
            .unwrap();

        assert_eq!(status, StepStatus::NeedMoreOutput);
        assert_eq!(output.len(), output.capacity().min(10));
        assert_eq!(input.len(), 10 - output.len());

        let mut rest: Vec<u8> = Vec::with_capacity(16);
        let status = engine
            .step_cursors(&mut input, &mut rest, FlushMode::None)
            .unwrap();
        assert_eq!(status, StepStatus::Ok);
        assert!(input.is_empty());

        output.extend_from_slice(&rest);
        assert_eq!(output, b"0123456789");
        assert_eq!(engine.total_in(), 10);
        assert_eq!(engine.total_out(), 10);
    }

    #[test]
    fn test_cursors_advance_on_error() {
        let mut engine = engine();
        engine.start().unwrap();

        let mut input: &[u8] = &[1, 2, 0xEE, 4];
        let mut output: Vec<u8> = Vec::with_capacity(16);
        let err = engine
            .step_cursors(&mut input, &mut output, FlushMode::None)
            .unwrap_err();

        assert!(matches!(err, StreamError::CorruptData { .. }));
        assert_eq!(output, vec![1u8, 2]);
        assert_eq!(input, &[0xEE_u8, 4]);
    }

    #[test]
    fn test_terminal_error_poisons_until_restart() {
        let mut engine = engine();
        engine.start().unwrap();

        let progress = engine.step(&[0xEE], &mut [0u8; 4], FlushMode::None);
        assert!(progress.status.is_err());
        assert!(engine.is_poisoned());

        let again = engine.step(b"ok", &mut [0u8; 4], FlushMode::None);
        assert_eq!(again.consumed, 0);
        assert!(matches!(again.status, Err(StreamError::CorruptData { .. })));

        assert!(matches!(
            engine.finish(),
            Err(StreamError::CorruptData { .. })
        ));
        assert_eq!(engine.state(), StreamState::Finished);

        engine.start().unwrap();
        let progress = engine.step(b"ok", &mut [0u8; 4], FlushMode::None);
        assert_eq!(progress.status, Ok(StepStatus::Ok));
    }

    #[test]
    fn test_finish_runs_final_step() {
        let mut engine = engine();
        engine.start().unwrap();
        let progress = engine.step(b"abc", &mut [0u8; 8], FlushMode::None);
        assert_eq!(progress.status, Ok(StepStatus::Ok));
        assert!(!engine.is_ended());

        // The echo codec ends on an empty Finish step.
        engine.finish().unwrap();
        assert_eq!(engine.state(), StreamState::Finished);
    }

    #[test]
    fn test_start_failure_reports_resource_error() {
        let mut engine = StreamEngine::<EchoCodec>::new(EchoParams { fail_init: true });
        assert!(matches!(
            engine.start(),
            Err(StreamError::ResourceError { .. })
        ));
        assert_eq!(engine.state(), StreamState::NotStarted);
    }

    #[test]
    fn test_context_released_on_every_exit() {
        let before = live();
        {
            let mut engine = engine();
            engine.start().unwrap();
            assert_eq!(live(), before + 1);

            // Restart replaces the context.
            engine.start().unwrap();
            assert_eq!(live(), before + 1);

            engine.finish().unwrap();
            assert_eq!(live(), before);

            engine.start().unwrap();
            assert_eq!(live(), before + 1);
        }
        assert_eq!(live(), before);
    }
}
