//! Streaming compressor.
//!
//! A [`Compressor`] drives a [`StreamEngine`] in the compression direction.
//! Input is consumed from a [`ReadCursor`] and compressed bytes are appended
//! to a [`WriteCursor`] without ever growing it.
//!
//! Every codec step runs against an internal staging buffer sized from the
//! deflate bound, then as much as fits is copied to the caller. When the
//! output fills up the call fails with [`StreamError::BufferOverflow`] and
//! the rest stays staged; reissuing the call with more output space only
//! drains it. The codec therefore sees the same calls whatever the caller's
//! buffer sizes, and the compressed bytes are identical to a single
//! unconstrained call.
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use oxistream_deflate::CompressionAlgorithm;
//!
//! let mut compressor = CompressionAlgorithm::GZIP.compressor();
//! let mut input = BytesMut::from(&b"hello hello hello hello"[..]);
//! let mut output = BytesMut::with_capacity(compressor.deflate_bound(input.len()));
//!
//! compressor.start().unwrap();
//! compressor.compress_stream(&mut input, &mut output, true).unwrap();
//! compressor.finish().unwrap();
//! assert!(input.is_empty());
//! ```

use crate::algorithm::CompressionAlgorithm;
use crate::codec::DeflateContext;
use bytes::{Buf, BytesMut};
use log::debug;
use oxistream_core::buffer::{ReadCursor, WriteCursor};
use oxistream_core::engine::StreamEngine;
use oxistream_core::error::{Result, StreamError};
use oxistream_core::traits::{FlushMode, StepStatus, StreamState};

/// Streaming compressor for one algorithm.
#[derive(Debug)]
pub struct Compressor {
    algorithm: CompressionAlgorithm,
    engine: StreamEngine<DeflateContext>,
    /// Input consumed since the last step that drained the codec.
    buffered_input: usize,
    /// Compressed bytes produced by the codec and not yet handed out.
    staged: BytesMut,
    /// Flush and status of the step whose output is still staged.
    staged_step: Option<(FlushMode, StepStatus)>,
}

impl Compressor {
    /// Create a compressor; call [`Compressor::start`] before streaming.
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self {
            algorithm,
            engine: StreamEngine::new(algorithm.params()),
            buffered_input: 0,
            staged: BytesMut::new(),
            staged_step: None,
        }
    }

    /// The algorithm this compressor produces.
    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.engine.state()
    }

    /// Uncompressed bytes consumed since the last start.
    pub fn total_in(&self) -> u64 {
        self.engine.total_in()
    }

    /// Compressed bytes handed out since the last start.
    pub fn total_out(&self) -> u64 {
        self.engine.total_out() - self.staged.len() as u64
    }

    /// Compressed bytes waiting for output space after an overflow.
    pub fn pending_output(&self) -> usize {
        self.staged.len()
    }

    /// Begin a new compressed unit.
    pub fn start(&mut self) -> Result<()> {
        self.engine.start()?;
        self.reset_staging();
        Ok(())
    }

    /// End the unit and release the codec.
    ///
    /// This is a no-op completion after a finalising call. If the unit was
    /// never finalised, or compressed bytes are still waiting for output
    /// space, it is incomplete and `CorruptData` is returned; the compressor
    /// is `Finished` either way.
    pub fn finish(&mut self) -> Result<()> {
        let undelivered = self.staged.len();
        self.reset_staging();
        self.engine.finish()?;
        if undelivered > 0 {
            debug!("finished with {undelivered} compressed bytes never written");
            return Err(StreamError::corrupt(format!(
                "{undelivered} compressed bytes were never written to an output"
            )));
        }
        Ok(())
    }

    fn reset_staging(&mut self) {
        self.buffered_input = 0;
        self.staged.clear();
        self.staged_step = None;
    }

    /// Pure upper bound on the compressed size of `input_len` bytes.
    pub fn deflate_bound(&self, input_len: usize) -> usize {
        self.algorithm.deflate_bound(input_len)
    }

    /// Upper bound on the output the next draining call can produce when
    /// `remaining_input` more bytes are offered.
    ///
    /// Unlike [`Compressor::deflate_bound`] this accounts for input the codec
    /// is still holding from earlier non-draining or overflowed calls.
    pub fn output_bound(&self, remaining_input: usize) -> usize {
        self.staged
            .len()
            .saturating_add(self.codec_bound(remaining_input))
    }

    fn codec_bound(&self, remaining_input: usize) -> usize {
        self.deflate_bound(remaining_input.saturating_add(self.buffered_input))
    }

    /// Run a single codec step with an explicit flush mode.
    ///
    /// Returns [`StepStatus::NeedMoreOutput`] instead of an error when the
    /// output fills up.
    pub fn step<R, W>(
        &mut self,
        input: &mut R,
        output: &mut W,
        flush: FlushMode,
    ) -> Result<StepStatus>
    where
        R: ReadCursor,
        W: WriteCursor,
    {
        if self.engine.state() != StreamState::Active {
            return Err(StreamError::StreamNotStarted);
        }
        if self.engine.is_ended() && input.readable_bytes() > 0 {
            debug!("input offered after the unit was finalised");
            return Err(StreamError::StreamNotStarted);
        }

        // Hand out what an earlier overflowed step left behind.
        if !self.staged.is_empty() {
            self.drain_staged(output);
            if !self.staged.is_empty() {
                return Ok(StepStatus::NeedMoreOutput);
            }
        }
        let drained_step = self
            .staged_step
            .take()
            .filter(|(staged_flush, _)| *staged_flush == flush && input.readable_bytes() == 0);
        if let Some((_, status)) = drained_step {
            return Ok(status);
        }
        if self.engine.is_ended() {
            return Ok(StepStatus::StreamEnd);
        }

        let before = input.readable_bytes();
        let result = self.run_codec(input, flush);
        let consumed = before - input.readable_bytes();

        match &result {
            Ok(StepStatus::Ok | StepStatus::StreamEnd) if flush.drains() => self.buffered_input = 0,
            _ => self.buffered_input = self.buffered_input.saturating_add(consumed),
        }

        self.drain_staged(output);
        let status = match result {
            Ok(status) => status,
            Err(err) => {
                self.staged.clear();
                return Err(err);
            }
        };
        if self.staged.is_empty() {
            Ok(status)
        } else {
            self.staged_step = Some((flush, status));
            Ok(StepStatus::NeedMoreOutput)
        }
    }

    /// Step the codec into the staging buffer until it has all it needs.
    fn run_codec<R: ReadCursor>(&mut self, input: &mut R, flush: FlushMode) -> Result<StepStatus> {
        loop {
            let room = self.codec_bound(input.readable_bytes());
            self.staged.reserve(room);

            let before = (input.readable_bytes(), self.staged.len());
            let status = self.engine.step_cursors(input, &mut self.staged, flush)?;
            if status != StepStatus::NeedMoreOutput {
                return Ok(status);
            }
            if before == (input.readable_bytes(), self.staged.len()) {
                return Err(StreamError::resource("deflate made no progress"));
            }
        }
    }

    /// Copy as much staged output as fits into `output`.
    fn drain_staged<W: WriteCursor>(&mut self, output: &mut W) {
        let staged = &self.staged;
        let copied = output.append_with(|spare| {
            let count = spare.len().min(staged.len());
            spare[..count].copy_from_slice(&staged[..count]);
            (count, count)
        });
        self.staged.advance(copied);
    }

    /// Compress the readable bytes of `input` into `output`.
    ///
    /// With `finalise == false` everything compressed so far is flushed to
    /// `output` while the history window is kept, so later chunks still
    /// compress against it. With `finalise == true` the unit is completed and
    /// a following [`Compressor::finish`] is a no-op completion.
    pub fn compress_stream<R, W>(
        &mut self,
        input: &mut R,
        output: &mut W,
        finalise: bool,
    ) -> Result<()>
    where
        R: ReadCursor,
        W: WriteCursor,
    {
        let flush = if finalise {
            FlushMode::Finish
        } else {
            FlushMode::Partial
        };
        self.compress_stream_with_flush(input, output, flush)
    }

    /// Compress the readable bytes of `input` into `output` with any flush policy.
    ///
    /// Fails with [`StreamError::BufferOverflow`] if `output` fills before the
    /// step drains; the bytes already written stay valid and the call can be
    /// reissued with the same input cursor.
    pub fn compress_stream_with_flush<R, W>(
        &mut self,
        input: &mut R,
        output: &mut W,
        flush: FlushMode,
    ) -> Result<()>
    where
        R: ReadCursor,
        W: WriteCursor,
    {
        match self.step(input, output, flush)? {
            StepStatus::NeedMoreOutput => {
                debug!(
                    "compression output exhausted with {} bytes staged",
                    self.staged.len()
                );
                Err(StreamError::BufferOverflow)
            }
            StepStatus::Ok | StepStatus::StreamEnd => Ok(()),
        }
    }

    /// Complete the unit without new input, writing the remaining output.
    ///
    /// Can be retried after [`StreamError::BufferOverflow`]. Once the unit is
    /// complete and everything is written this does nothing.
    pub fn finish_into<W: WriteCursor>(&mut self, output: &mut W) -> Result<()> {
        let mut empty: &[u8] = &[];
        self.compress_stream_with_flush(&mut empty, output, FlushMode::Finish)
    }

    /// One-shot compression of a whole buffer.
    ///
    /// Starts, compresses and finishes. The compressor is `Finished` and
    /// reusable afterwards, also on error.
    pub fn compress<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<()>
    where
        R: ReadCursor,
        W: WriteCursor,
    {
        self.compress_with_flush(input, output, FlushMode::Finish)
    }

    /// One-shot compression with a caller-chosen flush for the data step.
    ///
    /// The data is compressed with `flush`, then the unit is finalised. With
    /// [`FlushMode::Full`] the output ends in a full flush point followed by
    /// an empty final block.
    pub fn compress_with_flush<R, W>(
        &mut self,
        input: &mut R,
        output: &mut W,
        flush: FlushMode,
    ) -> Result<()>
    where
        R: ReadCursor,
        W: WriteCursor,
    {
        self.start()?;
        let result = self
            .compress_stream_with_flush(input, output, flush)
            .and_then(|()| self.finish_into(output));
        match result {
            Ok(()) => self.finish(),
            Err(err) => {
                // The unit is incomplete; finish only releases the codec here.
                let _ = self.finish();
                Err(err)
            }
        }
    }
}
