//! Streaming decompressor.
//!
//! [`Decompressor`] mirrors [`Compressor`](crate::Compressor) in the inverse
//! direction and adds a growable one-shot path for payloads whose
//! decompressed size is not known up front.
//!
//! ## End of stream
//!
//! When the codec reaches the end of a compressed unit, streaming calls
//! return [`StepStatus::StreamEnd`] and leave any bytes after the unit
//! unconsumed in the input cursor. Concatenated units are not decoded. The
//! one-shot paths treat such trailing bytes as [`StreamError::CorruptData`].

use crate::algorithm::CompressionAlgorithm;
use crate::codec::InflateContext;
use bytes::BytesMut;
use log::debug;
use oxistream_core::buffer::{ReadCursor, WriteCursor};
use oxistream_core::engine::StreamEngine;
use oxistream_core::error::{Result, StreamError};
use oxistream_core::traits::{FlushMode, StepStatus, StreamState};

/// Output sizing for growable decompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthPolicy {
    /// Smallest output buffer to start with.
    pub initial_capacity: usize,
    /// Largest output the decompression may produce.
    pub max_size: usize,
}

impl GrowthPolicy {
    /// 4 KiB start, 256 MiB ceiling.
    pub const DEFAULT: Self = Self {
        initial_capacity: 4096,
        max_size: 256 * 1024 * 1024,
    };

    /// No ceiling beyond addressable memory.
    pub const UNBOUNDED: Self = Self {
        initial_capacity: 4096,
        max_size: usize::MAX,
    };

    /// Create a policy with the default start size and the given ceiling.
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::DEFAULT
        }
    }

    /// First output capacity for `input_len` compressed bytes.
    ///
    /// Twice the input length, but at least `initial_capacity`, and never
    /// more than `max_size`.
    pub fn initial_capacity_for(&self, input_len: usize) -> usize {
        input_len
            .saturating_mul(2)
            .max(self.initial_capacity)
            .min(self.max_size)
    }

    /// Next capacity after an overflow at `current`, or `None` at the ceiling.
    pub fn grow(&self, current: usize) -> Option<usize> {
        if current >= self.max_size {
            return None;
        }
        Some(current.saturating_mul(2).max(1).min(self.max_size))
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Streaming decompressor for one algorithm.
#[derive(Debug)]
pub struct Decompressor {
    algorithm: CompressionAlgorithm,
    engine: StreamEngine<InflateContext>,
}

impl Decompressor {
    /// Create a decompressor; call [`Decompressor::start`] before streaming.
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self {
            algorithm,
            engine: StreamEngine::new(algorithm.params()),
        }
    }

    /// The algorithm this decompressor expects.
    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.engine.state()
    }

    /// Whether the end of the compressed unit has been reached.
    pub fn is_stream_end(&self) -> bool {
        self.engine.is_ended()
    }

    /// Compressed bytes consumed since the last start.
    pub fn total_in(&self) -> u64 {
        self.engine.total_in()
    }

    /// Decompressed bytes produced since the last start.
    pub fn total_out(&self) -> u64 {
        self.engine.total_out()
    }

    /// Begin decoding a new compressed unit.
    pub fn start(&mut self) -> Result<()> {
        self.engine.start()
    }

    /// Verify the unit is complete and release the codec.
    ///
    /// Fails with `CorruptData` if the end of the unit was never reached; the
    /// decompressor is `Finished` either way.
    pub fn finish(&mut self) -> Result<()> {
        self.engine.finish()
    }

    /// Run a single codec step with an explicit flush mode.
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
        self.engine.step_cursors(input, output, flush)
    }

    /// Decompress the readable bytes of `input` into `output`.
    ///
    /// Returns [`StepStatus::Ok`] once all input is consumed, or
    /// [`StepStatus::StreamEnd`] when the unit is complete (trailing input is
    /// left in place). Fails with [`StreamError::BufferOverflow`] when
    /// `output` fills first; reissue with the same input cursor and more
    /// space to continue.
    pub fn decompress_stream<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<StepStatus>
    where
        R: ReadCursor,
        W: WriteCursor,
    {
        match self.step(input, output, FlushMode::None)? {
            StepStatus::NeedMoreOutput => {
                debug!(
                    "decompression output exhausted with {} input bytes left",
                    input.readable_bytes()
                );
                Err(StreamError::BufferOverflow)
            }
            StepStatus::StreamEnd => {
                let trailing = input.readable_bytes();
                if trailing > 0 {
                    debug!("end of stream with {trailing} trailing bytes left unconsumed");
                }
                Ok(StepStatus::StreamEnd)
            }
            StepStatus::Ok => Ok(StepStatus::Ok),
        }
    }

    /// One-shot decompression of a complete unit into a caller buffer.
    ///
    /// The input must hold exactly one complete unit. The decompressor is
    /// `Finished` and reusable afterwards, also on error.
    pub fn decompress<R, W>(&mut self, input: &mut R, output: &mut W) -> Result<()>
    where
        R: ReadCursor,
        W: WriteCursor,
    {
        self.start()?;
        let result = self
            .decompress_stream(input, output)
            .and_then(|status| check_complete(status, input.readable_bytes()));
        self.complete(result)
    }

    /// One-shot decompression into a buffer that grows on demand.
    ///
    /// Output starts small and doubles on every overflow, resuming from the
    /// exact point the codec stopped. Fails with
    /// [`StreamError::MaxSizeError`] once more than `max_size` bytes would be
    /// needed.
    pub fn decompress_growable<R: ReadCursor>(
        &mut self,
        input: &mut R,
        max_size: usize,
    ) -> Result<BytesMut> {
        self.decompress_with_policy(input, GrowthPolicy::with_max_size(max_size))
    }

    /// Growable one-shot decompression with explicit sizing.
    pub fn decompress_with_policy<R: ReadCursor>(
        &mut self,
        input: &mut R,
        policy: GrowthPolicy,
    ) -> Result<BytesMut> {
        self.start()?;
        let result = self.drive_growable(input, policy);
        match result {
            Ok(output) => {
                self.finish()?;
                Ok(output)
            }
            Err(err) => {
                let _ = self.finish();
                Err(err)
            }
        }
    }

    fn drive_growable<R: ReadCursor>(
        &mut self,
        input: &mut R,
        policy: GrowthPolicy,
    ) -> Result<BytesMut> {
        let mut capacity = policy.initial_capacity_for(input.readable_bytes());
        let mut output = BytesMut::zeroed(capacity);
        let mut filled = 0;

        loop {
            let progress = self
                .engine
                .step(input.readable(), &mut output[filled..], FlushMode::None);
            input.advance_reader(progress.consumed);
            filled += progress.produced;

            match progress.status? {
                StepStatus::StreamEnd => break,
                StepStatus::Ok => {
                    return Err(StreamError::corrupt(
                        "compressed data ended before the end of the stream",
                    ));
                }
                StepStatus::NeedMoreOutput => {
                    let Some(next) = policy.grow(capacity) else {
                        debug!("growable decompression hit the {} byte ceiling", policy.max_size);
                        return Err(StreamError::max_size(policy.max_size));
                    };
                    debug!("growing decompression output from {capacity} to {next} bytes");
                    output.resize(next, 0);
                    capacity = next;
                }
            }
        }

        check_complete(StepStatus::StreamEnd, input.readable_bytes())?;
        output.truncate(filled);
        Ok(output)
    }

    fn complete(&mut self, result: Result<()>) -> Result<()> {
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

fn check_complete(status: StepStatus, trailing: usize) -> Result<()> {
    if status != StepStatus::StreamEnd {
        return Err(StreamError::corrupt(
            "compressed data ended before the end of the stream",
        ));
    }
    if trailing > 0 {
        return Err(StreamError::corrupt(format!(
            "{trailing} trailing bytes after the end of the stream"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 13) as u8 ^ (i / 97) as u8).collect()
    }

    #[test]
    fn test_growth_policy() {
        let policy = GrowthPolicy::with_max_size(10_000);
        assert_eq!(policy.initial_capacity_for(100), 4096);
        assert_eq!(policy.initial_capacity_for(3000), 6000);
        assert_eq!(policy.initial_capacity_for(9000), 10_000);

        assert_eq!(policy.grow(4096), Some(8192));
        assert_eq!(policy.grow(8192), Some(10_000));
        assert_eq!(policy.grow(10_000), None);
        assert_eq!(GrowthPolicy::with_max_size(8).grow(0), Some(1));
    }

    #[test]
    fn test_decompress_one_shot() {
        let data = sample(10_000);
        let compressed = gzip(&data);
        let mut decompressor = CompressionAlgorithm::GZIP.decompressor();

        let mut input: &[u8] = &compressed;
        let mut output = BytesMut::with_capacity(data.len());
        decompressor.decompress(&mut input, &mut output).unwrap();

        assert_eq!(&output[..], &data[..]);
        assert!(input.is_empty());
        assert_eq!(decompressor.state(), StreamState::Finished);
    }

    #[test]
    fn test_decompress_truncated_is_corrupt() {
        let compressed = gzip(&sample(2000));
        let mut input: &[u8] = &compressed[..compressed.len() - 4];
        let mut output = BytesMut::with_capacity(4096);

        let err = CompressionAlgorithm::GZIP
            .decompressor()
            .decompress(&mut input, &mut output)
            .unwrap_err();
        assert!(matches!(err, StreamError::CorruptData { .. }));
    }

    #[test]
    fn test_trailing_bytes_left_in_stream_mode() {
        let data = sample(500);
        let mut compressed = gzip(&data);
        compressed.extend_from_slice(b"TRAILER");

        let mut decompressor = CompressionAlgorithm::GZIP.decompressor();
        decompressor.start().unwrap();
        let mut input: &[u8] = &compressed;
        let mut output = BytesMut::with_capacity(1024);
        let status = decompressor.decompress_stream(&mut input, &mut output).unwrap();

        assert_eq!(status, StepStatus::StreamEnd);
        assert_eq!(input, b"TRAILER");
        assert_eq!(&output[..], &data[..]);
        assert!(decompressor.is_stream_end());

        // Further input is never consumed once the unit has ended.
        let status = decompressor.decompress_stream(&mut input, &mut output).unwrap();
        assert_eq!(status, StepStatus::StreamEnd);
        assert_eq!(input, b"TRAILER");
        decompressor.finish().unwrap();
    }

    #[test]
    fn test_trailing_bytes_rejected_in_one_shot() {
        let mut compressed = gzip(&sample(500));
        compressed.extend_from_slice(b"junk");
        let mut input: &[u8] = &compressed;
        let mut output = BytesMut::with_capacity(1024);

        let err = CompressionAlgorithm::GZIP
            .decompressor()
            .decompress(&mut input, &mut output)
            .unwrap_err();
        assert!(matches!(err, StreamError::CorruptData { .. }));
        assert_eq!(input, b"junk");
    }

    #[test]
    fn test_growable_decompression() {
        let data = sample(100_000);
        let compressed = gzip(&data);
        let mut decompressor = CompressionAlgorithm::GZIP.decompressor();

        let mut input: &[u8] = &compressed;
        let output = decompressor
            .decompress_with_policy(
                &mut input,
                GrowthPolicy {
                    initial_capacity: 16,
                    max_size: 1 << 20,
                },
            )
            .unwrap();

        assert_eq!(&output[..], &data[..]);
        assert!(input.is_empty());
        // Every byte was produced exactly once.
        assert_eq!(decompressor.total_out(), data.len() as u64);
        assert_eq!(decompressor.total_in(), compressed.len() as u64);
    }

    #[test]
    fn test_growable_max_size() {
        let data = vec![0u8; 50_000];
        let compressed = gzip(&data);
        let mut input: &[u8] = &compressed;

        let err = CompressionAlgorithm::GZIP
            .decompressor()
            .decompress_growable(&mut input, 10_000)
            .unwrap_err();
        assert_eq!(err, StreamError::max_size(10_000));
    }

    #[test]
    fn test_growable_within_max_size() {
        let data = vec![7u8; 4000];
        let compressed = gzip(&data);
        let mut input: &[u8] = &compressed;

        let output = CompressionAlgorithm::GZIP
            .decompressor()
            .decompress_growable(&mut input, 4096)
            .unwrap();
        assert_eq!(output.len(), 4000);
    }

    #[test]
    fn test_finish_before_end_is_corrupt() {
        let compressed = gzip(&sample(3000));
        let mut decompressor = CompressionAlgorithm::GZIP.decompressor();
        decompressor.start().unwrap();

        let mut input: &[u8] = &compressed[..compressed.len() / 2];
        let mut output = BytesMut::with_capacity(8192);
        assert_eq!(
            decompressor.decompress_stream(&mut input, &mut output),
            Ok(StepStatus::Ok)
        );
        assert!(matches!(
            decompressor.finish(),
            Err(StreamError::CorruptData { .. })
        ));
        assert_eq!(decompressor.state(), StreamState::Finished);
    }

    #[test]
    fn test_corrupt_data_poisons_stream() {
        let mut decompressor = CompressionAlgorithm::ZLIB.decompressor();
        decompressor.start().unwrap();
        let mut input: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF];
        let mut output = BytesMut::with_capacity(64);

        let err = decompressor.decompress_stream(&mut input, &mut output).unwrap_err();
        assert!(err.is_terminal());

        let mut more: &[u8] = &[0x78, 0x9C];
        assert_eq!(
            decompressor.decompress_stream(&mut more, &mut output),
            Err(err.clone())
        );
        assert_eq!(more.len(), 2);
        assert_eq!(decompressor.finish(), Err(err));

        // A fresh start makes the instance usable again.
        let data = sample(64);
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&data).unwrap();
        let compressed = encoder.finish().unwrap();
        let mut input: &[u8] = &compressed;
        let mut output = BytesMut::with_capacity(128);
        decompressor.decompress(&mut input, &mut output).unwrap();
        assert_eq!(&output[..], &data[..]);
    }
}
