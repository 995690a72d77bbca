//! Codec contexts backed by flate2.
//!
//! [`DeflateContext`] and [`InflateContext`] wrap one `flate2` stream each and
//! expose it through [`CodecContext`]. The underlying zlib state is freed
//! when the context is dropped.

use crate::algorithm::{CodecParams, Variant};
use crate::classify::{self, StepShape};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};
use oxistream_core::error::{Result, StreamError};
use oxistream_core::traits::{CodecContext, FlushMode, Progress};
use std::fmt;

fn check_params(params: &CodecParams) -> Result<()> {
    if params.is_valid() {
        Ok(())
    } else {
        Err(StreamError::resource(format!(
            "cannot initialize codec with window bits {}",
            params.window_bits
        )))
    }
}

/// Compression side of the codec.
pub struct DeflateContext {
    inner: Compress,
}

impl CodecContext for DeflateContext {
    type Params = CodecParams;

    fn initialize(params: &CodecParams) -> Result<Self> {
        check_params(params)?;
        let level = Compression::default();
        let inner = match params.header {
            Variant::RawDeflate => Compress::new_with_window_bits(level, false, params.window_bits),
            Variant::Zlib => Compress::new_with_window_bits(level, true, params.window_bits),
            Variant::Gzip => Compress::new_gzip(level, params.window_bits),
        };
        Ok(Self { inner })
    }

    fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Progress {
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let raw = self.inner.compress(input, output, compress_flush(flush));
        let shape = StepShape {
            input_len: input.len(),
            output_len: output.len(),
            consumed: (self.inner.total_in() - in_before) as usize,
            produced: (self.inner.total_out() - out_before) as usize,
        };
        Progress::new(
            shape.consumed,
            shape.produced,
            classify::compress_status(raw, shape, flush),
        )
    }
}

impl fmt::Debug for DeflateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeflateContext")
            .field("total_in", &self.inner.total_in())
            .field("total_out", &self.inner.total_out())
            .finish_non_exhaustive()
    }
}

/// Decompression side of the codec.
pub struct InflateContext {
    inner: Decompress,
}

impl CodecContext for InflateContext {
    type Params = CodecParams;

    fn initialize(params: &CodecParams) -> Result<Self> {
        check_params(params)?;
        let inner = match params.header {
            Variant::RawDeflate => Decompress::new_with_window_bits(false, params.window_bits),
            Variant::Zlib => Decompress::new_with_window_bits(true, params.window_bits),
            Variant::Gzip => Decompress::new_gzip(params.window_bits),
        };
        Ok(Self { inner })
    }

    fn step(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Progress {
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let raw = self.inner.decompress(input, output, decompress_flush(flush));
        let shape = StepShape {
            input_len: input.len(),
            output_len: output.len(),
            consumed: (self.inner.total_in() - in_before) as usize,
            produced: (self.inner.total_out() - out_before) as usize,
        };
        Progress::new(
            shape.consumed,
            shape.produced,
            classify::decompress_status(raw, shape),
        )
    }
}

impl fmt::Debug for InflateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InflateContext")
            .field("total_in", &self.inner.total_in())
            .field("total_out", &self.inner.total_out())
            .finish_non_exhaustive()
    }
}

fn compress_flush(flush: FlushMode) -> FlushCompress {
    match flush {
        FlushMode::None => FlushCompress::None,
        FlushMode::Partial => FlushCompress::Partial,
        FlushMode::Sync => FlushCompress::Sync,
        FlushMode::Full => FlushCompress::Full,
        FlushMode::Finish => FlushCompress::Finish,
    }
}

fn decompress_flush(flush: FlushMode) -> FlushDecompress {
    match flush {
        FlushMode::None | FlushMode::Partial => FlushDecompress::None,
        FlushMode::Sync | FlushMode::Full => FlushDecompress::Sync,
        FlushMode::Finish => FlushDecompress::Finish,
    }
}
