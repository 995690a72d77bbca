//! Convenience methods on readable buffers.
//!
//! [`BufferCompressExt`] is implemented for every [`ReadCursor`], so byte
//! buffers and slices can be compressed or decompressed in place:
//!
//! ```rust
//! use bytes::BytesMut;
//! use oxistream_deflate::{BufferCompressExt, CompressionAlgorithm};
//!
//! let mut plain = BytesMut::from(&b"extension methods, extension methods"[..]);
//! let mut compressed = plain.compress(CompressionAlgorithm::ZLIB).unwrap();
//! assert!(plain.is_empty());
//!
//! let restored = compressed.decompress(CompressionAlgorithm::ZLIB).unwrap();
//! assert_eq!(&restored[..], b"extension methods, extension methods");
//! ```

use crate::algorithm::CompressionAlgorithm;
use crate::compressor::Compressor;
use crate::decompressor::{Decompressor, GrowthPolicy};
use bytes::BytesMut;
use oxistream_core::buffer::{ReadCursor, WriteCursor};
use oxistream_core::error::Result;
use oxistream_core::traits::StepStatus;

/// Compression and decompression of a buffer's readable bytes.
///
/// Every method consumes what it processes from `self`. The allocating
/// variants size their output so they never fail with `BufferOverflow`
/// (compression) or grow it on demand (decompression).
pub trait BufferCompressExt: ReadCursor + Sized {
    /// Compress all readable bytes into a new buffer.
    fn compress(&mut self, algorithm: CompressionAlgorithm) -> Result<BytesMut> {
        let mut output = BytesMut::with_capacity(algorithm.deflate_bound(self.readable_bytes()));
        algorithm.compressor().compress(self, &mut output)?;
        Ok(output)
    }

    /// Compress all readable bytes into `output` without growing it.
    fn compress_into<W: WriteCursor>(
        &mut self,
        output: &mut W,
        algorithm: CompressionAlgorithm,
    ) -> Result<()> {
        algorithm.compressor().compress(self, output)
    }

    /// Feed all readable bytes to a started compressor and return its output.
    fn compress_stream(&mut self, compressor: &mut Compressor, finalise: bool) -> Result<BytesMut> {
        let mut output = BytesMut::with_capacity(compressor.output_bound(self.readable_bytes()));
        compressor.compress_stream(self, &mut output, finalise)?;
        Ok(output)
    }

    /// Feed all readable bytes to a started compressor, appending to `output`.
    fn compress_stream_into<W: WriteCursor>(
        &mut self,
        output: &mut W,
        compressor: &mut Compressor,
        finalise: bool,
    ) -> Result<()> {
        compressor.compress_stream(self, output, finalise)
    }

    /// Decompress a complete unit into a new buffer, growing up to 256 MiB.
    fn decompress(&mut self, algorithm: CompressionAlgorithm) -> Result<BytesMut> {
        algorithm
            .decompressor()
            .decompress_with_policy(self, GrowthPolicy::DEFAULT)
    }

    /// Decompress a complete unit into a new buffer of at most `max_size` bytes.
    fn decompress_with_limit(
        &mut self,
        algorithm: CompressionAlgorithm,
        max_size: usize,
    ) -> Result<BytesMut> {
        algorithm.decompressor().decompress_growable(self, max_size)
    }

    /// Decompress a complete unit into `output` without growing it.
    fn decompress_into<W: WriteCursor>(
        &mut self,
        output: &mut W,
        algorithm: CompressionAlgorithm,
    ) -> Result<()> {
        algorithm.decompressor().decompress(self, output)
    }

    /// Feed readable bytes to a started decompressor, appending to `output`.
    fn decompress_stream<W: WriteCursor>(
        &mut self,
        output: &mut W,
        decompressor: &mut Decompressor,
    ) -> Result<StepStatus> {
        decompressor.decompress_stream(self, output)
    }
}

impl<T: ReadCursor> BufferCompressExt for T {}
