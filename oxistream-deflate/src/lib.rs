//! # OxiStream Deflate
//!
//! Streaming deflate, zlib and gzip compression over chunked buffers.
//!
//! The codec itself is `flate2` (zlib-rs backend). This crate adds the
//! streaming contract on top of it:
//!
//! - input is consumed from caller buffers and output appended in place,
//!   never grown behind the caller's back
//! - a full output buffer surfaces as [`StreamError::BufferOverflow`] with
//!   exact partial progress, so the call can be retried with more space
//! - every codec failure lands in the closed [`StreamError`] taxonomy
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use oxistream_deflate::{CompressionAlgorithm, StepStatus};
//!
//! let data = b"streamed in two chunks, streamed in two chunks".to_vec();
//! let algorithm = CompressionAlgorithm::GZIP;
//!
//! let mut compressor = algorithm.compressor();
//! let mut compressed = BytesMut::with_capacity(256);
//! compressor.start().unwrap();
//! for (index, chunk) in data.chunks(24).enumerate() {
//!     let mut chunk: &[u8] = chunk;
//!     let last = index == 1;
//!     compressor.compress_stream(&mut chunk, &mut compressed, last).unwrap();
//! }
//! compressor.finish().unwrap();
//!
//! let mut decompressor = algorithm.decompressor();
//! let mut restored = BytesMut::with_capacity(256);
//! decompressor.start().unwrap();
//! let status = decompressor.decompress_stream(&mut compressed, &mut restored).unwrap();
//! assert_eq!(status, StepStatus::StreamEnd);
//! decompressor.finish().unwrap();
//! assert_eq!(&restored[..], &data[..]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithm;
mod classify;
pub mod codec;
pub mod compressor;
pub mod decompressor;
pub mod ext;

pub use algorithm::{CodecParams, CompressionAlgorithm, MAX_WINDOW_BITS, MIN_WINDOW_BITS, Variant};
pub use codec::{DeflateContext, InflateContext};
pub use compressor::Compressor;
pub use decompressor::{Decompressor, GrowthPolicy};
pub use ext::BufferCompressExt;
pub use oxistream_core::{
    FlushMode, ReadCursor, Result, StepStatus, StreamError, StreamState, WriteCursor,
};
