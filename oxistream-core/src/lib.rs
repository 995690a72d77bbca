//! # OxiStream Core
//!
//! Core components for the OxiStream streaming compression library.
//!
//! This crate provides the codec-independent building blocks:
//!
//! - [`error`]: The closed error taxonomy shared by every stream
//! - [`traits`]: Flush modes, lifecycle states, step statuses and the
//!   [`CodecContext`] boundary trait
//! - [`buffer`]: Read/write cursor traits over caller-owned byte buffers
//! - [`engine`]: The [`StreamEngine`] lifecycle and streaming primitive
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Convenience                                         │
//! │     One-shot, growable and BytesMut extension helpers   │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Direction                                           │
//! │     Compressor / Decompressor, algorithm selection      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Engine (this crate)                                 │
//! │     StreamEngine lifecycle, cursors, error taxonomy     │
//! ├─────────────────────────────────────────────────────────┤
//! │ L0: Foreign codec                                       │
//! │     Deflate-family block codec behind CodecContext      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use oxistream_core::buffer::{ReadCursor, WriteCursor};
//!
//! let mut input = BytesMut::from(&b"chunk"[..]);
//! input.advance_reader(2);
//! assert_eq!(input.readable(), b"unk");
//!
//! let output = BytesMut::with_capacity(64);
//! assert!(output.writable_bytes() >= 64);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod engine;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use buffer::{ReadCursor, WriteCursor};
pub use engine::StreamEngine;
pub use error::{Result, StreamError};
pub use traits::{CodecContext, FlushMode, Progress, StepStatus, StreamState};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::buffer::{ReadCursor, WriteCursor};
    pub use crate::error::{Result, StreamError};
    pub use crate::traits::{FlushMode, StepStatus, StreamState};
}
