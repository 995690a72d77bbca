//! Translation of raw codec results into the closed error taxonomy.
//!
//! This is the only place that looks at [`flate2::Status`],
//! [`flate2::CompressError`] or [`flate2::DecompressError`]. Everything
//! downstream sees a [`StepStatus`] or a [`StreamError`].
//!
//! The codec returns as soon as it runs out of input or output space, so a
//! step that left input behind or filled the output completely may have
//! work pending and is reported as [`StepStatus::NeedMoreOutput`]. Retrying
//! such a step with more space is always safe: at worst it produces nothing.

use flate2::{CompressError, DecompressError, Status};
use oxistream_core::error::{Result, StreamError};
use oxistream_core::traits::{FlushMode, StepStatus};

/// Byte counts observed around one codec call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepShape {
    pub input_len: usize,
    pub output_len: usize,
    pub consumed: usize,
    pub produced: usize,
}

impl StepShape {
    fn output_full(&self) -> bool {
        self.output_len > 0 && self.produced == self.output_len
    }

    fn input_left(&self) -> bool {
        self.consumed < self.input_len
    }
}

/// Classify the result of a compression step.
pub(crate) fn compress_status(
    raw: std::result::Result<Status, CompressError>,
    shape: StepShape,
    flush: FlushMode,
) -> Result<StepStatus> {
    match raw {
        Err(err) => Err(StreamError::resource(format!("deflate stream error: {err}"))),
        Ok(Status::StreamEnd) => Ok(StepStatus::StreamEnd),
        // Finish only completes with StreamEnd.
        Ok(Status::Ok | Status::BufError) if flush == FlushMode::Finish => {
            Ok(StepStatus::NeedMoreOutput)
        }
        Ok(Status::Ok | Status::BufError) => Ok(drain_status(shape)),
    }
}

/// Classify the result of a decompression step.
pub(crate) fn decompress_status(
    raw: std::result::Result<Status, DecompressError>,
    shape: StepShape,
) -> Result<StepStatus> {
    match raw {
        Err(err) => match err.needs_dictionary() {
            Some(adler) => Err(StreamError::corrupt(format!(
                "stream requires a preset dictionary (adler32 {adler:#010x})"
            ))),
            None => Err(StreamError::corrupt(format!("invalid compressed data: {err}"))),
        },
        Ok(Status::StreamEnd) => Ok(StepStatus::StreamEnd),
        Ok(Status::Ok | Status::BufError) => Ok(drain_status(shape)),
    }
}

fn drain_status(shape: StepShape) -> StepStatus {
    if shape.input_left() || shape.output_full() {
        StepStatus::NeedMoreOutput
    } else {
        StepStatus::Ok
    }
}
