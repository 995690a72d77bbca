//! Error types for OxiStream operations.
//!
//! Every streaming operation reports failure through [`StreamError`], a
//! closed set of kinds. Callers branch on the kind: [`StreamError::BufferOverflow`]
//! drives a grow-and-retry loop, every other kind is a hard failure.

use thiserror::Error;

/// The error type for stream compression and decompression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// A streaming call was made on an instance that is not active.
    #[error("Stream not started: call start() before streaming")]
    StreamNotStarted,

    /// The output region was exhausted before all pending work was drained.
    ///
    /// Both cursors already reflect the partial progress; reissue the call
    /// with the same input cursor and more output capacity.
    #[error("Buffer overflow: output exhausted before the codec drained")]
    BufferOverflow,

    /// The codec rejected its input or could not complete the stream.
    #[error("Corrupt data: {message}")]
    CorruptData {
        /// Description reported by the codec.
        message: String,
    },

    /// The codec context could not be created or refused to operate.
    #[error("Resource error: {message}")]
    ResourceError {
        /// Description of the failure.
        message: String,
    },

    /// Growable decompression needed more than the permitted output size.
    #[error("Maximum output size of {max_size} bytes exceeded")]
    MaxSizeError {
        /// Configured ceiling in bytes.
        max_size: usize,
    },
}

/// Result type alias for OxiStream operations.
pub type Result<T> = std::result::Result<T, StreamError>;

impl StreamError {
    /// Create a corrupt data error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptData {
            message: message.into(),
        }
    }

    /// Create a resource error.
    pub fn resource(message: impl Into<String>) -> Self {
        Self::ResourceError {
            message: message.into(),
        }
    }

    /// Create a max size error.
    pub fn max_size(max_size: usize) -> Self {
        Self::MaxSizeError { max_size }
    }

    /// Whether the failed call can be reissued with more output capacity.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BufferOverflow)
    }

    /// Whether the error leaves the instance unusable until a fresh start.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CorruptData { .. } | Self::ResourceError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StreamError::corrupt("incorrect header check");
        assert!(err.to_string().contains("incorrect header check"));

        let err = StreamError::max_size(4096);
        assert!(err.to_string().contains("4096"));

        assert!(StreamError::BufferOverflow.to_string().contains("overflow"));
    }

    #[test]
    fn test_error_classes() {
        assert!(StreamError::BufferOverflow.is_recoverable());
        assert!(!StreamError::BufferOverflow.is_terminal());

        assert!(StreamError::corrupt("x").is_terminal());
        assert!(StreamError::resource("x").is_terminal());
        assert!(!StreamError::StreamNotStarted.is_terminal());
        assert!(!StreamError::max_size(1).is_recoverable());
    }
}
