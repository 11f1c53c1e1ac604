//! Error types for xybrid-accel.
//!
//! Every fallible operation returns [`AccelResult`]. Errors are raised to the
//! caller of the operation that triggered them; nothing is retried internally.
//!
//! # Error Hierarchy
//!
//! ```text
//! AccelError
//! ├── InvalidState(String)            -- precondition not met (no graph attached, ...)
//! ├── InvalidArgument(String)         -- bad argument (input count, duplicate name, ...)
//! ├── IndexOutOfRange { .. }          -- bind position outside the binding list
//! ├── UnknownTensor(String)           -- name never registered with the shaper
//! ├── SizeMismatch { .. }             -- buffer length disagrees with the shaper
//! ├── Backend { operation, status }   -- accelerator primitive returned non-success
//! ├── Io(std::io::Error)              -- mapping weight data failed
//! └── Config(String)                  -- executor configuration could not be parsed
//! ```

use crate::executor::BindingKind;
use crate::runtime_adapter::Status;
use thiserror::Error;

/// The error type for all xybrid-accel operations.
#[derive(Error, Debug)]
pub enum AccelError {
    /// Operation requested before a required precondition holds.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Argument rejected before reaching the backend.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Bind position is not a valid index into the binding list.
    #[error("{kind} index {index} out of range ({len} registered)")]
    IndexOutOfRange {
        /// Which binding list was indexed
        kind: BindingKind,
        /// Requested position
        index: usize,
        /// Number of registered names in that list
        len: usize,
    },

    /// Tensor name was never added to the shape registry.
    #[error("Unknown tensor: {0}")]
    UnknownTensor(String),

    /// Caller-supplied element count disagrees with the registered shape.
    #[error("Size mismatch for '{tensor}': expected {expected} elements, got {actual}")]
    SizeMismatch {
        /// Tensor the buffer was meant for
        tensor: String,
        /// Element count recorded by the shape registry
        expected: usize,
        /// Element count supplied by the caller
        actual: usize,
    },

    /// An accelerator runtime primitive reported failure.
    #[error("{operation} failed with status {status}")]
    Backend {
        /// Name of the failing primitive
        operation: &'static str,
        /// Raw status code returned by the runtime
        status: Status,
    },

    /// I/O error while mapping weight data.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of [`AccelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidState,
    InvalidArgument,
    SizeMismatch,
    Backend,
    Io,
    Config,
}

/// Result type alias for xybrid-accel.
pub type AccelResult<T> = Result<T, AccelError>;

impl AccelError {
    /// Create an "invalid state" error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        AccelError::InvalidState(msg.into())
    }

    /// Create an "invalid argument" error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        AccelError::InvalidArgument(msg.into())
    }

    /// Create a backend error for the named primitive.
    pub fn backend(operation: &'static str, status: Status) -> Self {
        AccelError::Backend { operation, status }
    }

    /// Classify this error.
    ///
    /// Index and unknown-name errors are argument errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccelError::InvalidState(_) => ErrorKind::InvalidState,
            AccelError::InvalidArgument(_)
            | AccelError::IndexOutOfRange { .. }
            | AccelError::UnknownTensor(_) => ErrorKind::InvalidArgument,
            AccelError::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            AccelError::Backend { .. } => ErrorKind::Backend,
            AccelError::Io(_) => ErrorKind::Io,
            AccelError::Config(_) => ErrorKind::Config,
        }
    }

    /// Raw backend status, if this is a backend error.
    pub fn status(&self) -> Option<Status> {
        match self {
            AccelError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AccelError {
    fn from(e: serde_json::Error) -> Self {
        AccelError::Config(e.to_string())
    }
}
