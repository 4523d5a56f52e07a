//! Errors raised while building or stepping regions and networks.
//!
//! Every failure is a configuration or precondition violation reported to the caller.
//! Nothing here is retried internally: a region step is a deterministic transform of its input.

use thiserror::Error;

/// Main error type for region and network operations.
#[derive(Error, Debug)]
pub enum HtmError {
    /// A cell or input count that cannot be laid out on a square grid.
    #[error("{what} count {count} is not a perfect square")]
    NonSquare { what: &'static str, count: usize },

    /// The input vector handed to a step does not match the region's input width.
    #[error("input size mismatch: expected {expected}, got {actual}")]
    InputSizeMismatch { expected: usize, actual: usize },

    /// An input value outside [-1, 1] (or not finite).
    #[error("input value {value} at index {index} is outside [-1, 1]")]
    InputOutOfRange { index: usize, value: f32 },

    /// A setting with a value outside its valid range.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// A network built without any region.
    #[error("a network needs at least one region")]
    EmptyNetwork,

    /// Settings document that could not be parsed.
    #[error("invalid settings document: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HtmError>;
