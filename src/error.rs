//! Error types for the semsearch library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`SemsearchError`] enum.
//!
//! # Examples
//!
//! ```
//! use semsearch::error::{Result, SemsearchError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(SemsearchError::invalid_argument("k must be positive"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for semsearch operations.
#[derive(Error, Debug)]
pub enum SemsearchError {
    /// The embedding model could not be loaded. Fatal to the service instance.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// An input could not be encoded into a vector. The caller may skip or retry.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A vector does not have the dimension the index was built with.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A document was recorded at a slot other than the next expected one.
    #[error("Slot out of order: expected {expected}, got {actual}")]
    SlotOutOfOrder { expected: u64, actual: u64 },

    /// Bad caller input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Snapshot encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with SemsearchError.
pub type Result<T> = std::result::Result<T, SemsearchError>;

impl SemsearchError {
    /// Create a new model unavailable error.
    pub fn model_unavailable<S: Into<String>>(msg: S) -> Self {
        SemsearchError::ModelUnavailable(msg.into())
    }

    /// Create a new encoding error.
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        SemsearchError::Encoding(msg.into())
    }

    /// Create a new dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        SemsearchError::DimensionMismatch { expected, actual }
    }

    /// Create a new slot ordering error.
    pub fn slot_out_of_order(expected: u64, actual: u64) -> Self {
        SemsearchError::SlotOutOfOrder { expected, actual }
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        SemsearchError::InvalidArgument(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        SemsearchError::Config(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        SemsearchError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        SemsearchError::Other(msg.into())
    }

    /// Whether the caller can reasonably retry or skip the failing input.
    ///
    /// Model, dimension and slot errors indicate a broken service instance.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SemsearchError::Encoding(_) | SemsearchError::InvalidArgument(_)
        )
    }
}

impl From<bincode::Error> for SemsearchError {
    fn from(err: bincode::Error) -> Self {
        SemsearchError::Serialization(err.to_string())
    }
}
