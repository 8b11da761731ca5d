//! Error types for image assembly operations

use crate::types::DataType;
use thiserror::Error;

/// Main error type for chunk and image operations
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image is empty")]
    EmptyImage,

    #[error("No rectangular image data left after dropping ragged chunks")]
    NoRectangularData,

    #[error("Cannot handle multiple chunks with {0} or more dimensions")]
    TooManyDimensions(usize),

    #[error("Missing required properties: {0}")]
    MissingProperties(String),

    #[error("Image is not clean, run reindex first")]
    NotClean,

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: DataType, found: DataType },

    #[error("Unsupported conversion from {from} to {to}")]
    UnsupportedConversion { from: DataType, to: DataType },

    #[error("Type selection failed: {0}")]
    TypeSelection(String),

    #[error("Invalid chunk: {0}")]
    InvalidChunk(String),

    #[error("Splice error: {0}")]
    Splice(String),

    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Specialized Result type for image operations
pub type Result<T> = std::result::Result<T, ImageError>;

impl From<serde_json::Error> for ImageError {
    fn from(err: serde_json::Error) -> Self {
        ImageError::Serialization(err.to_string())
    }
}
