//! Error types for bulkrna

use thiserror::Error;

/// Main error type for container construction and the PCA pipeline
#[derive(Error, Debug)]
pub enum BulkError {
    #[error("Missing data: {reason}")]
    MissingData { reason: String },

    #[error("Design parse error: {reason}")]
    DesignParse { reason: String },

    #[error("Empty selection: {reason}")]
    EmptySelection { reason: String },

    #[error("Unknown features: {missing:?}")]
    UnknownFeature { missing: Vec<String> },

    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Model fit error: {reason}")]
    Model { reason: String },
}

/// Result type alias for bulkrna operations
pub type Result<T> = std::result::Result<T, BulkError>;
