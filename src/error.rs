//! Error types for the traffic prediction pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, TrafficError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum TrafficError {
    /// `transform`/`predict` called on a component that was never fitted or loaded
    #[error("Component not fitted: call fit or load first")]
    Unfitted,

    #[error("Invalid label {value:?} at row {row}: expected \"Low\" or \"High\"")]
    InvalidLabel { value: String, row: usize },

    #[error("Incomplete model: {missing} is missing, nothing was written")]
    IncompleteModel { missing: String },

    #[error("Model file not found: {}", .0.display())]
    ModelFileNotFound(PathBuf),

    #[error("Corrupt model bundle: {0}")]
    CorruptBundle(String),

    #[error("Model not ready: classifier and preprocessor must be trained or loaded")]
    ModelNotReady,

    #[error("Unseen category {value:?} in column {column:?}")]
    UnseenCategory { column: String, value: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for TrafficError {
    fn from(err: polars::error::PolarsError) -> Self {
        TrafficError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TrafficError {
    fn from(err: serde_json::Error) -> Self {
        TrafficError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TrafficError {
    fn from(err: ndarray::ShapeError) -> Self {
        TrafficError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
