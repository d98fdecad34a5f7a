//! Error types for the churn workflow.
//!
//! Every fallible operation in the crate returns [`ChurnError`]. Nothing is
//! retried locally: read failures, remote rejections and malformed responses
//! are surfaced to the caller as-is.

use thiserror::Error;

/// Error type for loading, encoding, remote orchestration and scoring.
#[derive(Debug, Error)]
pub enum ChurnError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited-text reader or writer failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A cell could not be parsed as the type its column requires.
    #[error("Cannot parse {value:?} in column '{column}' at row {row}")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },

    /// A column required by the schema or the caller is absent.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// Shape mismatch between expected and actual dimensions.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape { expected: String, got: String },

    /// Feature dimension mismatch.
    #[error("Feature mismatch: expected {expected_features} features, got {got_features}")]
    FeatureMismatch {
        expected_features: usize,
        got_features: usize,
    },

    /// Invalid hyperparameter, setting or argument value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be read or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No container image is published for the region.
    #[error("Region '{region}' has no '{repository}' image")]
    UnsupportedRegion { region: String, repository: String },

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("Remote service rejected request ({status}): {message}")]
    Remote { status: u16, message: String },

    /// A remote training, compilation or hosting job ended unsuccessfully.
    #[error("Remote job '{job}' failed: {reason}")]
    JobFailed { job: String, reason: String },

    /// A response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChurnError>;

impl From<bincode::Error> for ChurnError {
    fn from(err: bincode::Error) -> Self {
        ChurnError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(err: serde_json::Error) -> Self {
        ChurnError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ChurnError {
    fn from(err: toml::de::Error) -> Self {
        ChurnError::Config(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ChurnError {
    fn from(err: ndarray::ShapeError) -> Self {
        ChurnError::InvalidShape {
            expected: "consistent row-major buffer".to_string(),
            got: err.to_string(),
        }
    }
}
