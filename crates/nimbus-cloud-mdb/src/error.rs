//! Managed database provider error types

use nimbus_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MdbError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Rejected because another operation is running on the cluster
    #[error("Conflicting operation: {0}")]
    Conflict(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),

    #[error("Operation {id} failed: {message}")]
    OperationFailed { id: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] CloudError),
}

pub type Result<T> = std::result::Result<T, MdbError>;

impl From<MdbError> for CloudError {
    fn from(err: MdbError) -> Self {
        match err {
            MdbError::NotFound(msg) => CloudError::NotFound(msg),
            MdbError::Conflict(msg) => CloudError::Conflict(msg),
            MdbError::Api { status, message } => {
                CloudError::Api(format!("HTTP {status}: {message}"))
            }
            MdbError::InvalidResponse(msg) => CloudError::Api(msg),
            MdbError::OperationFailed { id, message } => {
                CloudError::OperationFailed { id, message }
            }
            MdbError::MissingEnvVar(var) => {
                CloudError::InvalidConfig(format!("missing environment variable {var}"))
            }
            MdbError::Http(e) => CloudError::Transport(e.to_string()),
            MdbError::JsonError(e) => CloudError::Json(e),
            MdbError::CloudError(e) => e,
        }
    }
}
