//! Reconciliation error types

use crate::action::ActionType;
use thiserror::Error;

/// Cloud reconciliation errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// Malformed or contradictory desired state, detected before diffing
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Another mutation is already running on the same parent resource
    #[error("Conflicting operation: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The long-running operation reached a terminal failed state
    #[error("Operation {id} failed: {message}")]
    OperationFailed { id: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A remote call failed while applying one action of a plan
    #[error("Failed to {operation} {resource_type} {key:?} in {parent:?}: {source}")]
    Apply {
        operation: ActionType,
        resource_type: String,
        parent: String,
        key: String,
        #[source]
        source: Box<CloudError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Wrap an error with the action that produced it
    pub fn in_action(
        self,
        operation: ActionType,
        resource_type: impl Into<String>,
        parent: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        CloudError::Apply {
            operation,
            resource_type: resource_type.into(),
            parent: parent.into(),
            key: key.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping action context
    pub fn root(&self) -> &CloudError {
        match self {
            CloudError::Apply { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), CloudError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), CloudError::NotFound(_))
    }

    /// Deadline or cancellation
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), CloudError::Timeout(_) | CloudError::Cancelled(_))
    }

    /// Only conflicts are absorbed by the retry wrapper
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_sees_through_context() {
        let err = CloudError::NotFound("topic t1".into()).in_action(
            ActionType::Delete,
            "kafka-topic",
            "c1",
            "t1",
        );
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert!(matches!(err.root(), CloudError::NotFound(_)));

        let msg = err.to_string();
        assert!(msg.contains("delete"));
        assert!(msg.contains("kafka-topic"));
        assert!(msg.contains("\"t1\""));
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(CloudError::Conflict("busy".into()).is_retryable());
        assert!(!CloudError::Api("boom".into()).is_retryable());
        assert!(!CloudError::Timeout("late".into()).is_retryable());
        assert!(CloudError::Cancelled("stop".into()).is_timeout());
    }
}
