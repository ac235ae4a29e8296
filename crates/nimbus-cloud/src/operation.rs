//! Long-running operation handles

use crate::context::CallContext;
use crate::error::Result;
use async_trait::async_trait;

/// Handle to a remote asynchronous operation.
///
/// Mutating calls return immediately with a handle; [`wait`](Self::wait)
/// blocks the calling task until the operation reaches a terminal state.
#[async_trait]
pub trait OperationHandle: Send {
    /// Remote operation identifier
    fn id(&self) -> &str;

    /// Wait until the operation is done, returning the final resource state
    async fn wait(&mut self, ctx: &CallContext) -> Result<Option<serde_json::Value>>;
}

pub type BoxedOperation = Box<dyn OperationHandle>;

/// An operation that completed synchronously
#[derive(Debug, Clone)]
pub struct CompletedOperation {
    id: String,
    response: Option<serde_json::Value>,
}

impl CompletedOperation {
    pub fn new(id: impl Into<String>, response: Option<serde_json::Value>) -> Self {
        Self {
            id: id.into(),
            response,
        }
    }

    pub fn boxed(self) -> BoxedOperation {
        Box::new(self)
    }
}

#[async_trait]
impl OperationHandle for CompletedOperation {
    fn id(&self) -> &str {
        &self.id
    }

    async fn wait(&mut self, ctx: &CallContext) -> Result<Option<serde_json::Value>> {
        ctx.check()?;
        Ok(self.response.clone())
    }
}
