//! Long-running operation polling

use crate::client::{ApiStatus, MdbClient};
use crate::error::MdbError;
use crate::wire;
use async_trait::async_trait;
use nimbus_cloud::{CallContext, OperationHandle};
use serde::Deserialize;
use serde_json::Value;

/// Operation resource as returned by the API
#[derive(Debug, Deserialize)]
pub(crate) struct OperationState {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<ApiStatus>,
    #[serde(default)]
    pub response: Option<Value>,
}

/// Operation started on the control plane, polled until done
pub struct RemoteOperation {
    client: MdbClient,
    state: OperationState,
}

impl RemoteOperation {
    pub(crate) fn new(client: MdbClient, state: OperationState) -> Self {
        Self { client, state }
    }

    pub fn is_done(&self) -> bool {
        self.state.done
    }

    async fn refresh(&mut self) -> crate::Result<()> {
        let url = self.client.operation_url(&self.state.id);
        let body = self.client.get_url(&url).await?;
        let state: OperationState = serde_json::from_value(body)?;
        if state.id != self.state.id {
            return Err(MdbError::InvalidResponse(format!(
                "polled operation {} but got {:?}",
                self.state.id, state.id
            )));
        }
        self.state = state;
        Ok(())
    }
}

#[async_trait]
impl OperationHandle for RemoteOperation {
    fn id(&self) -> &str {
        &self.state.id
    }

    async fn wait(&mut self, ctx: &CallContext) -> nimbus_cloud::Result<Option<Value>> {
        let poll_interval = self.client.config().poll_interval;
        while !self.state.done {
            ctx.sleep(poll_interval).await?;
            ctx.run(async { self.refresh().await.map_err(Into::into) })
                .await?;
            tracing::debug!("Operation {} done: {}", self.state.id, self.state.done);
        }

        if let Some(error) = &self.state.error {
            return Err(MdbError::OperationFailed {
                id: self.state.id.clone(),
                message: error.message.clone(),
            }
            .into());
        }
        Ok(self.state.response.take().map(wire::snake_keys))
    }
}
