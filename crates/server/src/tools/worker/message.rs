//! worker_message tool implementation.

use crate::state::AppState;
use crate::tools::json_result;
use cidian_client::{WorkerReply, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// Message object with a `type` field, e.g. `{"type": "GET_VERSION"}`.
    pub message: serde_json::Value,
}

/// Output structure for worker_message tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WorkerMessageOutput {
    /// Present only for messages that answer (`GET_VERSION`).
    pub reply: Option<WorkerReply>,
    pub worker_state: WorkerState,
}

pub async fn message_impl(state: &AppState, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let reply = state.worker.post_message(params.message).await?;
    let output = WorkerMessageOutput { reply, worker_state: state.worker.state().await };
    json_result(&output)
}
