//! worker_fetch tool implementation.
//!
//! Routes a request through the worker exactly as an open page would.

use crate::state::AppState;
use crate::tools::json_result;
use cidian_client::{Route, WorkerState};
use cidian_core::{Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path relative to the app scope.
    pub url: String,

    /// HTTP method (default: GET). Only GET is intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a full-page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Maximum number of body characters echoed back (default: 2000).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_method() -> String {
    "GET".into()
}

fn default_max_chars() -> usize {
    2000
}

/// Output structure for worker_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    /// Which handler answered.
    pub route: Route,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    /// Body text, cut at `max_chars`.
    pub body: String,
    pub truncated: bool,
    pub worker_state: WorkerState,
}

pub async fn fetch_impl(state: &AppState, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = state.worker.scope().request_url(&params.url).map_err(Error::from)?;
    let mut request = if params.navigate { Request::navigate(url) } else { Request::get(url) };
    request.method = params.method.to_ascii_uppercase();

    let out = state.worker.fetch(&request).await?;
    let text = out.response.text();
    let truncated = text.chars().count() > params.max_chars;
    let body = if truncated { text.chars().take(params.max_chars).collect() } else { text };

    let output = WorkerFetchOutput {
        url: request.url.to_string(),
        route: out.route,
        status: out.response.status,
        content_type: out.response.content_type().map(str::to_string),
        body_bytes: out.response.body.len(),
        body,
        truncated,
        worker_state: state.worker.state().await,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::state;
    use crate::tools::result_json;

    fn params(url: &str) -> WorkerFetchParams {
        WorkerFetchParams { url: url.into(), method: default_method(), navigate: false, max_chars: default_max_chars() }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let state = state().await;
        assert!(fetch_impl(&state, params("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_passthrough_before_activation_surfaces_network_error() {
        let state = state().await;
        let err = fetch_impl(&state, params("src/js/app.js")).await.unwrap_err();
        assert_eq!(err.code.0, -32012);
    }

    #[tokio::test]
    async fn test_offline_navigation_after_activation_is_503() {
        let state = state().await;
        state.worker.start().await.unwrap();

        let result = fetch_impl(&state, WorkerFetchParams { navigate: true, ..params("./") }).await.unwrap();
        let output = result_json(&result);
        assert_eq!(output["route"], "navigate");
        assert_eq!(output["status"], 503);
        assert_eq!(output["worker_state"], "activated");
    }
}
