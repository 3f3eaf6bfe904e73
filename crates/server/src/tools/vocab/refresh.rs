//! vocab_refresh tool implementation.
//!
//! Re-downloads the dataset, optionally wiping the store first.

use super::import::DatasetWriteOutput;
use crate::state::AppState;
use crate::tools::json_result;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for vocab_refresh tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VocabRefreshParams {
    /// Clear the store and local bookkeeping before downloading.
    #[serde(default)]
    pub clear: bool,
}

pub async fn refresh_impl(state: &AppState, params: VocabRefreshParams) -> Result<CallToolResult, McpError> {
    let written = if params.clear {
        state.data.clear_and_redownload().await?
    } else {
        state.data.download_and_store().await?
    };
    let summary = state.data.summary().await?;
    json_result(&DatasetWriteOutput { written, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::state;
    use crate::tools::result_json;

    #[tokio::test]
    async fn test_offline_refresh_restores_imported_copy() {
        let state = state().await;
        let output = result_json(&refresh_impl(&state, VocabRefreshParams::default()).await.unwrap());
        assert_eq!(output["written"]["succeeded"], 3);
        assert_eq!(output["summary"]["total"], 3);
    }

    #[tokio::test]
    async fn test_offline_clear_fails_without_copy() {
        let state = state().await;
        let err = refresh_impl(&state, VocabRefreshParams { clear: true }).await.unwrap_err();
        assert_eq!(err.code.0, -32012);
        assert_eq!(state.vocab().count().await.unwrap(), 0);
    }
}
