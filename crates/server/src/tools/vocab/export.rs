//! vocab_export tool implementation.

use crate::state::AppState;
use crate::tools::json_result;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Input parameters for vocab_export tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VocabExportParams {
    /// Target directory (default: the configured export directory).
    #[serde(default)]
    pub dir: Option<String>,
}

/// Output structure for the export tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportOutput {
    pub path: String,
    pub total: usize,
}

pub async fn export_impl(state: &AppState, params: VocabExportParams) -> Result<CallToolResult, McpError> {
    let path = match params.dir {
        Some(dir) => state.data.export_to(&PathBuf::from(dir)).await?,
        None => state.data.export().await?,
    };
    let total = state.vocab().count().await?;
    json_result(&ExportOutput { path: path.display().to_string(), total })
}
