//! vocab_import tool implementation.

use crate::error::ToolError;
use crate::state::AppState;
use crate::tools::json_result;
use cidian_client::DataSummary;
use cidian_core::BulkWriteResult;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Input parameters for vocab_import tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VocabImportParams {
    /// Path to a JSON array of vocabulary records.
    pub path: String,
}

/// Output structure for vocab_import tool; shared with vocab_refresh.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DatasetWriteOutput {
    pub written: BulkWriteResult,
    pub summary: DataSummary,
}

pub async fn import_impl(state: &AppState, params: VocabImportParams) -> Result<CallToolResult, McpError> {
    if params.path.trim().is_empty() {
        return Err(ToolError::InvalidInput("path cannot be empty".into()).into());
    }

    let written = state.data.import_file(Path::new(&params.path)).await?;
    let summary = state.data.summary().await?;
    json_result(&DatasetWriteOutput { written, summary })
}
