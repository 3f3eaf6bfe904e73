//! favorites_export tool implementation.

use crate::state::AppState;
use crate::tools::json_result;
use crate::tools::vocab::export::ExportOutput;
use cidian_core::export::{FAVORITES_EXPORT_PREFIX, write_export};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Input parameters for favorites_export tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FavoritesExportParams {
    /// Target directory (default: the configured export directory).
    #[serde(default)]
    pub dir: Option<String>,
}

pub async fn export_impl(state: &AppState, params: FavoritesExportParams) -> Result<CallToolResult, McpError> {
    let dir = params.dir.map(PathBuf::from).unwrap_or_else(|| state.config.export_dir.clone());
    let favorites = state.favorites.get_all().await?;
    let contents = serde_json::to_string_pretty(&favorites).map_err(cidian_core::Error::from)?;
    let path = write_export(&dir, FAVORITES_EXPORT_PREFIX, &contents).await?;

    json_result(&ExportOutput { path: path.display().to_string(), total: favorites.len() })
}
