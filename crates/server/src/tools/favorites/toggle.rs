//! favorites_toggle tool implementation.

use crate::error::ToolError;
use crate::state::AppState;
use crate::tools::json_result;
use cidian_core::Key;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for favorites_toggle tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FavoritesToggleParams {
    /// Vocabulary entry id.
    pub id: serde_json::Value,

    /// Translation shown with the favorite (default: English).
    #[serde(default)]
    pub translation: Option<String>,
}

/// Output structure for favorites_toggle tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FavoritesToggleOutput {
    pub id: String,
    /// Whether the word is a favorite after the call.
    pub favorited: bool,
}

pub async fn toggle_impl(state: &AppState, params: FavoritesToggleParams) -> Result<CallToolResult, McpError> {
    let key = Key::from_json(&params.id).ok_or_else(|| ToolError::InvalidInput(format!("invalid id: {}", params.id)))?;
    let word = state
        .vocab()
        .get_by_id(key.clone())
        .await?
        .ok_or_else(|| ToolError::NotFound(format!("no vocabulary entry {key}")))?;

    let favorited = state.favorites.toggle(&word, params.translation.as_deref()).await?;
    tracing::info!(id = %key, favorited, "favorite toggled");
    json_result(&FavoritesToggleOutput { id: key.to_string_key(), favorited })
}
