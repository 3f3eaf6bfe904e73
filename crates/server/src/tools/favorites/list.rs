//! favorites_list tool implementation.

use crate::state::AppState;
use crate::tools::json_result;
use cidian_core::{FavoriteEntry, VocabEntry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for favorites_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FavoritesListParams {
    /// Return full vocabulary entries instead of favorite records.
    /// Favorites whose word no longer exists are left out.
    #[serde(default)]
    pub resolve: bool,
}

/// Output structure for favorites_list tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FavoritesListOutput {
    /// `structured` or `flat-list`.
    pub backend: String,
    pub favorites: Vec<FavoriteEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<VocabEntry>>,
}

pub async fn list_impl(state: &AppState, params: FavoritesListParams) -> Result<CallToolResult, McpError> {
    let favorites = state.favorites.get_all().await?;
    let words = if params.resolve { Some(state.favorites.resolve(state.vocab()).await?) } else { None };
    let backend = if state.favorites.is_supported() { "structured" } else { "flat-list" };

    json_result(&FavoritesListOutput { backend: backend.into(), favorites, words })
}
