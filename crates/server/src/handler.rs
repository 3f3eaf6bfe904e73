//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::state::AppState;
use crate::tools::favorites::{
    FavoritesExportParams, FavoritesListParams, FavoritesToggleParams, export_impl as favorites_export_impl, list_impl,
    toggle_impl,
};
use crate::tools::vocab::{
    VocabExportParams, VocabGetParams, VocabImportParams, VocabRefreshParams, VocabSearchParams,
    export_impl as vocab_export_impl, get_impl, import_impl, refresh_impl, search_impl,
};
use crate::tools::worker::{WorkerFetchParams, WorkerMessageParams, fetch_impl, message_impl};
use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for the cidian worker.
#[derive(Clone)]
pub struct CidianServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CidianServer {
    /// Create a new server handler over shared state.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Route a request through the offline worker. Returns the route taken (passthrough, cross-origin, navigate, strategy), status and body."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Post a control message to the worker: SKIP_WAITING, CHECK_UPDATE, GET_VERSION, CLEAR_DATABASE_CACHE, RESET_VERSION_CHECK."
    )]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Search vocabulary by digits, Chinese characters, pinyin (tones optional) or translation, with HSK level, length and premium filters."
    )]
    async fn vocab_search(&self, params: Parameters<VocabSearchParams>) -> Result<CallToolResult, McpError> {
        search_impl(&self.state, params.0).await
    }

    #[tool(description = "Fetch vocabulary entries by id, in request order.")]
    async fn vocab_get(&self, params: Parameters<VocabGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state, params.0).await
    }

    #[tool(description = "Import a JSON vocabulary file. Rejected before any write if the first record is malformed.")]
    async fn vocab_import(&self, params: Parameters<VocabImportParams>) -> Result<CallToolResult, McpError> {
        import_impl(&self.state, params.0).await
    }

    #[tool(description = "Export all vocabulary to chinese_vocab_<date>.json.")]
    async fn vocab_export(&self, params: Parameters<VocabExportParams>) -> Result<CallToolResult, McpError> {
        vocab_export_impl(&self.state, params.0).await
    }

    #[tool(description = "Re-download the vocabulary dataset, optionally clearing local data first.")]
    async fn vocab_refresh(&self, params: Parameters<VocabRefreshParams>) -> Result<CallToolResult, McpError> {
        refresh_impl(&self.state, params.0).await
    }

    #[tool(description = "Add or remove a vocabulary entry from favorites. Returns whether it is now a favorite.")]
    async fn favorites_toggle(&self, params: Parameters<FavoritesToggleParams>) -> Result<CallToolResult, McpError> {
        toggle_impl(&self.state, params.0).await
    }

    #[tool(description = "List favorites newest first, optionally resolved to full vocabulary entries.")]
    async fn favorites_list(&self, params: Parameters<FavoritesListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.state, params.0).await
    }

    #[tool(description = "Export favorites to vocab_favorites_<date>.json.")]
    async fn favorites_export(&self, params: Parameters<FavoritesExportParams>) -> Result<CallToolResult, McpError> {
        favorites_export_impl(&self.state, params.0).await
    }
}

impl ServerHandler for CidianServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "cidian-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
