//! vocab_get tool implementation.

use crate::error::ToolError;
use crate::state::AppState;
use crate::tools::json_result;
use cidian_core::{Key, VocabEntry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for vocab_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VocabGetParams {
    /// Entry ids (numbers or strings). Duplicates are returned once.
    pub ids: Vec<serde_json::Value>,
}

/// Output structure for vocab_get tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct VocabGetOutput {
    /// Entries in request order.
    pub entries: Vec<VocabEntry>,
    /// Requested ids with no entry.
    pub missing: Vec<String>,
}

pub async fn get_impl(state: &AppState, params: VocabGetParams) -> Result<CallToolResult, McpError> {
    if params.ids.is_empty() {
        return Err(ToolError::InvalidInput("ids cannot be empty".into()).into());
    }
    let keys = params
        .ids
        .iter()
        .map(|v| Key::from_json(v).ok_or_else(|| ToolError::InvalidInput(format!("invalid id: {v}"))))
        .collect::<Result<Vec<_>, _>>()?;

    let entries = state.vocab().get_by_ids(&keys).await?;
    let mut missing: Vec<String> = Vec::new();
    for key in &keys {
        let name = key.to_string_key();
        if !entries.iter().any(|e| &e.id == key) && !missing.contains(&name) {
            missing.push(name);
        }
    }

    json_result(&VocabGetOutput { entries, missing })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::state;
    use crate::tools::result_json;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_in_request_order() {
        let state = state().await;
        let params = VocabGetParams { ids: vec![json!(3), json!(1), json!(3), json!(42)] };

        let output = result_json(&get_impl(&state, params).await.unwrap());
        let ids: Vec<i64> = output["entries"].as_array().unwrap().iter().map(|e| e["ID"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(output["missing"], json!(["42"]));
    }

    #[tokio::test]
    async fn test_invalid_ids() {
        let state = state().await;
        assert!(get_impl(&state, VocabGetParams { ids: vec![] }).await.is_err());
        assert!(get_impl(&state, VocabGetParams { ids: vec![json!({"id": 1})] }).await.is_err());
    }
}
