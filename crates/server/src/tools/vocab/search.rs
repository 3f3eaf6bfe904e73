//! vocab_search tool implementation.
//!
//! Runs the numeral / ideograph / pinyin / translation search over the
//! vocabulary store with optional level and length filters.

use crate::state::AppState;
use crate::tools::json_result;
use cidian_core::vocab::{Filter, SearchCriteria};
use cidian_core::{Error, VocabEntry};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for vocab_search tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VocabSearchParams {
    /// Digits, Chinese characters, pinyin (tones optional) or a translation.
    /// Empty returns every entry that passes the filters.
    #[serde(default)]
    pub query: String,

    /// HSK level, or "all" (default).
    #[serde(default)]
    pub hsk_level: Option<String>,

    /// Number of characters in the headword, or "all" (default).
    #[serde(default)]
    pub word_count: Option<String>,

    /// Leave out premium entries.
    #[serde(default)]
    pub hide_premium: bool,

    /// Maximum number of results returned (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Output structure for vocab_search tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct VocabSearchOutput {
    /// Matches before the limit was applied.
    pub total: usize,
    pub results: Vec<VocabEntry>,
}

fn parse_filter(value: Option<&str>) -> Result<Filter, Error> {
    value.map_or(Ok(Filter::All), str::parse)
}

pub async fn search_impl(state: &AppState, params: VocabSearchParams) -> Result<CallToolResult, McpError> {
    if params.limit == 0 {
        return Err(Error::InvalidInput("limit must be at least 1".into()).into());
    }

    let criteria = SearchCriteria {
        text: params.query,
        hsk_level: parse_filter(params.hsk_level.as_deref())?,
        word_count: parse_filter(params.word_count.as_deref())?,
        hide_premium: params.hide_premium,
    };

    let mut results = state.vocab().search(&criteria).await?;
    let total = results.len();
    results.truncate(params.limit);
    tracing::debug!(query = %criteria.text, total, "vocab search");

    json_result(&VocabSearchOutput { total, results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::state;
    use crate::tools::result_json;

    fn params(query: &str) -> VocabSearchParams {
        VocabSearchParams {
            query: query.into(),
            hsk_level: None,
            word_count: None,
            hide_premium: false,
            limit: default_limit(),
        }
    }

    #[tokio::test]
    async fn test_pinyin_is_exact_per_syllable() {
        let state = state().await;
        let output = result_json(&search_impl(&state, params("nin")).await.unwrap());
        assert_eq!(output["total"], 1);
        assert_eq!(output["results"][0]["chinese_cn"], "您");
    }

    #[tokio::test]
    async fn test_filters_and_premium() {
        let state = state().await;
        let p = VocabSearchParams { hsk_level: Some("2".into()), ..params("") };
        assert_eq!(result_json(&search_impl(&state, p.clone()).await.unwrap())["total"], 2);

        let p = VocabSearchParams { hide_premium: true, ..p };
        assert_eq!(result_json(&search_impl(&state, p).await.unwrap())["total"], 1);
    }

    #[tokio::test]
    async fn test_limit_keeps_total() {
        let state = state().await;
        let output = result_json(&search_impl(&state, VocabSearchParams { limit: 1, ..params("") }).await.unwrap());
        assert_eq!(output["total"], 3);
        assert_eq!(output["results"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_filter_is_rejected() {
        let state = state().await;
        let p = VocabSearchParams { word_count: Some("two".into()), ..params("") };
        assert!(search_impl(&state, p).await.is_err());
    }
}
