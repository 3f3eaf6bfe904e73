//! Vocabulary MCP tools.
//!
//! This module provides search, lookup and dataset maintenance tools.

pub mod export;
pub mod get;
pub mod import;
pub mod refresh;
pub mod search;

pub use export::{VocabExportParams, export_impl};
pub use get::{VocabGetParams, get_impl};
pub use import::{VocabImportParams, import_impl};
pub use refresh::{VocabRefreshParams, refresh_impl};
pub use search::{VocabSearchParams, search_impl};
