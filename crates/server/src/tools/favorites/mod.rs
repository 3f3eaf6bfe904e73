//! Favorites MCP tools.

pub mod export;
pub mod list;
pub mod toggle;

pub use export::{FavoritesExportParams, export_impl};
pub use list::{FavoritesListParams, list_impl};
pub use toggle::{FavoritesToggleParams, toggle_impl};
