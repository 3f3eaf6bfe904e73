//! Favorited vocabulary ids, with a flat-list fallback.
//!
//! The backend is chosen once when the repository is built:
//!
//! - `Structured`: the `favorites` store of `VocabFavoritesDB`, keyed by the
//!   stringified word id, ordered newest-first through the `timestamp` index
//! - `FlatList`: a JSON array of ids under the `vocab_favorites` local
//!   storage key, used when the structured store cannot be opened
//!
//! Favorites only reference vocabulary ids. Ids whose word no longer exists
//! are dropped when resolving, never deleted eagerly.

pub mod entry;
pub mod repository;

pub use entry::FavoriteEntry;
pub use repository::{
    FAVORITES_DB_NAME, FAVORITES_DB_VERSION, FAVORITES_STORE, FALLBACK_KEY, FavoritesBackend, FavoritesMode,
    FavoritesRepository,
};
