//! SQLite-backed Cache Storage: named buckets of request → response entries.
//!
//! Mirrors the platform Cache Storage model used by the worker:
//!
//! - One bucket per release, named by the version descriptor
//! - Entries keyed by request URL (fragment stripped), last write wins
//! - Buckets enumerated in creation order so activation can evict old ones
//! - WAL mode so several handles (tabs, the worker) can share the file

pub mod entries;
pub mod hash;
pub mod storage;

pub use crate::Error;

pub use entries::Cache;
pub use storage::CacheStorage;
