//! Core types and storage for cidian.
//!
//! This crate provides:
//! - Cache Storage (named request → response buckets) on SQLite
//! - A versioned key-value store with secondary indexes
//! - The vocabulary and favorites repositories built on it
//! - Local storage, export helpers, configuration and the unified error type

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod export;
pub mod favorites;
pub mod http;
pub mod kv;
pub mod local_storage;
pub mod migrations;
pub mod vocab;

pub use cache::{Cache, CacheStorage};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use favorites::{FavoriteEntry, FavoritesMode, FavoritesRepository};
pub use http::{Request, RequestMode, Response};
pub use kv::{BulkWriteResult, Database, Key};
pub use local_storage::LocalStorage;
pub use vocab::{SearchCriteria, VocabEntry, VocabRepository};
