//! Versioned, transactional key-value store with secondary indexes.
//!
//! Models the browser structured store on top of SQLite:
//!
//! - A database has an integer version; opening with a higher version runs
//!   an upgrade callback that may create or drop object stores and indexes
//! - Opening with a lower version than the one on disk fails with a
//!   connection error
//! - Records are JSON documents keyed by a key path (`"ID"`, `"word"`)
//! - Indexes are maintained on every write; multi-entry indexes index each
//!   array element
//! - Every operation is one transaction on the connection's worker thread,
//!   so writes against the same database never interleave

pub mod database;
pub mod key;
pub mod schema;

pub use database::{BulkWriteResult, CursorRecord, Database};
pub use key::{Direction, Key, KeyRange};
pub use schema::{IndexOptions, IndexSchema, ObjectStoreSchema, UpgradeTransaction};
