//! Offline worker engine for cidian.
//!
//! This crate provides the network seam, the version manager, cache
//! strategies, the worker lifecycle and the vocabulary data service, built
//! on the storage types in `cidian-core`.

pub mod data;
pub mod fetch;
pub mod strategy;
pub mod version;
pub mod worker;

pub use data::{DataSummary, VocabDataService};
pub use fetch::{FetchConfig, HttpNetwork, Network, Scope};
pub use strategy::{BackgroundTasks, Strategy, StrategyEngine};
pub use version::{Freshness, VersionDescriptor, VersionManager};
pub use worker::{Intercepted, Route, ServiceWorker, WorkerMessage, WorkerReply, WorkerState};
