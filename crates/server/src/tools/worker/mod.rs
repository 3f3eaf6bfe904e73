//! Worker-facing MCP tools: route a request, post a control message.

pub mod fetch;
pub mod message;

pub use fetch::{WorkerFetchParams, fetch_impl};
pub use message::{WorkerMessageParams, message_impl};
