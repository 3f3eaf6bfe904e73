//! Control messages posted to the worker by open pages.

use super::{ServiceWorker, WorkerState};
use crate::version::VersionDescriptor;
use cidian_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Substrings that mark a bucket as holding database payloads.
const DATABASE_BUCKET_MARKERS: [&str; 3] = ["vocab", "db", "database"];

/// Message discriminated by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate an installed worker without waiting for old pages to close.
    SkipWaiting,
    /// Refresh the version descriptor silently.
    CheckUpdate,
    /// Ask for a [`WorkerReply::VersionInfo`].
    GetVersion,
    /// Drop every bucket that holds database payloads.
    ClearDatabaseCache,
    /// Force a descriptor refresh on the next lookup.
    #[serde(alias = "RESET_UPDATE_FLAG")]
    ResetVersionCheck,
}

impl WorkerMessage {
    /// Decode a posted message. Unknown or malformed messages yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match serde_json::from_value(value) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unrecognized worker message");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerReply {
    VersionInfo {
        #[serde(rename = "cacheVersion")]
        cache_version: String,
        #[serde(rename = "versionData")]
        version_data: Option<VersionDescriptor>,
    },
}

impl ServiceWorker {
    /// Handle a decoded control message. Only `GET_VERSION` replies.
    pub async fn handle_message(&self, message: WorkerMessage) -> Result<Option<WorkerReply>, Error> {
        tracing::debug!(?message, "worker message");
        match message {
            WorkerMessage::SkipWaiting => {
                self.skip_waiting().await?;
                Ok(None)
            }
            WorkerMessage::CheckUpdate => {
                self.versions().fetch_version_data().await;
                Ok(None)
            }
            WorkerMessage::GetVersion => Ok(Some(WorkerReply::VersionInfo {
                cache_version: self.versions().cache_name().await,
                version_data: self.versions().current().await,
            })),
            WorkerMessage::ClearDatabaseCache => {
                self.clear_database_caches().await?;
                Ok(None)
            }
            WorkerMessage::ResetVersionCheck => {
                self.versions().reset_first_visit().await;
                Ok(None)
            }
        }
    }

    /// Decode and handle a raw posted message.
    pub async fn post_message(&self, value: Value) -> Result<Option<WorkerReply>, Error> {
        match WorkerMessage::from_value(value) {
            Some(message) => self.handle_message(message).await,
            None => Ok(None),
        }
    }

    /// Delete buckets whose names mark them as database payloads.
    pub async fn clear_database_caches(&self) -> Result<Vec<String>, Error> {
        self.require(WorkerState::Activated).await?;
        let caches = self.engine().caches();
        let mut deleted = Vec::new();
        for name in caches.keys().await? {
            if DATABASE_BUCKET_MARKERS.iter().any(|m| name.contains(m)) && caches.delete(&name).await? {
                deleted.push(name);
            }
        }
        tracing::info!(?deleted, "cleared database caches");
        Ok(deleted)
    }
}
