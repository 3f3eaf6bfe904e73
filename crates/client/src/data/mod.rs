//! Vocabulary dataset lifecycle: first download, import, export, reset.
//!
//! The last successfully imported document is kept in local storage so a
//! failed download can still populate an empty store.

use crate::fetch::{Network, Scope, no_cache_headers};
use chrono::{Local, Utc};
use cidian_core::export::{VOCAB_EXPORT_PREFIX, write_export};
use cidian_core::vocab::parse_dataset;
use cidian_core::{AppConfig, BulkWriteResult, Error, LocalStorage, Request, VocabRepository};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

pub const FALLBACK_DATA_KEY: &str = "vocab_fallback_data";
pub const LAST_UPDATE_KEY: &str = "vocab_last_update";
pub const DATA_VERSION_KEY: &str = "vocab_data_version";
pub const DEFAULT_DATA_VERSION: &str = "1.0.4";

/// What the store currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct DataSummary {
    pub total: usize,
    /// Local time of the last successful download, if any.
    pub last_update: Option<String>,
    pub data_version: String,
}

pub struct VocabDataService {
    network: Arc<dyn Network>,
    dataset_url: Url,
    vocab: VocabRepository,
    local: LocalStorage,
    export_dir: PathBuf,
    data_version: String,
}

impl VocabDataService {
    pub fn new(
        network: Arc<dyn Network>, dataset_url: Url, vocab: VocabRepository, local: LocalStorage, export_dir: PathBuf,
    ) -> Self {
        Self { network, dataset_url, vocab, local, export_dir, data_version: DEFAULT_DATA_VERSION.to_string() }
    }

    pub fn from_config(
        app: &AppConfig, network: Arc<dyn Network>, vocab: VocabRepository, local: LocalStorage,
    ) -> Result<Self, Error> {
        let scope = Scope::new(app.scope_url().map_err(|e| Error::InvalidInput(e.to_string()))?);
        let dataset_url = scope.resolve(&app.dataset_path)?;
        Ok(Self::new(network, dataset_url, vocab, local, app.export_dir.clone()))
    }

    /// Version recorded after the next successful download.
    pub fn with_data_version(mut self, version: impl Into<String>) -> Self {
        self.data_version = version.into();
        self
    }

    pub fn vocab(&self) -> &VocabRepository {
        &self.vocab
    }

    /// Download the dataset when the store is empty, then report what it holds.
    pub async fn initialize(&self) -> Result<DataSummary, Error> {
        if !self.vocab.has_data().await? {
            tracing::info!(url = %self.dataset_url, "vocabulary store empty, downloading dataset");
            self.download_and_store().await?;
        }
        self.summary().await
    }

    /// Fetch the dataset bypassing every cache and upsert it.
    ///
    /// When the download fails, the last imported document is stored instead;
    /// the download error is returned only when no fallback can be applied.
    pub async fn download_and_store(&self) -> Result<BulkWriteResult, Error> {
        match self.download().await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!(error = %e, "dataset download failed");
                let Some(raw) = self.local.get_item(FALLBACK_DATA_KEY).await? else {
                    return Err(e);
                };
                match self.store_document(&raw).await {
                    Ok(result) => {
                        tracing::info!(stored = result.succeeded, "restored vocabulary from local copy");
                        Ok(result)
                    }
                    Err(fallback) => {
                        tracing::warn!(error = %fallback, "local copy unusable");
                        Err(e)
                    }
                }
            }
        }
    }

    async fn download(&self) -> Result<BulkWriteResult, Error> {
        let mut url = self.dataset_url.clone();
        url.query_pairs_mut().append_pair("_", &Utc::now().timestamp_millis().to_string());
        let request = no_cache_headers(Request::get(url));

        let response = self.network.fetch(&request).await?;
        if !response.is_ok() {
            return Err(Error::HttpError(format!("{} returned {}", self.dataset_url, response.status)));
        }

        let result = self.store_document(&response.text()).await?;
        if result.failed > 0 {
            tracing::warn!(failed = result.failed, "some vocabulary records were rejected");
        }
        self.local.set_item(LAST_UPDATE_KEY, &Local::now().to_rfc3339()).await?;
        self.local.set_item(DATA_VERSION_KEY, &self.data_version).await?;
        Ok(result)
    }

    async fn store_document(&self, raw: &str) -> Result<BulkWriteResult, Error> {
        let records = parse_dataset(raw)?;
        self.vocab.bulk_upsert(records).await
    }

    /// Import a dataset file and keep it as the local fallback copy.
    pub async fn import_file(&self, path: &Path) -> Result<BulkWriteResult, Error> {
        let raw = tokio::fs::read_to_string(path).await?;
        self.import_document(&raw).await
    }

    /// Import a dataset document; rejected before any write when malformed.
    pub async fn import_document(&self, raw: &str) -> Result<BulkWriteResult, Error> {
        let result = self.store_document(raw).await?;
        self.local.set_item(FALLBACK_DATA_KEY, raw).await?;
        tracing::info!(stored = result.succeeded, failed = result.failed, "imported vocabulary");
        Ok(result)
    }

    /// Write every entry to `chinese_vocab_<date>.json` in the export directory.
    pub async fn export(&self) -> Result<PathBuf, Error> {
        self.export_to(&self.export_dir).await
    }

    pub async fn export_to(&self, dir: &Path) -> Result<PathBuf, Error> {
        let contents = self.vocab.export_json().await?;
        write_export(dir, VOCAB_EXPORT_PREFIX, &contents).await
    }

    /// Drop the store and local bookkeeping, then download again.
    pub async fn clear_and_redownload(&self) -> Result<BulkWriteResult, Error> {
        if let Err(e) = self.vocab.clear().await {
            tracing::warn!(error = %e, "failed to clear vocabulary store");
        }
        for key in [LAST_UPDATE_KEY, DATA_VERSION_KEY, FALLBACK_DATA_KEY] {
            self.local.remove_item(key).await?;
        }
        self.download_and_store().await
    }

    pub async fn summary(&self) -> Result<DataSummary, Error> {
        Ok(DataSummary {
            total: self.vocab.count().await?,
            last_update: self.local.get_item(LAST_UPDATE_KEY).await?,
            data_version: self
                .local
                .get_item(DATA_VERSION_KEY)
                .await?
                .unwrap_or_else(|| DEFAULT_DATA_VERSION.to_string()),
        })
    }
}
