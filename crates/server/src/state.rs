//! Shared application state built once at startup.

use cidian_client::{FetchConfig, HttpNetwork, Network, ServiceWorker, VocabDataService};
use cidian_core::{AppConfig, CacheStorage, Error, FavoritesRepository, LocalStorage, VocabRepository};
use std::sync::Arc;

/// Everything the tools operate on; shared through an `Arc`.
pub struct AppState {
    pub config: AppConfig,
    pub worker: ServiceWorker,
    pub data: VocabDataService,
    pub favorites: FavoritesRepository,
    /// False when the vocabulary store could not be opened and only the
    /// placeholder entry is being served.
    pub vocab_persistent: bool,
}

impl AppState {
    /// Open every store under `config.data_dir` and talk to the real network.
    pub async fn init(config: AppConfig) -> Result<Self, Error> {
        let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);
        Self::open(config, network).await
    }

    pub async fn open(config: AppConfig, network: Arc<dyn Network>) -> Result<Self, Error> {
        tokio::fs::create_dir_all(&config.data_dir).await?;
        let caches = CacheStorage::open(config.caches_path()).await?;
        let local = LocalStorage::open(config.local_storage_dir()).await?;
        let (vocab, vocab_persistent) = VocabRepository::initialize_or_placeholder(config.vocab_db_path()).await?;
        let favorites = FavoritesRepository::open(config.favorites_db_path(), local.clone(), config.favorites_mode).await?;
        Self::assemble(config, network, caches, vocab, favorites, local, vocab_persistent)
    }

    /// Fully in-memory state for tests.
    pub async fn in_memory(config: AppConfig, network: Arc<dyn Network>) -> Result<Self, Error> {
        let caches = CacheStorage::open_in_memory().await?;
        let vocab = VocabRepository::initialize_in_memory().await?;
        let favorites = FavoritesRepository::open_in_memory().await?;
        Self::assemble(config, network, caches, vocab, favorites, LocalStorage::in_memory(), true)
    }

    fn assemble(
        config: AppConfig, network: Arc<dyn Network>, caches: CacheStorage, vocab: VocabRepository,
        favorites: FavoritesRepository, local: LocalStorage, vocab_persistent: bool,
    ) -> Result<Self, Error> {
        let worker = ServiceWorker::from_config(&config, network.clone(), caches)?;
        let data = VocabDataService::from_config(&config, network, vocab, local)?;
        Ok(Self { config, worker, data, favorites, vocab_persistent })
    }

    pub fn vocab(&self) -> &VocabRepository {
        self.data.vocab()
    }

    /// Install and activate the worker, then make sure vocabulary is loaded.
    ///
    /// Failures are logged; the server still starts with whatever is available.
    pub async fn warm_up(&self) {
        match self.worker.start().await {
            Ok(state) => tracing::info!(?state, "worker started"),
            Err(e) => tracing::error!(error = %e, "worker failed to start"),
        }
        match self.data.initialize().await {
            Ok(summary) => tracing::info!(total = summary.total, version = %summary.data_version, "vocabulary ready"),
            Err(e) => tracing::error!(error = %e, "vocabulary initialization failed"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Offline state for tool tests.

    use super::*;
    use async_trait::async_trait;
    use cidian_core::{Request, Response};

    pub struct Offline;

    #[async_trait]
    impl Network for Offline {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            Err(Error::Network(format!("offline: {}", request.url)))
        }
    }

    pub const WORDS: &str = r#"[
        {"ID": 1, "chinese_cn": "你好", "pinyin": "nǐ hǎo", "english_en": "hello", "hsk_level": 1},
        {"ID": 2, "chinese_cn": "您", "pinyin": "nín", "english_en": "you (polite)", "hsk_level": 2},
        {"ID": 3, "chinese_cn": "图书馆", "pinyin": "tú shū guǎn", "english_en": "library", "hsk_level": 2, "is_premium": true}
    ]"#;

    pub async fn state() -> AppState {
        state_with(std::env::temp_dir()).await
    }

    pub async fn state_with(export_dir: std::path::PathBuf) -> AppState {
        let config = AppConfig { export_dir, ..Default::default() };
        let state = AppState::in_memory(config, Arc::new(Offline)).await.unwrap();
        state.data.import_document(WORDS).await.unwrap();
        state
    }
}
