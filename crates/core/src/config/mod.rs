//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CIDIAN_*)
//! 2. TOML config file (if CIDIAN_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::favorites::FavoritesMode;

mod validation;

pub use validation::ConfigError;

/// App-shell resources cached at install time, relative to the scope.
pub const DEFAULT_PRECACHE: [&str; 22] = [
    "./",
    "./index.html",
    "./src/css/style.css",
    "./src/js/app.js",
    "./src/js/language.js",
    "./src/js/vocab-db.js",
    "./src/js/theme.js",
    "./src/js/font-loader.js",
    "./src/js/payment.js",
    "./src/js/sw-register.js",
    "./src/js/lib/hanzi-writer.min.js",
    "./src/js/lib/idb.js",
    "./src/js/managers/search-manager.js",
    "./src/js/managers/display-manager.js",
    "./src/js/managers/speech-manager.js",
    "./src/js/managers/stroke-manager.js",
    "./src/js/managers/favorites-manager.js",
    "./src/js/managers/share-manager.js",
    "./src/js/managers/data-manager.js",
    "./src/data/languages.json",
    "./src/data/version.json",
    "./src/data/manifest.json",
];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CIDIAN_*)
/// 2. TOML config file (if CIDIAN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scope URL of the vocabulary web app; the worker controls everything below it.
    ///
    /// Set via CIDIAN_SCOPE environment variable.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Directory holding Cache Storage, the structured stores and local storage.
    ///
    /// Set via CIDIAN_DATA_DIR environment variable.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory export files are written to.
    ///
    /// Set via CIDIAN_EXPORT_DIR environment variable.
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via CIDIAN_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body size in bytes.
    ///
    /// Set via CIDIAN_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network deadline for strategy and version fetches, in milliseconds.
    ///
    /// Set via CIDIAN_NETWORK_TIMEOUT_MS environment variable.
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,

    /// How long a fetched version descriptor stays fresh, in seconds.
    ///
    /// Set via CIDIAN_VERSION_CHECK_INTERVAL_SECS environment variable.
    #[serde(default = "default_version_check_interval_secs")]
    pub version_check_interval_secs: u64,

    /// Force a descriptor fetch on the first lookup after startup.
    ///
    /// Set via CIDIAN_FORCE_UPDATE_ON_FIRST_VISIT environment variable.
    #[serde(default = "default_true")]
    pub force_update_on_first_visit: bool,

    /// Bucket name used until a descriptor names one.
    ///
    /// Set via CIDIAN_FALLBACK_CACHE_VERSION environment variable.
    #[serde(default = "default_fallback_cache_version")]
    pub fallback_cache_version: String,

    /// Prefix shared by every bucket this app owns; activation evicts the
    /// others with this prefix.
    ///
    /// Set via CIDIAN_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version descriptor location, relative to the scope.
    #[serde(default = "default_version_path")]
    pub version_path: String,

    /// Vocabulary dataset location, relative to the scope.
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// Resources cached at install time, relative to the scope.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Favorites backend selection (`auto`, `structured` or `flat-list`).
    ///
    /// Set via CIDIAN_FAVORITES_MODE environment variable.
    #[serde(default)]
    pub favorites_mode: FavoritesMode,
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./cidian-data")
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("./exports")
}

fn default_user_agent() -> String {
    "cidian/0.1".into()
}

fn default_max_bytes() -> usize {
    20_971_520 // 20MB, the full dataset is a single JSON document
}

fn default_network_timeout_ms() -> u64 {
    5_000
}

fn default_version_check_interval_secs() -> u64 {
    3_600
}

fn default_true() -> bool {
    true
}

fn default_fallback_cache_version() -> String {
    "chinese-vocab-v1.0.19".into()
}

fn default_cache_prefix() -> String {
    "chinese-vocab-".into()
}

fn default_version_path() -> String {
    "./src/data/version.json".into()
}

fn default_dataset_path() -> String {
    "src/data/databasemain.json".into()
}

fn default_precache() -> Vec<String> {
    DEFAULT_PRECACHE.iter().map(|p| p.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            data_dir: default_data_dir(),
            export_dir: default_export_dir(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            network_timeout_ms: default_network_timeout_ms(),
            version_check_interval_secs: default_version_check_interval_secs(),
            force_update_on_first_visit: true,
            fallback_cache_version: default_fallback_cache_version(),
            cache_prefix: default_cache_prefix(),
            version_path: default_version_path(),
            dataset_path: default_dataset_path(),
            precache: default_precache(),
            favorites_mode: FavoritesMode::default(),
        }
    }
}

impl AppConfig {
    /// Network timeout as Duration for use with reqwest/tokio.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    pub fn version_check_interval(&self) -> Duration {
        Duration::from_secs(self.version_check_interval_secs)
    }

    /// Parsed scope URL, always ending in `/`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the scope is not an absolute http(s) URL.
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.scope)
            .map_err(|e| ConfigError::Invalid { field: "scope".into(), reason: e.to_string() })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid { field: "scope".into(), reason: "must be an http(s) URL".into() });
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn caches_path(&self) -> PathBuf {
        self.data_dir.join("caches.sqlite")
    }

    pub fn vocab_db_path(&self) -> PathBuf {
        self.data_dir.join("ChineseVocabDB.sqlite")
    }

    pub fn favorites_db_path(&self) -> PathBuf {
        self.data_dir.join("VocabFavoritesDB.sqlite")
    }

    pub fn local_storage_dir(&self) -> PathBuf {
        self.data_dir.join("local_storage")
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CIDIAN_`
    /// 2. TOML file from `CIDIAN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CIDIAN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CIDIAN_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
