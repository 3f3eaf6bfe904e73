//! Remote version descriptor and the strategy lookup built on it.
//!
//! The descriptor (`version.json` under the scope) tells the worker which
//! bucket name the current release uses and which caching strategy each
//! asset category wants. It is fetched eagerly on first use, then at most
//! once per refresh interval; a failed fetch keeps serving what was there.

mod descriptor;

pub use descriptor::{AssetCategory, AssetFile, Mappings, VersionDescriptor};

use crate::fetch::{Network, fetch_with_timeout};
use crate::strategy::Strategy;
use cidian_core::{Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use url::Url;

/// Whether the cached descriptor is still inside its refresh interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Settings for a [`VersionManager`].
#[derive(Debug, Clone)]
pub struct VersionConfig {
    pub descriptor_url: Url,
    pub fallback_cache_name: String,
    pub timeout: Duration,
    pub interval: Duration,
    pub force_update_on_first_visit: bool,
}

#[derive(Debug, Default)]
struct VersionState {
    data: Option<VersionDescriptor>,
    last_check: Option<Instant>,
    first_visit_done: bool,
}

/// Fetches and caches the version descriptor.
pub struct VersionManager {
    network: Arc<dyn Network>,
    config: VersionConfig,
    state: RwLock<VersionState>,
}

impl VersionManager {
    pub fn new(network: Arc<dyn Network>, config: VersionConfig) -> Self {
        Self { network, config, state: RwLock::new(VersionState::default()) }
    }

    /// Descriptor for strategy decisions.
    ///
    /// The first call forces a fetch (when configured); later calls reuse the
    /// cached descriptor inside the refresh interval and refetch after it.
    pub async fn get_version_data(&self) -> Option<VersionDescriptor> {
        let force = {
            let mut state = self.state.write().await;
            let first = !state.first_visit_done;
            state.first_visit_done = true;
            first && self.config.force_update_on_first_visit
        };
        if force {
            return self.fetch_version_data().await;
        }

        {
            let state = self.state.read().await;
            if let (Some(data), Some(checked)) = (&state.data, state.last_check)
                && checked.elapsed() < self.config.interval
            {
                return Some(data.clone());
            }
        }
        self.fetch_version_data().await
    }

    /// Fetch the descriptor now, bypassing every cache.
    ///
    /// Failures are logged and leave the previous descriptor in place.
    pub async fn fetch_version_data(&self) -> Option<VersionDescriptor> {
        let request = Request::get(self.config.descriptor_url.clone()).with_header("cache-control", "no-store");
        match fetch_with_timeout(self.network.as_ref(), &request, self.config.timeout).await {
            Ok(response) if response.is_ok() => match parse(&response) {
                Ok(descriptor) => {
                    tracing::debug!(version = %descriptor.version, "version descriptor refreshed");
                    let mut state = self.state.write().await;
                    state.data = Some(descriptor.clone());
                    state.last_check = Some(Instant::now());
                    return Some(descriptor);
                }
                Err(e) => tracing::warn!(error = %e, "ignoring malformed version descriptor"),
            },
            Ok(response) => tracing::debug!(status = response.status, "version descriptor unavailable"),
            Err(e) => tracing::debug!(error = %e, "version check failed"),
        }
        self.state.read().await.data.clone()
    }

    /// Strategy for a request path; stale-while-revalidate when unknown.
    pub async fn update_strategy(&self, path: &str) -> Strategy {
        let state = self.state.read().await;
        state
            .data
            .as_ref()
            .and_then(|d| d.strategy_name(path))
            .map(Strategy::parse)
            .unwrap_or_default()
    }

    /// Bucket name for the current release.
    pub async fn cache_name(&self) -> String {
        let state = self.state.read().await;
        state
            .data
            .as_ref()
            .and_then(|d| d.cache_version())
            .map(str::to_string)
            .unwrap_or_else(|| self.config.fallback_cache_name.clone())
    }

    /// Cached descriptor without triggering a fetch.
    pub async fn current(&self) -> Option<VersionDescriptor> {
        self.state.read().await.data.clone()
    }

    /// Re-arm the forced refresh on the next [`Self::get_version_data`].
    pub async fn reset_first_visit(&self) {
        self.state.write().await.first_visit_done = false;
    }

    pub async fn freshness(&self) -> Freshness {
        let state = self.state.read().await;
        match state.last_check {
            Some(checked) if checked.elapsed() >= self.config.interval => Freshness::Stale,
            _ => Freshness::Fresh,
        }
    }
}

fn parse(response: &Response) -> Result<VersionDescriptor, serde_json::Error> {
    serde_json::from_slice(&response.body)
}
