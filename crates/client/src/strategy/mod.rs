//! Cache strategies applied to intercepted requests.
//!
//! Each strategy returns a response and never an error: transport failures
//! fall back to a cached copy or a synthetic 503, and storage failures are
//! logged and treated as misses. Only 2xx responses are written to a bucket.

mod background;

pub use background::BackgroundTasks;

use crate::fetch::{Network, fetch_with_timeout};
use crate::version::VersionManager;
use cidian_core::{Cache, CacheStorage, Error, Request, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Caching strategy named by the version descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Race the network against a deadline, cache on success.
    NetworkFirst,
    /// Serve the cached copy, refresh it in the background.
    #[default]
    StaleWhileRevalidate,
    /// Like cache-first, plus a background refresh on every hit.
    CacheFirstNetwork,
    CacheFirst,
}

impl Strategy {
    /// Parse a descriptor strategy name; unknown names fall back to the default.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "network-first" => Self::NetworkFirst,
            "cache-first-network" => Self::CacheFirstNetwork,
            "cache-first" => Self::CacheFirst,
            _ => Self::StaleWhileRevalidate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkFirst => "network-first",
            Self::StaleWhileRevalidate => "stale-while-revalidate",
            Self::CacheFirstNetwork => "cache-first-network",
            Self::CacheFirst => "cache-first",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes strategies against the network and the current bucket.
#[derive(Clone)]
pub struct StrategyEngine {
    network: Arc<dyn Network>,
    caches: CacheStorage,
    versions: Arc<VersionManager>,
    timeout: Duration,
    background: BackgroundTasks,
}

impl StrategyEngine {
    pub fn new(network: Arc<dyn Network>, caches: CacheStorage, versions: Arc<VersionManager>, timeout: Duration) -> Self {
        Self { network, caches, versions, timeout, background: BackgroundTasks::new() }
    }

    pub fn network(&self) -> &Arc<dyn Network> {
        &self.network
    }

    pub fn caches(&self) -> &CacheStorage {
        &self.caches
    }

    pub fn versions(&self) -> &Arc<VersionManager> {
        &self.versions
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    /// Wait for all background refreshes started so far.
    pub async fn settle(&self) {
        self.background.settle().await;
    }

    /// Pick the strategy for the request path and run it.
    pub async fn execute(&self, request: &Request) -> Response {
        let strategy = self.versions.update_strategy(request.path()).await;
        tracing::debug!(url = %request.url, %strategy, "executing strategy");
        self.run(strategy, request).await
    }

    pub async fn run(&self, strategy: Strategy, request: &Request) -> Response {
        match strategy {
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
            Strategy::CacheFirstNetwork => self.cache_first_network(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
        }
    }

    pub async fn network_first(&self, request: &Request) -> Response {
        match fetch_with_timeout(self.network.as_ref(), request, self.timeout).await {
            Ok(response) if response.is_ok() => {
                if let Some(bucket) = self.bucket().await {
                    store(&bucket, request, &response).await;
                }
                return response;
            }
            Ok(response) => tracing::debug!(url = %request.url, status = response.status, "network-first got non-ok"),
            Err(e) => tracing::debug!(url = %request.url, error = %e, "network-first falling back to cache"),
        }

        match self.caches.match_any(request).await {
            Ok(Some(cached)) => cached,
            Ok(None) => Response::service_unavailable(),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                Response::service_unavailable()
            }
        }
    }

    pub async fn stale_while_revalidate(&self, request: &Request) -> Response {
        let Some(bucket) = self.bucket().await else {
            return self.fetch_and_store(None, request, Some(self.timeout)).await;
        };

        if let Some(cached) = lookup(&bucket, request).await {
            self.refresh_in_background(bucket, request, Some(self.timeout));
            return cached;
        }
        self.fetch_and_store(Some(&bucket), request, Some(self.timeout)).await
    }

    pub async fn cache_first_network(&self, request: &Request) -> Response {
        let bucket = self.bucket().await;
        if let Some(bucket) = bucket.as_ref()
            && let Some(cached) = lookup(bucket, request).await
        {
            self.refresh_in_background(bucket.clone(), request, None);
            return cached;
        }
        self.fetch_and_store(bucket.as_ref(), request, None).await
    }

    pub async fn cache_first(&self, request: &Request) -> Response {
        let bucket = self.bucket().await;
        if let Some(bucket) = bucket.as_ref()
            && let Some(cached) = lookup(bucket, request).await
        {
            return cached;
        }
        self.fetch_and_store(bucket.as_ref(), request, None).await
    }

    /// Open the bucket for the current release. `None` when storage fails.
    pub(crate) async fn bucket(&self) -> Option<Cache> {
        let name = self.versions.cache_name().await;
        match self.caches.open_cache(&name).await {
            Ok(bucket) => Some(bucket),
            Err(e) => {
                tracing::warn!(bucket = %name, error = %e, "failed to open cache bucket");
                None
            }
        }
    }

    async fn fetch_and_store(&self, bucket: Option<&Cache>, request: &Request, deadline: Option<Duration>) -> Response {
        let result = match deadline {
            Some(timeout) => fetch_with_timeout(self.network.as_ref(), request, timeout).await,
            None => self.network.fetch(request).await,
        };
        match result {
            Ok(response) => {
                if response.is_ok()
                    && let Some(bucket) = bucket
                {
                    store(bucket, request, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network unavailable, no cached copy");
                Response::service_unavailable()
            }
        }
    }

    fn refresh_in_background(&self, bucket: Cache, request: &Request, deadline: Option<Duration>) {
        let network = self.network.clone();
        let request = request.clone();
        self.background.spawn("refresh", async move {
            let response = match deadline {
                Some(timeout) => fetch_with_timeout(network.as_ref(), &request, timeout).await?,
                None => network.fetch(&request).await?,
            };
            if response.is_ok() {
                bucket.put(&request, &response).await?;
                tracing::debug!(url = %request.url, bucket = bucket.name(), "refreshed cached copy");
            }
            Ok::<(), Error>(())
        });
    }
}

async fn lookup(bucket: &Cache, request: &Request) -> Option<Response> {
    match bucket.match_request(request).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
            None
        }
    }
}

async fn store(bucket: &Cache, request: &Request, response: &Response) {
    if let Err(e) = bucket.put(request, response).await {
        tracing::warn!(url = %request.url, bucket = bucket.name(), error = %e, "failed to cache response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{MockNetwork, Reply};
    use crate::version::VersionConfig;
    use url::Url;

    const BUCKET: &str = "chinese-vocab-v1.0.19";
    const APP_JS: &str = "https://app.example/src/js/app.js";

    async fn engine(network: Arc<MockNetwork>) -> StrategyEngine {
        let versions = Arc::new(VersionManager::new(
            network.clone(),
            VersionConfig {
                descriptor_url: Url::parse("https://app.example/src/data/version.json").unwrap(),
                fallback_cache_name: BUCKET.into(),
                timeout: Duration::from_secs(5),
                interval: Duration::from_secs(3600),
                force_update_on_first_visit: true,
            },
        ));
        let caches = CacheStorage::open_in_memory().await.unwrap();
        StrategyEngine::new(network, caches, versions, Duration::from_secs(5))
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    async fn seed(engine: &StrategyEngine, url: &str, body: &'static str) {
        let bucket = engine.caches().open_cache(BUCKET).await.unwrap();
        bucket.put(&get(url), &Response::new(200, body)).await.unwrap();
    }

    async fn cached_text(engine: &StrategyEngine, url: &str) -> Option<String> {
        let bucket = engine.caches().open_cache(BUCKET).await.unwrap();
        bucket.match_request(&get(url)).await.unwrap().map(|r| r.text())
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(Strategy::parse("network-first"), Strategy::NetworkFirst);
        assert_eq!(Strategy::parse("cache-first-network"), Strategy::CacheFirstNetwork);
        assert_eq!(Strategy::parse("cache-first"), Strategy::CacheFirst);
        assert_eq!(Strategy::parse("stale-while-revalidate"), Strategy::StaleWhileRevalidate);
        assert_eq!(Strategy::parse("lazy"), Strategy::StaleWhileRevalidate);
        assert_eq!(Strategy::CacheFirstNetwork.to_string(), "cache-first-network");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_serves_stale_then_updates() {
        let network = Arc::new(MockNetwork::new());
        network.reply(APP_JS, Reply::Ok(200, "v2"));
        let engine = engine(network.clone()).await;
        seed(&engine, APP_JS, "v1").await;

        let first = engine.execute(&get(APP_JS)).await;
        assert_eq!(first.text(), "v1");

        engine.settle().await;
        assert_eq!(cached_text(&engine, APP_JS).await.as_deref(), Some("v2"));
        assert_eq!(engine.execute(&get(APP_JS)).await.text(), "v2");
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_without_cache_waits_for_network() {
        let network = Arc::new(MockNetwork::new());
        network.reply(APP_JS, Reply::Ok(200, "fresh"));
        let engine = engine(network).await;

        let resp = engine.stale_while_revalidate(&get(APP_JS)).await;
        assert_eq!(resp.text(), "fresh");
        assert_eq!(cached_text(&engine, APP_JS).await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_offline_without_cache_is_503() {
        let network = Arc::new(MockNetwork::new());
        let engine = engine(network).await;

        let resp = engine.stale_while_revalidate(&get(APP_JS)).await;
        assert_eq!(resp.status, 503);
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_keeps_copy_when_refresh_fails() {
        let network = Arc::new(MockNetwork::new());
        network.reply(APP_JS, Reply::Fail);
        let engine = engine(network).await;
        seed(&engine, APP_JS, "v1").await;

        assert_eq!(engine.stale_while_revalidate(&get(APP_JS)).await.text(), "v1");
        engine.settle().await;
        assert_eq!(cached_text(&engine, APP_JS).await.as_deref(), Some("v1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_first_timeout_returns_cached() {
        let network = Arc::new(MockNetwork::new());
        network.reply(APP_JS, Reply::Delay(Duration::from_secs(30), 200, "late"));
        let engine = engine(network).await;
        seed(&engine, APP_JS, "cached").await;

        let resp = engine.network_first(&get(APP_JS)).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.text(), "cached");
    }

    #[tokio::test]
    async fn test_network_first_caches_success() {
        let network = Arc::new(MockNetwork::new());
        network.reply(APP_JS, Reply::Ok(200, "live"));
        let engine = engine(network).await;
        seed(&engine, APP_JS, "old").await;

        assert_eq!(engine.network_first(&get(APP_JS)).await.text(), "live");
        assert_eq!(cached_text(&engine, APP_JS).await.as_deref(), Some("live"));
    }

    #[tokio::test]
    async fn test_network_first_non_ok_falls_back() {
        let network = Arc::new(MockNetwork::new());
        network.reply(APP_JS, Reply::Ok(500, "boom"));
        let engine = engine(network).await;

        assert_eq!(engine.network_first(&get(APP_JS)).await.status, 503);

        seed(&engine, APP_JS, "cached").await;
        assert_eq!(engine.network_first(&get(APP_JS)).await.text(), "cached");
    }

    #[tokio::test]
    async fn test_network_first_searches_every_bucket() {
        let network = Arc::new(MockNetwork::new());
        let engine = engine(network).await;
        let old = engine.caches().open_cache("chinese-vocab-v1.0.18").await.unwrap();
        old.put(&get(APP_JS), &Response::new(200, "older release")).await.unwrap();

        assert_eq!(engine.network_first(&get(APP_JS)).await.text(), "older release");
    }

    #[tokio::test]
    async fn test_cache_first_skips_network_on_hit() {
        let network = Arc::new(MockNetwork::new());
        network.reply(APP_JS, Reply::Ok(200, "network"));
        let engine = engine(network.clone()).await;
        seed(&engine, APP_JS, "cached").await;

        assert_eq!(engine.cache_first(&get(APP_JS)).await.text(), "cached");
        engine.settle().await;
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_store_errors() {
        let network = Arc::new(MockNetwork::new());
        network.reply(APP_JS, Reply::Ok(404, "missing"));
        let engine = engine(network).await;

        let resp = engine.cache_first(&get(APP_JS)).await;
        assert_eq!(resp.status, 404);
        assert!(cached_text(&engine, APP_JS).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_first_network_refreshes_on_hit() {
        let network = Arc::new(MockNetwork::new());
        network.reply(APP_JS, Reply::Ok(200, "v2"));
        let engine = engine(network.clone()).await;
        seed(&engine, APP_JS, "v1").await;

        assert_eq!(engine.cache_first_network(&get(APP_JS)).await.text(), "v1");
        engine.settle().await;
        assert_eq!(network.calls(), 1);
        assert_eq!(cached_text(&engine, APP_JS).await.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_execute_follows_descriptor() {
        let network = Arc::new(MockNetwork::new());
        network.reply(
            "https://app.example/src/data/version.json",
            Reply::Ok(
                200,
                r#"{"version":"2","assets":{"core":{"files":[{"path":"/src/js/app.js"}],"updateStrategy":"network-first"}},"mappings":{"cache_version":"chinese-vocab-v2"}}"#,
            ),
        );
        network.reply(APP_JS, Reply::Ok(200, "live"));
        let engine = engine(network).await;
        engine.versions().get_version_data().await;

        assert_eq!(engine.execute(&get(APP_JS)).await.text(), "live");
        let bucket = engine.caches().open_cache("chinese-vocab-v2").await.unwrap();
        assert!(bucket.match_request(&get(APP_JS)).await.unwrap().is_some());
    }
}
