//! Offline worker: lifecycle, request interception and control messages.
//!
//! A [`ServiceWorker`] owns the strategy engine for one scope. It only
//! intercepts requests once activated; until then (and after being
//! superseded) every request goes straight to the network.

mod interceptor;
mod lifecycle;
mod messages;

pub use interceptor::{Route, route};
pub use lifecycle::{ActivateReport, InstallReport, WorkerState};
pub use messages::{WorkerMessage, WorkerReply};

use crate::fetch::{Network, Scope};
use crate::strategy::StrategyEngine;
use crate::version::{VersionConfig, VersionManager};
use cidian_core::{AppConfig, CacheStorage, Error, Request, Response};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Scope-level settings for a worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub scope: Scope,
    /// Scope-relative paths fetched during install.
    pub precache: Vec<String>,
    /// Buckets with this prefix belong to the app and are evicted on activation.
    pub cache_prefix: String,
}

/// Result of routing one request through the worker.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub route: Route,
    pub response: Response,
}

pub struct ServiceWorker {
    config: WorkerConfig,
    engine: StrategyEngine,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, engine: StrategyEngine) -> Self {
        Self {
            config,
            engine,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        }
    }

    /// Build a worker, its version manager and strategy engine from settings.
    pub fn from_config(app: &AppConfig, network: Arc<dyn Network>, caches: CacheStorage) -> Result<Self, Error> {
        let scope = Scope::new(app.scope_url().map_err(|e| Error::InvalidInput(e.to_string()))?);
        let versions = Arc::new(VersionManager::new(
            network.clone(),
            VersionConfig {
                descriptor_url: scope.resolve(&app.version_path)?,
                fallback_cache_name: app.fallback_cache_version.clone(),
                timeout: app.network_timeout(),
                interval: app.version_check_interval(),
                force_update_on_first_visit: app.force_update_on_first_visit,
            },
        ));
        let engine = StrategyEngine::new(network, caches, versions, app.network_timeout());
        let config = WorkerConfig { scope, precache: app.precache.clone(), cache_prefix: app.cache_prefix.clone() };
        Ok(Self::new(config, engine))
    }

    pub fn scope(&self) -> &Scope {
        &self.config.scope
    }

    pub fn engine(&self) -> &StrategyEngine {
        &self.engine
    }

    pub fn versions(&self) -> &Arc<VersionManager> {
        self.engine.versions()
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether activation has claimed the open pages.
    pub fn controls_clients(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Route a request and produce its response.
    ///
    /// Passthrough requests hit the network directly and surface transport
    /// errors; intercepted ones always resolve to a response.
    pub async fn fetch(&self, request: &Request) -> Result<Intercepted, Error> {
        let route = if self.state().await == WorkerState::Activated {
            route(&self.config.scope, request)
        } else {
            Route::Passthrough
        };

        let response = match route {
            Route::Passthrough => self.engine.network().fetch(request).await?,
            Route::CrossOrigin => self.engine.cache_first(request).await,
            Route::Navigate => self.navigate(request).await,
            Route::Strategy => self.engine.execute(request).await,
        };
        tracing::debug!(url = %request.url, ?route, status = response.status, "worker fetch");
        Ok(Intercepted { route, response })
    }

    /// Answer a page load with the cached app shell.
    async fn navigate(&self, request: &Request) -> Response {
        let shell = match self.config.scope.index_url() {
            Ok(url) => Request::get(url),
            Err(e) => {
                tracing::warn!(error = %e, "cannot resolve app shell");
                return Response::service_unavailable();
            }
        };
        let bucket = self.engine.bucket().await;

        if let Some(bucket) = bucket.as_ref() {
            match bucket.match_request(&shell).await {
                Ok(Some(cached)) => {
                    let versions = self.versions().clone();
                    self.engine.background().spawn("version-check", async move {
                        versions.fetch_version_data().await;
                        Ok(())
                    });
                    return cached;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "app shell lookup failed"),
            }
        }

        match self.engine.network().fetch(request).await {
            Ok(response) => {
                if response.is_ok()
                    && let Some(bucket) = bucket.as_ref()
                    && let Err(e) = bucket.put(&shell, &response).await
                {
                    tracing::warn!(error = %e, "failed to cache app shell");
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "navigation offline without app shell");
                Response::service_unavailable()
            }
        }
    }
}
