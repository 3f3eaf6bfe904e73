//! Install/activate state machine.

use super::ServiceWorker;
use cidian_core::{Error, Request, Response};
use serde::Serialize;
use std::sync::atomic::Ordering;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Replaced by a newer worker; no longer intercepts.
    Redundant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub cache_name: String,
    /// Entries written by the precache step; zero when it failed.
    pub precached: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precache_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub cache_name: String,
    pub deleted: Vec<String>,
}

impl ServiceWorker {
    /// Move from one of `from` to `to`, or fail with `INVALID_STATE`.
    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&state) {
            return Err(Error::InvalidState(format!("cannot move from {:?} to {:?}", *state, to)));
        }
        tracing::debug!(from = ?*state, ?to, "worker state change");
        *state = to;
        Ok(())
    }

    pub(crate) async fn require(&self, expected: WorkerState) -> Result<(), Error> {
        let state = self.state().await;
        if state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState(format!("worker is {state:?}, expected {expected:?}")))
        }
    }

    /// Fetch the descriptor, precache the app shell, then request skip-waiting.
    ///
    /// Precaching is all-or-nothing; a failure is reported but does not stop
    /// the worker from reaching `Installed`.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed], WorkerState::Installing).await?;

        self.versions().get_version_data().await;
        let cache_name = self.versions().cache_name().await;

        let outcome = match self.engine.caches().open_cache(&cache_name).await {
            Ok(bucket) => match self.precache_pairs().await {
                Ok(pairs) => bucket.put_all(&pairs).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        let report = match outcome {
            Ok(precached) => {
                tracing::info!(bucket = %cache_name, precached, "precache complete");
                InstallReport { cache_name, precached, precache_error: None }
            }
            Err(e) => {
                tracing::error!(bucket = %cache_name, error = %e, "precache failed");
                InstallReport { cache_name, precached: 0, precache_error: Some(e.to_string()) }
            }
        };

        self.skip_waiting.store(true, Ordering::SeqCst);
        self.transition(&[WorkerState::Installing], WorkerState::Installed).await?;
        Ok(report)
    }

    /// Fetch every precache path; any failure or non-2xx aborts the batch.
    async fn precache_pairs(&self) -> Result<Vec<(Request, Response)>, Error> {
        let mut requests = Vec::with_capacity(self.config.precache.len());
        for path in &self.config.precache {
            requests.push(Request::get(self.config.scope.resolve(path)?));
        }

        let mut fetches = JoinSet::new();
        for (index, request) in requests.iter().cloned().enumerate() {
            let network = self.engine.network().clone();
            fetches.spawn(async move { (index, network.fetch(&request).await) });
        }

        let mut responses: Vec<Option<Response>> = vec![None; requests.len()];
        while let Some(joined) = fetches.join_next().await {
            let (index, result) = joined.map_err(|e| Error::Network(format!("precache task failed: {e}")))?;
            let response = result?;
            if !response.is_ok() {
                return Err(Error::HttpError(format!("{} returned {}", requests[index].url, response.status)));
            }
            responses[index] = Some(response);
        }

        Ok(requests
            .into_iter()
            .zip(responses)
            .filter_map(|(request, response)| response.map(|r| (request, r)))
            .collect())
    }

    /// Evict the app's older buckets, claim clients and start intercepting.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating).await?;

        let cache_name = self.versions().cache_name().await;
        let caches = self.engine.caches();
        let mut deleted = Vec::new();
        for name in caches.keys().await? {
            if name.starts_with(&self.config.cache_prefix) && name != cache_name && caches.delete(&name).await? {
                tracing::info!(bucket = %name, "deleted old cache");
                deleted.push(name);
            }
        }

        self.clients_claimed.store(true, Ordering::SeqCst);
        self.transition(&[WorkerState::Activating], WorkerState::Activated).await?;
        tracing::info!(bucket = %cache_name, "worker activated");
        Ok(ActivateReport { cache_name, deleted })
    }

    /// Request activation without waiting for old pages; activates at once
    /// when already installed.
    pub async fn skip_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        self.skip_waiting.store(true, Ordering::SeqCst);
        if self.state().await == WorkerState::Installed {
            return self.activate().await.map(Some);
        }
        Ok(None)
    }

    /// Install, then activate when skip-waiting was requested.
    pub async fn start(&self) -> Result<WorkerState, Error> {
        self.install().await?;
        if self.skip_waiting.load(Ordering::SeqCst) {
            self.activate().await?;
        }
        Ok(self.state().await)
    }

    /// A newer worker took over; stop intercepting.
    pub async fn supersede(&self) {
        *self.state.write().await = WorkerState::Redundant;
        self.clients_claimed.store(false, Ordering::SeqCst);
        tracing::info!("worker superseded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{MockNetwork, Reply};
    use crate::worker::testing::{DESCRIPTOR_URL, worker, worker_with};
    use std::sync::Arc;
    use url::Url;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_install_precaches_shell() {
        let network = Arc::new(MockNetwork::new());
        network.reply("https://app.example/", Reply::Ok(200, "root"));
        network.reply("https://app.example/index.html", Reply::Ok(200, "shell"));
        let worker = worker(network).await;

        let report = worker.install().await.unwrap();
        assert_eq!(report.cache_name, "chinese-vocab-v1.0.19");
        assert_eq!(report.precached, 2);
        assert!(report.precache_error.is_none());
        assert_eq!(worker.state().await, WorkerState::Installed);

        let bucket = worker.engine().caches().open_cache(&report.cache_name).await.unwrap();
        let hit = bucket.match_request(&get("https://app.example/index.html")).await.unwrap();
        assert_eq!(hit.unwrap().text(), "shell");
    }

    #[tokio::test]
    async fn test_precache_is_all_or_nothing() {
        let network = Arc::new(MockNetwork::new());
        network.reply("https://app.example/", Reply::Ok(200, "root"));
        network.reply("https://app.example/index.html", Reply::Ok(404, "gone"));
        let worker = worker(network).await;

        let report = worker.install().await.unwrap();
        assert_eq!(report.precached, 0);
        assert!(report.precache_error.unwrap().starts_with("HTTP_ERROR"));
        assert_eq!(worker.state().await, WorkerState::Installed);

        let bucket = worker.engine().caches().open_cache(&report.cache_name).await.unwrap();
        assert!(bucket.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_uses_descriptor_cache_name() {
        let network = Arc::new(MockNetwork::new());
        network.reply(DESCRIPTOR_URL, Reply::Ok(200, r#"{"mappings":{"cache_version":"chinese-vocab-v2"}}"#));
        network.reply("https://app.example/index.html", Reply::Ok(200, "shell"));
        let worker = worker_with(network, &["./index.html"]).await;

        let report = worker.install().await.unwrap();
        assert_eq!(report.cache_name, "chinese-vocab-v2");
        assert_eq!(report.precached, 1);
    }

    #[tokio::test]
    async fn test_activation_deletes_old_buckets() {
        let network = Arc::new(MockNetwork::new());
        network.reply(DESCRIPTOR_URL, Reply::Ok(200, r#"{"mappings":{"cache_version":"app-v3"}}"#));
        let worker = worker_with(network, &[]).await;
        let caches = worker.engine().caches().clone();
        for name in ["app-v1", "app-v2", "app-v3", "fonts"] {
            caches.open_cache(name).await.unwrap();
        }

        let mut config = worker.config.clone();
        config.cache_prefix = "app-".into();
        let worker = ServiceWorker::new(config, worker.engine().clone());

        worker.install().await.unwrap();
        let report = worker.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["app-v1", "app-v2"]);
        assert_eq!(caches.keys().await.unwrap(), vec!["app-v3", "fonts"]);
        assert_eq!(worker.state().await, WorkerState::Activated);
        assert!(worker.controls_clients());
    }

    #[tokio::test]
    async fn test_guarded_transitions() {
        let worker = worker(Arc::new(MockNetwork::new())).await;
        assert!(matches!(worker.activate().await, Err(Error::InvalidState(_))));
        assert!(worker.skip_waiting().await.unwrap().is_none());

        worker.install().await.unwrap();
        assert!(matches!(worker.install().await, Err(Error::InvalidState(_))));

        let report = worker.skip_waiting().await.unwrap();
        assert!(report.is_some());
        assert_eq!(worker.state().await, WorkerState::Activated);
        assert!(matches!(worker.activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_start_reaches_activated_even_when_offline() {
        let worker = worker(Arc::new(MockNetwork::new())).await;
        assert_eq!(worker.start().await.unwrap(), WorkerState::Activated);

        worker.supersede().await;
        assert_eq!(worker.state().await, WorkerState::Redundant);
        assert!(!worker.controls_clients());
    }
}
