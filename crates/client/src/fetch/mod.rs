//! Network seam for the worker engine.
//!
//! ### Transport
//! - [`Network`] is the only way the engine reaches the origin, so tests
//!   swap in scripted implementations
//! - [`HttpNetwork`] is the reqwest implementation: rustls, gzip/brotli/deflate,
//!   limited redirects, a body size cap
//!
//! ### Status handling
//! - Non-2xx responses are returned as responses, not errors; strategies
//!   decide whether to cache them
//! - Transport failures map to `NETWORK_ERROR`, deadlines to `NETWORK_TIMEOUT`

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use url::{Scope, UrlError, canonicalize};

use cidian_core::{AppConfig, Error, Request, Response};

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "cidian/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 20MB)
    pub max_bytes: usize,

    /// Transport-level request timeout (default: 30s). Strategy deadlines
    /// are shorter and enforced separately.
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "cidian/0.1".to_string(),
            max_bytes: 20 * 1024 * 1024,
            timeout: Duration::from_secs(30),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), max_bytes: config.max_bytes, ..Default::default() }
    }
}

/// Something that can perform a request against the network.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Run `network.fetch` under a deadline.
pub async fn fetch_with_timeout(network: &dyn Network, request: &Request, timeout: Duration) -> Result<Response, Error> {
    match tokio::time::timeout(timeout, network.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(format!("{} after {}ms", request.url, timeout.as_millis()))),
    }
}

/// reqwest-backed [`Network`].
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::HttpError(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{}: {}", request.url, e))
            } else {
                Error::Network(format!("{}: {}", request.url, e))
            }
        })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let final_url = response.url().to_string();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let bytes: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(Response {
            url: Some(final_url),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes,
        })
    }
}

/// Headers that make the origin and any intermediary skip their caches.
pub fn no_cache_headers(request: Request) -> Request {
    request
        .with_header(header::CACHE_CONTROL.as_str(), "no-cache, no-store, must-revalidate")
        .with_header(header::PRAGMA.as_str(), "no-cache")
        .with_header(header::EXPIRES.as_str(), "0")
}


#[cfg(test)]
mod tests {
    use super::*;
    use testing::{MockNetwork, Reply};

    fn get(url: &str) -> Request {
        Request::get(::url::Url::parse(url).unwrap())
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "cidian/0.1");
        assert_eq!(config.max_bytes, 20 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test/1".into(), max_bytes: 1024, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test/1");
        assert_eq!(config.max_bytes, 1024);
    }

    #[test]
    fn test_http_network_new() {
        assert!(HttpNetwork::new(FetchConfig::default()).is_ok());
    }

    #[test]
    fn test_no_cache_headers() {
        let req = no_cache_headers(get("https://app.example/data.json"));
        let names: Vec<&str> = req.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["cache-control", "pragma", "expires"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_with_timeout_expires() {
        let network = MockNetwork::new();
        network.reply("https://app.example/slow", Reply::Delay(Duration::from_secs(10), 200, "late"));

        let result = fetch_with_timeout(&network, &get("https://app.example/slow"), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_with_timeout_passes_through() {
        let network = MockNetwork::new();
        network.reply("https://app.example/fast", Reply::Ok(200, "ok"));

        let resp = fetch_with_timeout(&network, &get("https://app.example/fast"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(resp.text(), "ok");
    }
}
