//! Request and response values shared by the cache and the worker engine.
//!
//! These are deliberately transport-agnostic: the fetch client converts
//! to and from reqwest types, Cache Storage persists them as rows.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// How the request was initiated by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Full-page load.
    Navigate,
    #[default]
    Cors,
    NoCors,
    SameOrigin,
}

/// An outgoing request as seen by the worker.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// A plain GET in `cors` mode.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, mode: RequestMode::Cors, headers: Vec::new() }
    }

    /// A navigation (full-page) GET.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Path component of the request URL.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// A full response: status line, headers and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub url: Option<String>,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { url: None, status, status_text: String::new(), headers: Vec::new(), body: body.into() }
    }

    /// Synthetic response returned when neither network nor cache can serve.
    pub fn service_unavailable() -> Self {
        Self { status_text: "Service Unavailable".into(), ..Self::new(503, Bytes::new()) }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// True for 2xx statuses.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
