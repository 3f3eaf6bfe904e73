//! URL canonicalization and worker scope resolution.

use cidian_core::Error;

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize an absolute URL string.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// The URL space a worker controls: its origin plus a base path ending in `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    base: url::Url,
}

impl Scope {
    pub fn new(mut base: url::Url) -> Self {
        base.set_fragment(None);
        base.set_query(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base }
    }

    pub fn parse(input: &str) -> Result<Self, UrlError> {
        canonicalize(input).map(Self::new)
    }

    pub fn base(&self) -> &url::Url {
        &self.base
    }

    /// Resolve a scope-relative path (`./index.html`, `src/data/x.json`).
    pub fn resolve(&self, relative: &str) -> Result<url::Url, UrlError> {
        let trimmed = relative.trim();
        let rest = trimmed.strip_prefix("./").unwrap_or(trimmed).trim_start_matches('/');
        self.base
            .join(rest)
            .map_err(|e| UrlError::InvalidUrl(format!("{relative}: {e}")))
    }

    /// The app shell document every navigation falls back to.
    pub fn index_url(&self) -> Result<url::Url, UrlError> {
        self.resolve("./index.html")
    }

    /// Absolute URLs are canonicalized; anything else resolves against the scope.
    pub fn request_url(&self, input: &str) -> Result<url::Url, UrlError> {
        if input.contains("://") { canonicalize(input) } else { self.resolve(input) }
    }

    pub fn is_same_origin(&self, url: &url::Url) -> bool {
        url.origin() == self.base.origin()
    }
}
