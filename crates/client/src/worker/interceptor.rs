//! Decides which handler an outgoing request goes to.

use crate::fetch::Scope;
use cidian_core::{Request, RequestMode};
use serde::Serialize;

/// Extensions served by application code on the origin; never cached.
const SERVER_SIDE_EXTENSIONS: [&str; 7] = ["php", "asp", "aspx", "jsp", "py", "rb", "go"];

/// Where an intercepted request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Not intercepted; goes straight to the network.
    Passthrough,
    /// Third-party resource, served cache-first.
    CrossOrigin,
    /// Page load, answered with the cached app shell.
    Navigate,
    /// Same-origin asset, strategy chosen by the version descriptor.
    Strategy,
}

pub fn route(scope: &Scope, request: &Request) -> Route {
    if !request.is_get() {
        return Route::Passthrough;
    }
    if !scope.is_same_origin(&request.url) {
        return Route::CrossOrigin;
    }

    let path = request.path();
    if path.contains("/api/") || path.contains("_db_") || is_server_side(path) {
        return Route::Passthrough;
    }
    if request.mode == RequestMode::Navigate {
        return Route::Navigate;
    }
    Route::Strategy
}

fn is_server_side(path: &str) -> bool {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            SERVER_SIDE_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}
