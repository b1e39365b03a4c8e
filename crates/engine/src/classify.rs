//! Request classification.
//!
//! Every intercepted request maps to exactly one [`RouteCategory`]. Rules are
//! evaluated in a fixed order and the first match wins:
//!
//! 1. Non-GET requests pass through.
//! 2. Same-origin paths under the chunk prefix are code chunks.
//! 3. Paths under a data prefix, or containing a data keyword, are data.
//! 4. `navigate` mode requests are navigations.
//! 5. Image/style/font/script destinations or static extensions are static.
//! 6. Everything else passes through.
//!
//! Rule 3 runs before rule 4, so a page whose path looks like a data
//! endpoint (e.g. `/subjects`) is handled as data even when navigated to.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tidecache_core::{AppConfig, Destination, Request, RequestMode};
use url::Url;

/// Strategy selector computed per request. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RouteCategory {
    Chunk,
    Data,
    Navigation,
    Static,
    Passthrough,
}

impl fmt::Display for RouteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteCategory::Chunk => "chunk",
            RouteCategory::Data => "data",
            RouteCategory::Navigation => "navigation",
            RouteCategory::Static => "static",
            RouteCategory::Passthrough => "passthrough",
        };
        f.write_str(name)
    }
}

/// Pure request classifier built from configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    chunk_prefix: String,
    data_prefixes: Vec<String>,
    data_keywords: Vec<String>,
    static_extensions: Vec<String>,
}

impl Classifier {
    pub fn new(config: &AppConfig, origin: Url) -> Self {
        Self {
            origin,
            chunk_prefix: config.chunk_prefix.clone(),
            data_prefixes: config.data_prefixes.clone(),
            data_keywords: config.data_keywords.clone(),
            static_extensions: config.static_extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    pub fn classify(&self, request: &Request) -> RouteCategory {
        if !request.is_get() {
            return RouteCategory::Passthrough;
        }

        let path = request.url.path();

        if path.starts_with(&self.chunk_prefix) && self.is_same_origin(&request.url) {
            return RouteCategory::Chunk;
        }

        if self.is_data_path(path) {
            return RouteCategory::Data;
        }

        if request.mode == RequestMode::Navigate {
            return RouteCategory::Navigation;
        }

        if self.is_static(request) {
            return RouteCategory::Static;
        }

        RouteCategory::Passthrough
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    fn is_data_path(&self, path: &str) -> bool {
        self.data_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
            || self.data_keywords.iter().any(|keyword| path.contains(keyword.as_str()))
    }

    fn is_static(&self, request: &Request) -> bool {
        matches!(
            request.destination,
            Destination::Image | Destination::Style | Destination::Font | Destination::Script
        ) || request
            .extension()
            .is_some_and(|ext| self.static_extensions.contains(&ext))
    }
}
