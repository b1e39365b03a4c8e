//! Engine configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TIDECACHE_*)
//! 2. TOML config file (if TIDECACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is immutable for the lifetime of the engine; generation
//! names and routing tables are derived from it.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::Generations;

mod validation;

pub use validation::ConfigError;

/// Engine configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TIDECACHE_*)
/// 2. TOML config file (if TIDECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// List fields are given as TOML-style arrays, e.g.
/// `TIDECACHE_APP_ROUTES='["/dashboard","/quiz"]'`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Release version tag. Must change on every deployment that alters
    /// cached asset shapes.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by every generation name this engine creates.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Origin of the host application; relative URLs resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the content cache SQLite database.
    #[serde(default = "default_content_db_path")]
    pub content_db_path: PathBuf,

    /// Path to the record store SQLite database.
    #[serde(default = "default_records_db_path")]
    pub records_db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes accepted per network response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Path prefix of framework-built code chunks.
    #[serde(default = "default_chunk_prefix")]
    pub chunk_prefix: String,

    /// Path of the dedicated offline document.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Path prefixes that identify data endpoints.
    #[serde(default = "default_data_prefixes")]
    pub data_prefixes: Vec<String>,

    /// Substrings that identify data endpoints anywhere in the path.
    #[serde(default = "default_data_keywords")]
    pub data_keywords: Vec<String>,

    /// File extensions (without the dot) treated as static assets.
    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    /// File extensions (without the dot) treated as images.
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Assets pre-cached into the shell generation on install.
    #[serde(default = "default_core_assets")]
    pub core_assets: Vec<String>,

    /// Top-level application routes pre-cached on install.
    #[serde(default = "default_app_routes")]
    pub app_routes: Vec<String>,

    /// Path fragments of sign-in, sign-up, and OAuth callback pages.
    /// Navigations matching any of these are never intercepted.
    #[serde(default = "default_auth_bypass")]
    pub auth_bypass: Vec<String>,
}

fn default_version() -> String {
    "v1".into()
}

fn default_cache_prefix() -> String {
    "tidecache".into()
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_content_db_path() -> PathBuf {
    PathBuf::from("./tidecache-content.sqlite")
}

fn default_records_db_path() -> PathBuf {
    PathBuf::from("./tidecache-records.sqlite")
}

fn default_user_agent() -> String {
    "tidecache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_chunk_prefix() -> String {
    "/_next/static/".into()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_data_prefixes() -> Vec<String> {
    strings(&["/api/", "/subjects", "/leaderboard"])
}

fn default_data_keywords() -> Vec<String> {
    strings(&["quiz", "streak"])
}

fn default_static_extensions() -> Vec<String> {
    strings(&[
        "js", "css", "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "woff", "woff2", "ttf", "otf",
    ])
}

fn default_image_extensions() -> Vec<String> {
    strings(&["png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico"])
}

fn default_core_assets() -> Vec<String> {
    strings(&["/", "/manifest.json", "/icons/icon-192x192.png", "/icons/icon-512x512.png", "/offline.html"])
}

fn default_app_routes() -> Vec<String> {
    strings(&["/dashboard", "/games", "/profile"])
}

fn default_auth_bypass() -> Vec<String> {
    strings(&["/sign-in", "/sign-up", "/sso-callback", "/oauth", "/auth/callback"])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            origin: default_origin(),
            content_db_path: default_content_db_path(),
            records_db_path: default_records_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            chunk_prefix: default_chunk_prefix(),
            offline_page: default_offline_page(),
            data_prefixes: default_data_prefixes(),
            data_keywords: default_data_keywords(),
            static_extensions: default_static_extensions(),
            image_extensions: default_image_extensions(),
            core_assets: default_core_assets(),
            app_routes: default_app_routes(),
            auth_bypass: default_auth_bypass(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {scheme}") }),
        }
    }

    /// Generation names for the configured prefix and version.
    pub fn generations(&self) -> Generations {
        Generations::new(self.cache_prefix.clone(), self.version.clone())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TIDECACHE_`
    /// 2. TOML file from `TIDECACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("TIDECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TIDECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
