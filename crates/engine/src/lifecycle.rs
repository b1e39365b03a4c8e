//! Install, activate and control-message handling.
//!
//! ### Install
//! - Open the shell, static and data generations for the current release.
//! - Pre-cache core assets and top-level routes into the shell generation.
//!   Individual failures are logged and counted; they never abort install.
//! - If the offline document could not be fetched, install a synthesized one.
//!
//! ### Activate
//! - Delete every generation the version registry does not consider current.
//! - Claim clients: the engine starts intercepting requests.
//!
//! ### Messages
//! - `clear-offline-cache`: drop every generation carrying the engine prefix
//!   and every stored record.
//! - `warm-cache`: fetch a list of URLs into the static generation.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tidecache_core::{CacheMode, Error, Request, Role};
use tokio::sync::Mutex;

use crate::context::Context;
use crate::fallback;

/// Inbound instruction from application code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlMessage {
    ClearOfflineCache,
    WarmCache { urls: Vec<String> },
}

/// Outcome of a control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlReply {
    Cleared { generations: Vec<String>, records: u64 },
    Warmed { cached: usize, failed: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    pub cached: usize,
    pub failed: Vec<String>,
    /// Whether the offline document had to be synthesized.
    pub synthesized_offline_page: bool,
    /// Activation may proceed without waiting for old clients to close.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub claimed: bool,
}

/// Serializes lifecycle phases and tracks whether clients are claimed.
#[derive(Default)]
pub struct Lifecycle {
    phase: Mutex<()>,
    claimed: AtomicBool,
}

impl Lifecycle {
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    pub async fn install(&self, ctx: &Context) -> Result<InstallReport, Error> {
        let _phase = self.phase.lock().await;

        for role in Role::ALL {
            ctx.cache.open_generation(&ctx.generations.name(role)).await?;
        }

        let mut paths: Vec<&String> = Vec::new();
        for path in ctx.config.core_assets.iter().chain(&ctx.config.app_routes) {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }

        let shell = ctx.generations.name(Role::Shell);
        let results = join_all(paths.iter().map(|path| precache(ctx, &shell, path))).await;

        let mut cached = 0;
        let mut failed = Vec::new();
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(()) => cached += 1,
                Err(e) => {
                    tracing::warn!(%path, error = %e, "install: could not pre-cache");
                    failed.push(path.to_string());
                }
            }
        }

        let offline_key = ctx.offline_page_key()?;
        let synthesized_offline_page = ctx.cache.match_in(&shell, &offline_key).await?.is_none();
        if synthesized_offline_page {
            ctx.cache.put(&shell, &offline_key, &fallback::offline_document()).await?;
        }

        tracing::info!(version = %ctx.generations.version(), cached, failed = failed.len(), "installed");

        Ok(InstallReport { cached, failed, synthesized_offline_page, skip_waiting: true })
    }

    pub async fn activate(&self, ctx: &Context) -> Result<ActivateReport, Error> {
        let _phase = self.phase.lock().await;

        let mut deleted = Vec::new();
        for name in ctx.cache.generation_names().await? {
            if !ctx.generations.is_current(&name) && ctx.cache.delete_generation(&name).await? {
                tracing::info!(generation = %name, "deleted stale generation");
                deleted.push(name);
            }
        }

        self.claimed.store(true, Ordering::SeqCst);
        tracing::info!(version = %ctx.generations.version(), deleted = deleted.len(), "activated and claimed clients");

        Ok(ActivateReport { deleted, claimed: true })
    }

    pub async fn message(&self, ctx: &Context, message: ControlMessage) -> Result<ControlReply, Error> {
        match message {
            ControlMessage::ClearOfflineCache => self.clear(ctx).await,
            ControlMessage::WarmCache { urls } => Ok(warm(ctx, &urls).await),
        }
    }

    async fn clear(&self, ctx: &Context) -> Result<ControlReply, Error> {
        let _phase = self.phase.lock().await;

        let mut generations = Vec::new();
        for name in ctx.cache.generation_names().await? {
            if ctx.generations.is_owned(&name) && ctx.cache.delete_generation(&name).await? {
                generations.push(name);
            }
        }
        let records = ctx.records.clear().await;

        tracing::info!(generations = generations.len(), records, "cleared offline cache");
        Ok(ControlReply::Cleared { generations, records })
    }
}

async fn precache(ctx: &Context, generation: &str, path: &str) -> Result<(), Error> {
    let request = Request::get(ctx.resolve(path)?).with_cache(CacheMode::NoCache);
    let response = ctx.network.fetch(&request).await?;
    if !response.is_ok() {
        return Err(Error::Network(format!("status {}", response.status)));
    }
    ctx.cache.put(generation, &request.cache_key(), &response).await
}

async fn warm(ctx: &Context, urls: &[String]) -> ControlReply {
    let generation = ctx.generations.name(Role::Static);
    let results = join_all(urls.iter().map(|url| precache(ctx, &generation, url))).await;

    let mut cached = 0;
    let mut failed = Vec::new();
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(()) => cached += 1,
            Err(e) => {
                tracing::debug!(%url, error = %e, "warm-cache: skipped");
                failed.push(url.clone());
            }
        }
    }

    ControlReply::Warmed { cached, failed }
}
