//! Shared state handed to every strategy.
//!
//! Content cache failures are logged here and reported to strategies as
//! misses; strategies never see a storage error on their read path.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tidecache_core::{AppConfig, ContentCache, Error, Generations, Network, RecordStore, Request, Response, Role};
use tokio::task::JoinSet;
use url::Url;

/// Cache-population work that outlives the request that started it.
///
/// Tasks run to completion even if the caller drops the response;
/// [`Background::settle`] waits for everything spawned so far.
#[derive(Clone, Default)]
pub struct Background {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl Background {
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                tracing::warn!(error = %e, "background cache task failed");
            }
        }
        tasks.spawn(task);
    }

    /// Wait for all spawned tasks, including ones spawned while waiting.
    pub async fn settle(&self) {
        loop {
            let mut pending = {
                let mut tasks = self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                std::mem::take(&mut *tasks)
            };
            if pending.is_empty() {
                return;
            }
            while let Some(done) = pending.join_next().await {
                if let Err(e) = done {
                    tracing::warn!(error = %e, "background cache task failed");
                }
            }
        }
    }
}

/// Everything a strategy may read or write.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<AppConfig>,
    pub origin: Url,
    pub generations: Generations,
    pub cache: ContentCache,
    pub records: RecordStore,
    pub network: Arc<dyn Network>,
    pub background: Background,
}

impl Context {
    /// Resolve a configured path (or absolute URL) against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        self.origin
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    /// Look up `key` in the current generation for `role`.
    pub async fn lookup(&self, role: Role, key: &str) -> Option<Response> {
        let generation = self.generations.name(role);
        match self.cache.match_in(&generation, key).await {
            Ok(hit) => {
                tracing::debug!(%generation, key, hit = hit.is_some(), "cache lookup");
                hit
            }
            Err(e) => {
                tracing::warn!(%generation, key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Look up `key` across every generation.
    pub async fn lookup_any(&self, key: &str) -> Option<Response> {
        match self.cache.match_any(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store `response` for `request` in the `role` generation without
    /// holding up the caller.
    pub fn store_later(&self, role: Role, request: &Request, response: Response) {
        let cache = self.cache.clone();
        let generation = self.generations.name(role);
        let key = request.cache_key();
        self.background.spawn(async move {
            if let Err(e) = cache.put(&generation, &key, &response).await {
                tracing::warn!(%generation, %key, error = %e, "cache write failed");
            }
        });
    }

    /// Whether a navigation to `request` must be left to the browser.
    pub fn is_auth_route(&self, request: &Request) -> bool {
        let path = request.url.path();
        self.config.auth_bypass.iter().any(|pattern| path.contains(pattern.as_str()))
    }

    /// Whether `request` asks for an image, by destination or extension.
    pub fn is_image(&self, request: &Request) -> bool {
        request.destination == tidecache_core::Destination::Image
            || request
                .extension()
                .is_some_and(|ext| self.config.image_extensions.iter().any(|i| i.eq_ignore_ascii_case(&ext)))
    }

    /// Content cache key of the offline document.
    pub fn offline_page_key(&self) -> Result<String, Error> {
        Ok(Request::get(self.resolve(&self.config.offline_page)?).cache_key())
    }
}
