//! Scripted in-process network and context builders for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tidecache_core::{AppConfig, ContentCache, Error, Network, RecordStore, Request, Response};
use url::Url;

use crate::context::{Background, Context};

pub const ORIGIN: &str = "https://app.test";

/// Network double: serves scripted responses while online, fails every
/// request while offline, and records what was asked for.
pub struct MockNetwork {
    responses: Mutex<HashMap<String, Response>>,
    online: AtomicBool,
    delay_ms: AtomicU64,
    calls: Mutex<Vec<Request>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            delay_ms: AtomicU64::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Serve `response` for `path` (relative to [`ORIGIN`]) or an absolute URL.
    pub fn serve(&self, path: &str, response: Response) {
        self.responses.lock().unwrap().insert(url(path).to_string(), response);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Hold every response back for `delay`.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.clone());
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        let responses = self.responses.lock().unwrap();
        Ok(responses
            .get(&request.cache_key())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found")))
    }
}

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn get(path: &str) -> Request {
    Request::get(url(path))
}

pub fn navigate(path: &str) -> Request {
    Request::navigate(url(path))
}

pub fn config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), version: "v1".into(), ..Default::default() }
}

pub async fn context(network: Arc<MockNetwork>) -> Context {
    let config = config();
    let cache = ContentCache::open_in_memory().await.unwrap();
    Context {
        origin: config.origin_url().unwrap(),
        generations: config.generations(),
        config: Arc::new(config),
        cache,
        records: RecordStore::in_memory(),
        network,
        background: Background::default(),
    }
}

pub fn html(body: &str) -> Response {
    Response::ok("text/html; charset=utf-8", body.to_string())
}

pub fn json(value: serde_json::Value) -> Response {
    Response::ok("application/json", serde_json::to_vec(&value).unwrap())
}
