//! Test helpers shared by the tool implementations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rmcp::model::CallToolResult;
use tidecache_core::{AppConfig, ContentCache, Error, Network, RecordStore, Request, Response};
use tidecache_engine::Engine;

pub const ORIGIN: &str = "https://app.test";

/// Scripted origin: known URLs answer, unknown ones 404, everything fails
/// while offline.
#[derive(Default)]
pub struct StubNetwork {
    responses: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
}

impl StubNetwork {
    pub fn serve(&self, path: &str, response: Response) {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{ORIGIN}{path}"), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(request.cache_key().as_str())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found")))
    }
}

/// An installed and activated engine in front of `net`.
pub async fn engine(net: Arc<StubNetwork>) -> Arc<Engine> {
    let config = AppConfig { origin: ORIGIN.into(), version: "v1".into(), ..AppConfig::default() };
    let cache = ContentCache::open_in_memory().await.unwrap();
    let engine = Engine::new(config, cache, RecordStore::in_memory(), net).unwrap();
    engine.install().await.unwrap();
    engine.activate().await.unwrap();
    Arc::new(engine)
}

/// Decode the JSON text payload of a tool result.
pub fn output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
