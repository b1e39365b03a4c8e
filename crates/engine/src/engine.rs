//! The engine's single entry point for intercepted requests.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tidecache_core::{AppConfig, ContentCache, Error, Network, RecordStore, Request};
use tokio::sync::oneshot;

use crate::classify::{Classifier, RouteCategory};
use crate::context::{Background, Context};
use crate::lifecycle::{ActivateReport, ControlMessage, ControlReply, InstallReport, Lifecycle};
use crate::strategy::{Dispatch, RouteTable};

/// Status of one generation as reported by [`Engine::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationStatus {
    pub name: String,
    pub current: bool,
    pub entries: u64,
    pub created_at: String,
}

/// Offline-first request router.
///
/// Built once from an immutable configuration; every request goes through
/// [`Engine::handle`], which classifies it and runs the strategy the route
/// table assigns to its category.
pub struct Engine {
    ctx: Context,
    classifier: Classifier,
    routes: RouteTable,
    lifecycle: Lifecycle,
}

impl Engine {
    pub fn new(
        config: AppConfig, cache: ContentCache, records: RecordStore, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let classifier = Classifier::new(&config, origin.clone());
        let ctx = Context {
            generations: config.generations(),
            config: Arc::new(config),
            origin,
            cache,
            records,
            network,
            background: Background::default(),
        };

        Ok(Self { ctx, classifier, routes: RouteTable::standard(), lifecycle: Lifecycle::default() })
    }

    /// Replace the dispatch table.
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn config(&self) -> &AppConfig {
        &self.ctx.config
    }

    pub fn classify(&self, request: &Request) -> RouteCategory {
        self.classifier.classify(request)
    }

    /// Route one intercepted request.
    ///
    /// Requests arriving before activation has claimed clients, auth routes,
    /// and requests with no strategy for their category are bypassed. The
    /// auth check runs before classification, so an OAuth callback under a
    /// data prefix is still left alone.
    ///
    /// The strategy runs as a background task: if the caller stops waiting,
    /// the handler still completes and populates the cache.
    pub async fn handle(&self, request: &Request) -> Dispatch {
        if !self.lifecycle.is_claimed() {
            tracing::debug!(url = %request.url, "clients not claimed yet, bypassing");
            return Dispatch::Bypass;
        }

        if self.ctx.is_auth_route(request) {
            tracing::debug!(path = %request.url.path(), "auth route, not intercepting");
            return Dispatch::Bypass;
        }

        let category = self.classifier.classify(request);
        tracing::debug!(url = %request.url, %category, "routing request");

        let Some(strategy) = self.routes.get(category).cloned() else {
            return Dispatch::Bypass;
        };

        let (reply, dispatch) = oneshot::channel();
        let ctx = self.ctx.clone();
        let request = request.clone();
        self.ctx.background.spawn(async move {
            let result = strategy.handle(&ctx, &request).await;
            if reply.send(result).is_err() {
                tracing::debug!(url = %request.url, "caller went away, handler completed anyway");
            }
        });

        dispatch
            .await
            .unwrap_or_else(|_| Dispatch::Respond(Err(Error::Internal("request handler did not complete".into()))))
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install(&self.ctx).await
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.lifecycle.activate(&self.ctx).await
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_claimed()
    }

    pub async fn message(&self, message: ControlMessage) -> Result<ControlReply, Error> {
        self.lifecycle.message(&self.ctx, message).await
    }

    /// Wait for outstanding cache writes started by earlier requests.
    pub async fn settle(&self) {
        self.ctx.background.settle().await;
    }

    /// Every generation in the content cache, flagged current or stale.
    pub async fn status(&self) -> Result<Vec<GenerationStatus>, Error> {
        let infos = self.ctx.cache.generations().await?;
        Ok(infos
            .into_iter()
            .map(|info| GenerationStatus {
                current: self.ctx.generations.is_current(&info.name),
                name: info.name,
                entries: info.entries,
                created_at: info.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MockNetwork};
    use crate::strategy::Strategy;
    use serde_json::json;
    use std::time::Duration;
    use tidecache_core::{Destination, Response, Role};

    fn engine(net: &Arc<MockNetwork>, version: &str, cache: ContentCache) -> Engine {
        let config = AppConfig { version: version.into(), ..testing::config() };
        Engine::new(config, cache, RecordStore::in_memory(), net.clone()).unwrap()
    }

    async fn ready(net: &Arc<MockNetwork>) -> Engine {
        let engine = engine(net, "v1", ContentCache::open_in_memory().await.unwrap());
        engine.install().await.unwrap();
        engine.activate().await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_requests_bypass_until_activated() {
        let net = MockNetwork::new();
        let engine = engine(&net, "v1", ContentCache::open_in_memory().await.unwrap());

        assert!(engine.handle(&testing::get("/api/me")).await.is_bypass());
        engine.activate().await.unwrap();
        assert!(!engine.handle(&testing::get("/api/me")).await.is_bypass());
    }

    #[tokio::test]
    async fn test_passthrough_is_bypassed() {
        let net = MockNetwork::new();
        let engine = ready(&net).await;
        let before = net.call_count();

        assert!(engine.handle(&testing::get("/api/score").with_method("POST")).await.is_bypass());
        assert!(engine.handle(&testing::get("/robots.txt")).await.is_bypass());
        assert_eq!(net.call_count(), before);
    }

    #[tokio::test]
    async fn test_data_replayed_offline_with_marker() {
        let net = MockNetwork::new();
        let engine = ready(&net).await;
        let subjects = json!({"subjects": [{"id": 1, "name": "Maths"}, {"id": 2, "name": "Physics"}]});
        net.serve("/subjects?class=10", testing::json(subjects.clone()));
        let req = testing::get("/subjects?class=10");

        let online = engine.handle(&req).await;
        assert!(!online.response().unwrap().is_offline());
        engine.settle().await;

        let record = engine.context().records.get("/subjects?class=10").await.into_option().unwrap();
        assert_eq!(record.data, subjects);

        // Lose the cached response too, leaving only the record store.
        net.set_online(false);
        let data_generation = engine.context().generations.name(Role::Data);
        engine.context().cache.delete_generation(&data_generation).await.unwrap();

        let offline = engine.handle(&req).await;
        let response = offline.response().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("X-Offline"), Some("1"));
        assert_eq!(serde_json::from_slice::<serde_json::Value>(&response.body).unwrap(), subjects);
    }

    #[tokio::test]
    async fn test_chunk_failure_returns_importable_stub() {
        let net = MockNetwork::new();
        let engine = ready(&net).await;
        net.set_online(false);

        let dispatch = engine.handle(&testing::get("/_next/static/chunks/pages/quiz-91ab.js")).await;
        let response = dispatch.response().expect("stub instead of a network error");
        assert_eq!(response.status, 200);
        assert!(response.text().contains("export {};"));
    }

    #[tokio::test]
    async fn test_deep_route_falls_back_to_shell_not_offline_page() {
        let net = MockNetwork::new();
        net.serve("/", testing::html("app shell"));
        net.serve("/offline.html", testing::html("offline page"));
        let engine = ready(&net).await;
        net.set_online(false);

        let dispatch = engine.handle(&testing::navigate("/games/chess/room/42")).await;
        assert_eq!(dispatch.response().unwrap().text(), "app shell");

        let sign_in = engine.handle(&testing::navigate("/sign-in")).await;
        assert!(sign_in.is_bypass());
    }

    #[tokio::test]
    async fn test_generation_gc_across_versions() {
        let net = MockNetwork::new();
        let cache = ContentCache::open_in_memory().await.unwrap();

        let v1 = engine(&net, "2025.1", cache.clone());
        v1.install().await.unwrap();
        v1.activate().await.unwrap();
        net.serve("/img/hero.png", Response::ok("image/png", "hero"));
        v1.handle(&testing::get("/img/hero.png")).await;
        v1.settle().await;

        let v2 = engine(&net, "2025.2", cache.clone());
        v2.install().await.unwrap();
        let report = v2.activate().await.unwrap();
        assert_eq!(report.deleted.len(), 3);

        let names = cache.generation_names().await.unwrap();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|name| !name.contains("2025.1")), "{names:?}");
    }

    #[tokio::test]
    async fn test_status_flags_current_generations() {
        let net = MockNetwork::new();
        let engine = ready(&net).await;
        engine.context().cache.open_generation("tidecache-static-v0").await.unwrap();

        let status = engine.status().await.unwrap();
        assert_eq!(status.len(), 4);
        assert_eq!(status.iter().filter(|g| g.current).count(), 3);
        assert!(!status.iter().find(|g| g.name == "tidecache-static-v0").unwrap().current);
    }

    #[tokio::test]
    async fn test_clear_message_empties_offline_sources() {
        let net = MockNetwork::new();
        let engine = ready(&net).await;
        net.serve("/api/me", testing::json(json!({"name": "ana"})));
        engine.handle(&testing::get("/api/me")).await;
        engine.settle().await;

        engine.message(ControlMessage::ClearOfflineCache).await.unwrap();
        net.set_online(false);

        let dispatch = engine.handle(&testing::get("/api/me")).await;
        assert!(matches!(dispatch, Dispatch::Respond(Err(_))));
    }

    #[tokio::test]
    async fn test_custom_route_table() {
        struct Offline;

        #[async_trait::async_trait]
        impl Strategy for Offline {
            async fn handle(&self, _ctx: &Context, _request: &Request) -> Dispatch {
                Dispatch::Respond(Ok(Response::new(503, "")))
            }
        }

        let net = MockNetwork::new();
        let engine = ready(&net).await.with_routes(RouteTable::default().with(RouteCategory::Static, Offline));

        let req = testing::get("/avatar/1").with_destination(Destination::Image);
        assert_eq!(engine.handle(&req).await.response().unwrap().status, 503);
        assert!(engine.handle(&testing::get("/api/me")).await.is_bypass());
    }

    #[tokio::test]
    async fn test_oauth_callback_under_data_prefix_is_bypassed() {
        let net = MockNetwork::new();
        let engine = ready(&net).await;
        let before = net.call_count();

        let callback = testing::navigate("/api/auth/callback/google?code=1");
        assert_eq!(engine.classify(&callback), RouteCategory::Data);
        assert!(engine.handle(&callback).await.is_bypass());
        assert!(engine.handle(&testing::get("/api/auth/callback/github")).await.is_bypass());
        assert_eq!(net.call_count(), before);

        engine.settle().await;
        let data_generation = engine.context().generations.name(Role::Data);
        assert!(engine.context().cache.keys(&data_generation).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handler_completes_after_caller_gives_up() {
        let net = MockNetwork::new();
        let engine = ready(&net).await;
        net.serve("/subjects?class=10", testing::json(json!({"subjects": ["maths"]})));
        net.set_delay(Duration::from_millis(200));
        let req = testing::get("/subjects?class=10");

        let gave_up = tokio::time::timeout(Duration::from_millis(50), engine.handle(&req)).await;
        assert!(gave_up.is_err());

        engine.settle().await;
        let ctx = engine.context();
        assert!(ctx.lookup(Role::Data, &req.cache_key()).await.is_some());
        assert!(ctx.records.get("/subjects?class=10").await.is_found());
    }

    #[tokio::test]
    async fn test_panicking_strategy_is_internal_error() {
        struct Broken;

        #[async_trait::async_trait]
        impl Strategy for Broken {
            async fn handle(&self, _ctx: &Context, _request: &Request) -> Dispatch {
                panic!("strategy blew up")
            }
        }

        let net = MockNetwork::new();
        let engine = ready(&net).await.with_routes(RouteTable::default().with(RouteCategory::Data, Broken));

        let dispatch = engine.handle(&testing::get("/api/me")).await;
        assert!(matches!(dispatch, Dispatch::Respond(Err(Error::Internal(_)))));
        engine.settle().await;
    }
}
