//! Cache-first handling of images, fonts, stylesheets and scripts.

use tidecache_core::{Request, Role};

use super::{Dispatch, Strategy};
use crate::context::Context;
use crate::fallback;

/// Label drawn into placeholder images.
const PLACEHOLDER_LABEL: &str = "Offline";

pub struct StaticStrategy;

#[async_trait::async_trait]
impl Strategy for StaticStrategy {
    async fn handle(&self, ctx: &Context, request: &Request) -> Dispatch {
        let key = request.cache_key();
        if let Some(cached) = ctx.lookup(Role::Static, &key).await {
            return Dispatch::Respond(Ok(cached));
        }

        let err = match ctx.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    ctx.store_later(Role::Static, request, response.clone());
                }
                return Dispatch::Respond(Ok(response));
            }
            Err(err) => err,
        };

        // Another request may have populated the entry while this one waited.
        if let Some(cached) = ctx.lookup(Role::Static, &key).await {
            return Dispatch::Respond(Ok(cached));
        }

        if ctx.is_image(request) {
            tracing::debug!(url = %request.url, "serving placeholder image");
            return Dispatch::Respond(Ok(fallback::placeholder_image(PLACEHOLDER_LABEL)));
        }

        Dispatch::Respond(Err(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, MockNetwork};
    use tidecache_core::{Destination, Response};

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let net = MockNetwork::new();
        let ctx = testing::context(net.clone()).await;
        let req = testing::get("/icons/icon-192x192.png");
        ctx.cache
            .put(&ctx.generations.name(Role::Static), &req.cache_key(), &Response::ok("image/png", "png"))
            .await
            .unwrap();

        let dispatch = StaticStrategy.handle(&ctx, &req).await;
        assert_eq!(dispatch.response().unwrap().text(), "png");
        assert_eq!(net.call_count(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_stores() {
        let net = MockNetwork::new();
        net.serve("/fonts/inter.woff2", Response::ok("font/woff2", "font"));
        let ctx = testing::context(net.clone()).await;
        let req = testing::get("/fonts/inter.woff2");

        assert_eq!(StaticStrategy.handle(&ctx, &req).await.response().unwrap().text(), "font");
        ctx.background.settle().await;

        net.set_online(false);
        assert_eq!(StaticStrategy.handle(&ctx, &req).await.response().unwrap().text(), "font");
        assert_eq!(net.call_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_image_gets_placeholder() {
        let net = MockNetwork::new();
        net.set_online(false);
        let ctx = testing::context(net).await;

        let by_ext = StaticStrategy.handle(&ctx, &testing::get("/img/badge.webp")).await;
        assert_eq!(by_ext.response().unwrap().content_type(), Some("image/svg+xml"));
        assert!(by_ext.response().unwrap().text().contains(PLACEHOLDER_LABEL));

        let by_dest = testing::get("/avatar/42").with_destination(Destination::Image);
        let dispatch = StaticStrategy.handle(&ctx, &by_dest).await;
        assert_eq!(dispatch.response().unwrap().content_type(), Some("image/svg+xml"));
    }

    #[tokio::test]
    async fn test_offline_non_image_propagates_failure() {
        let net = MockNetwork::new();
        net.set_online(false);
        let ctx = testing::context(net).await;

        let dispatch = StaticStrategy.handle(&ctx, &testing::get("/fonts/inter.woff2")).await;
        assert!(matches!(dispatch, Dispatch::Respond(Err(ref e)) if e.is_network()));
    }

    #[tokio::test]
    async fn test_cache_read_failure_is_a_miss() {
        let net = MockNetwork::new();
        net.serve("/fonts/inter.woff2", Response::ok("font/woff2", "font"));
        let ctx = testing::context(net.clone()).await;
        ctx.cache.clone().close().await.unwrap();

        let dispatch = StaticStrategy.handle(&ctx, &testing::get("/fonts/inter.woff2")).await;
        assert_eq!(dispatch.response().unwrap().text(), "font");
        assert_eq!(net.call_count(), 1);
        ctx.background.settle().await;
    }
}
