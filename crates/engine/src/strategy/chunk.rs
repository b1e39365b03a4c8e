//! Network-first handling of framework code chunks.
//!
//! A chunk that cannot be loaded falls back to the static generation, then
//! to an inert script or empty stylesheet so a failed import never throws.

use tidecache_core::{Request, Role};

use super::{Dispatch, Strategy};
use crate::context::Context;
use crate::fallback;

pub struct ChunkStrategy;

#[async_trait::async_trait]
impl Strategy for ChunkStrategy {
    async fn handle(&self, ctx: &Context, request: &Request) -> Dispatch {
        let err = match ctx.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    ctx.store_later(Role::Static, request, response.clone());
                }
                return Dispatch::Respond(Ok(response));
            }
            Err(err) => err,
        };

        tracing::debug!(url = %request.url, error = %err, "chunk fetch failed");

        if let Some(cached) = ctx.lookup(Role::Static, &request.cache_key()).await {
            return Dispatch::Respond(Ok(cached));
        }

        let path = request.url.path();
        match request.extension().as_deref() {
            Some("js" | "mjs") => {
                tracing::warn!(%path, "serving inert stub for missing script chunk");
                Dispatch::Respond(Ok(fallback::script_stub(path)))
            }
            Some("css") => Dispatch::Respond(Ok(fallback::empty_stylesheet())),
            _ => Dispatch::Respond(Err(err)),
        }
    }
}
