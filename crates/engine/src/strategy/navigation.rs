//! Network-first handling of page navigations.
//!
//! Sign-in, sign-up, and OAuth callback pages are never intercepted so
//! auth redirects cannot be trapped in a stale shell. Every other
//! navigation revalidates with the origin and, when that fails, falls back
//! through: exact match, same path without query, the root shell, and
//! finally the offline document.

use tidecache_core::{CacheMode, Request, Role};

use super::{Dispatch, Strategy};
use crate::context::Context;

pub struct NavigationStrategy;

#[async_trait::async_trait]
impl Strategy for NavigationStrategy {
    async fn handle(&self, ctx: &Context, request: &Request) -> Dispatch {
        if ctx.is_auth_route(request) {
            tracing::debug!(path = %request.url.path(), "auth navigation, not intercepting");
            return Dispatch::Bypass;
        }

        let revalidate = request.clone().with_cache(CacheMode::NoCache);
        let err = match ctx.network.fetch(&revalidate).await {
            Ok(response) => {
                if response.is_ok() && response.is_html() {
                    ctx.store_later(Role::Shell, request, response.clone());
                }
                return Dispatch::Respond(Ok(response));
            }
            Err(err) => err,
        };

        tracing::debug!(url = %request.url, error = %err, "navigation failed, trying shell");

        let mut candidates = vec![
            request.cache_key(),
            request.without_query().cache_key(),
            request.root().cache_key(),
        ];
        match ctx.offline_page_key() {
            Ok(key) => candidates.push(key),
            Err(e) => tracing::warn!(error = %e, "offline page path does not resolve"),
        }

        for key in &candidates {
            if let Some(cached) = ctx.lookup(Role::Shell, key).await {
                tracing::debug!(%key, "serving navigation from shell");
                return Dispatch::Respond(Ok(cached));
            }
        }

        Dispatch::Respond(Err(err))
    }
}
