//! Network-first handling of data endpoints.
//!
//! Successful JSON responses are captured twice: the raw response in the
//! data generation and the decoded body in the record store. When the
//! network fails the caches are tried first and the record store last. An
//! exhausted chain surfaces the network error; wrong data is worse than a
//! visible failure here.

use bytes::Bytes;
use tidecache_core::{Lookup, Request, Role, StoredRecord};

use super::{Dispatch, Strategy};
use crate::context::Context;
use crate::fallback;

pub struct DataStrategy;

#[async_trait::async_trait]
impl Strategy for DataStrategy {
    async fn handle(&self, ctx: &Context, request: &Request) -> Dispatch {
        let err = match ctx.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    if response.is_json() {
                        capture_record(ctx, request.path_and_query(), response.body.clone());
                    }
                    ctx.store_later(Role::Data, request, response.clone());
                }
                return Dispatch::Respond(Ok(response));
            }
            Err(err) => err,
        };

        tracing::debug!(url = %request.url, error = %err, "data fetch failed, trying offline sources");

        let key = request.cache_key();
        if let Some(cached) = ctx.lookup_any(&key).await {
            return Dispatch::Respond(Ok(cached));
        }
        if let Some(cached) = ctx.lookup(Role::Data, &key).await {
            return Dispatch::Respond(Ok(cached));
        }

        match ctx.records.get(&request.path_and_query()).await {
            Lookup::Found(record) => {
                tracing::debug!(key = %request.path_and_query(), "serving data from record store");
                Dispatch::Respond(fallback::offline_json(&record))
            }
            Lookup::Absent => Dispatch::Respond(Err(err)),
        }
    }
}

fn capture_record(ctx: &Context, key: String, body: Bytes) {
    let records = ctx.records.clone();
    ctx.background.spawn(async move {
        match serde_json::from_slice(&body) {
            Ok(data) => {
                records.put(&key, &StoredRecord::captured(data)).await;
            }
            Err(e) => tracing::warn!(%key, error = %e, "JSON response body did not decode, not recorded"),
        }
    });
}
