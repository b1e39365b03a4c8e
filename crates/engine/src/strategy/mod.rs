//! Strategy executors and the dispatch table that selects them.
//!
//! One executor per [`RouteCategory`]. The [`RouteTable`] is built once and
//! consulted by the engine's single entry point; categories without an
//! executor (passthrough) are left to the browser.

pub mod chunk;
pub mod data;
pub mod navigation;
pub mod static_asset;

use std::collections::HashMap;
use std::sync::Arc;

use tidecache_core::{Error, Request, Response};

use crate::classify::RouteCategory;
use crate::context::Context;

pub use chunk::ChunkStrategy;
pub use data::DataStrategy;
pub use navigation::NavigationStrategy;
pub use static_asset::StaticStrategy;

/// What the engine did with a request.
#[derive(Debug)]
pub enum Dispatch {
    /// The engine answers the request. An `Err` reaches the page as a
    /// network error.
    Respond(Result<Response, Error>),
    /// The engine declined to intercept; the host's default handling applies.
    Bypass,
}

impl Dispatch {
    pub fn is_bypass(&self) -> bool {
        matches!(self, Dispatch::Bypass)
    }

    /// The response, if the engine answered with one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Dispatch::Respond(Ok(response)) => Some(response),
            _ => None,
        }
    }
}

/// Read/write/fallback policy for one route category.
#[async_trait::async_trait]
pub trait Strategy: Send + Sync {
    async fn handle(&self, ctx: &Context, request: &Request) -> Dispatch;
}

/// Mapping from route category to the strategy that handles it.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: HashMap<RouteCategory, Arc<dyn Strategy>>,
}

impl RouteTable {
    /// The standard table: chunk, data, navigation and static executors.
    pub fn standard() -> Self {
        Self::default()
            .with(RouteCategory::Chunk, ChunkStrategy)
            .with(RouteCategory::Data, DataStrategy)
            .with(RouteCategory::Navigation, NavigationStrategy)
            .with(RouteCategory::Static, StaticStrategy)
    }

    pub fn with(mut self, category: RouteCategory, strategy: impl Strategy + 'static) -> Self {
        self.routes.insert(category, Arc::new(strategy));
        self
    }

    pub fn get(&self, category: RouteCategory) -> Option<&Arc<dyn Strategy>> {
        self.routes.get(&category)
    }
}
