//! Network seam consumed by the engine.

use crate::Error;
use crate::http::{Request, Response};

/// Performs real network fetches on behalf of the engine.
///
/// An `Err` means the network produced no response at all (offline, DNS,
/// timeout). HTTP error statuses are returned as ordinary responses.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
