//! cache_warm tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tidecache_core::Error;
use tidecache_engine::{ControlMessage, Engine};

/// Parameters for the cache_warm tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheWarmParams {
    /// Paths or absolute URLs to fetch into the static generation.
    pub urls: Vec<String>,
}

/// Implementation of the cache_warm tool.
pub async fn warm_impl(engine: &Engine, params: CacheWarmParams) -> Result<CallToolResult, McpError> {
    if params.urls.is_empty() {
        return Err(Error::InvalidInput("urls cannot be empty".into()).into());
    }

    let reply = engine
        .message(ControlMessage::WarmCache { urls: params.urls })
        .await?;
    let json = serde_json::to_string_pretty(&reply)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
