//! cache_status tool implementation.
//!
//! Lists every generation in the content cache with its entry count and
//! whether it belongs to the running release.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tidecache_core::Error;
use tidecache_engine::{Engine, GenerationStatus};

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    /// Release version tag the engine is running.
    pub version: String,
    /// Whether the engine has claimed clients and is intercepting requests.
    pub active: bool,
    pub generations: Vec<GenerationStatus>,
}

/// Implementation of the cache_status tool.
pub async fn status_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let output = CacheStatusOutput {
        version: engine.config().version.clone(),
        active: engine.is_active(),
        generations: engine.status().await?,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
