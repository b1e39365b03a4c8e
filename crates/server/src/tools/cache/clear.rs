//! cache_clear tool implementation.
//!
//! Drops every generation carrying the engine prefix and every stored
//! record. Generations belonging to other applications are left alone.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use tidecache_core::Error;
use tidecache_engine::{ControlMessage, Engine};

/// Implementation of the cache_clear tool.
pub async fn clear_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let reply = engine.message(ControlMessage::ClearOfflineCache).await?;
    let json = serde_json::to_string_pretty(&reply)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
