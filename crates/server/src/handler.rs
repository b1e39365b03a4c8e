//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheWarmParams, clear_impl, status_impl, warm_impl};
use crate::tools::fetch::{OfflineFetchParams, fetch_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tidecache_engine::Engine;

/// The main MCP server handler for tidecache.
#[derive(Clone)]
pub struct TidecacheServer {
    engine: Arc<Engine>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl TidecacheServer {
    /// Create a server handler around an installed engine.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    /// Route a request through the offline engine.
    #[tool(
        description = "Fetch a path or URL through the offline-first engine. Falls back to cached responses, stored records, or placeholders when the origin is unreachable."
    )]
    async fn offline_fetch(&self, params: Parameters<OfflineFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    #[tool(description = "Delete every tidecache generation and all stored offline records.")]
    async fn cache_clear(&self) -> Result<CallToolResult, McpError> {
        clear_impl(&self.engine).await
    }

    #[tool(description = "Fetch a list of paths or URLs into the static cache ahead of going offline.")]
    async fn cache_warm(&self, params: Parameters<CacheWarmParams>) -> Result<CallToolResult, McpError> {
        warm_impl(&self.engine, params.0).await
    }

    #[tool(description = "List cache generations with entry counts and whether they belong to the running version.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.engine).await
    }
}

impl ServerHandler for TidecacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "tidecache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, StubNetwork};

    #[tokio::test]
    async fn test_tool_router_lists_all_tools() {
        let engine = testing::engine(Arc::new(StubNetwork::default())).await;
        let server = TidecacheServer::new(engine);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, ["cache_clear", "cache_status", "cache_warm", "offline_fetch"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let engine = testing::engine(Arc::new(StubNetwork::default())).await;
        let info = TidecacheServer::new(engine).get_info();
        assert_eq!(info.server_info.name, "tidecache");
    }
}
