//! offline_fetch tool implementation.
//!
//! Routes one request through the engine exactly as an intercepted page
//! request would be. Requests the engine declines go to the network as-is.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tidecache_core::{CacheMode, Destination, Error, Request, RequestMode, Response};
use tidecache_engine::{Dispatch, Engine, RouteCategory};

/// Parameters for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// Path relative to the configured origin, or an absolute URL.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode; use "navigate" for page loads.
    #[serde(default)]
    pub mode: RequestMode,

    /// Resource destination, as a browser would set it.
    #[serde(default)]
    pub destination: Destination,

    /// Ask intermediaries to revalidate.
    #[serde(default)]
    pub no_cache: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// Category the engine assigned to the request.
    pub category: RouteCategory,
    /// Whether the engine answered (false when the request bypassed it).
    pub intercepted: bool,
    pub status: u16,
    /// Whether the response was replayed from the record store.
    pub offline: bool,
    pub headers: BTreeMap<String, String>,
    /// Body text for textual content types.
    pub body: Option<String>,
    /// Body size in bytes.
    pub bytes: usize,
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl(engine: &Engine, params: OfflineFetchParams) -> Result<CallToolResult, McpError> {
    let url = tidecache_client::resolve(&engine.context().origin, &params.url)
        .map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::get(url)
        .with_method(&params.method)
        .with_mode(params.mode)
        .with_destination(params.destination);
    if params.no_cache {
        request = request.with_cache(CacheMode::NoCache);
    }

    let category = engine.classify(&request);
    let (response, intercepted) = match engine.handle(&request).await {
        Dispatch::Respond(result) => (result?, true),
        Dispatch::Bypass => (engine.context().network.fetch(&request).await?, false),
    };

    let output = OfflineFetchOutput {
        url: request.url.to_string(),
        category,
        intercepted,
        status: response.status,
        offline: response.is_offline(),
        body: is_textual(&response).then(|| response.text()),
        bytes: response.body.len(),
        headers: response.headers,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn is_textual(response: &Response) -> bool {
    let Some(content_type) = response.content_type() else {
        return false;
    };
    let mime = content_type.to_ascii_lowercase();
    mime.starts_with("text/")
        || response.is_json()
        || mime.contains("javascript")
        || mime.contains("xml")
}
