//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;
use std::time::Duration;

use crate::tools::cache::{lookup_impl, stores_impl};
use crate::tools::generation::rollout_impl;
use crate::tools::proxy_fetch::proxy_fetch_impl;
use crate::tools::{CacheLookupParams, CacheStoresParams, GenerationRolloutParams, ProxyFetchParams};

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
use saveit_client::{LifecycleManager, Network, Router};
use saveit_core::CacheDb;

/// The main MCP server handler for the saveit proxy.
#[derive(Clone)]
pub struct ProxyServer {
    cache: CacheDb,
    network: Arc<dyn Network>,
    lifecycle: Arc<LifecycleManager>,
    router: Arc<Router>,
    timeout: Duration,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ProxyServer {
    /// Create a new server handler.
    pub fn new(
        cache: CacheDb, network: Arc<dyn Network>, lifecycle: Arc<LifecycleManager>, router: Arc<Router>,
        timeout: Duration,
    ) -> Self {
        Self { cache, network, lifecycle, router, timeout, tool_router: Self::tool_router() }
    }

    /// Offer a request to the offline proxy.
    #[tool(description = "Send a request through the offline proxy. Reports how it was answered and the response.")]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        proxy_fetch_impl(&self.router, self.network.as_ref(), self.timeout, params.0).await
    }

    /// List cache stores and the active generation.
    #[tool(description = "List every cache store with its entry count, plus the active cache generation.")]
    async fn cache_stores(&self, params: Parameters<CacheStoresParams>) -> Result<CallToolResult, McpError> {
        stores_impl(&self.cache, &self.lifecycle, params.0).await
    }

    /// Find the store of the active generation holding a request.
    #[tool(description = "Look up a request in the stores of the active generation. Returns CACHE_MISS when absent.")]
    async fn cache_lookup(&self, params: Parameters<CacheLookupParams>) -> Result<CallToolResult, McpError> {
        lookup_impl(&self.cache, &self.lifecycle, params.0).await
    }

    /// Install and activate a cache generation.
    #[tool(
        description = "Pre-cache the shell manifest under a new generation tag and activate it, deleting older stores."
    )]
    async fn generation_rollout(
        &self, params: Parameters<GenerationRolloutParams>,
    ) -> Result<CallToolResult, McpError> {
        rollout_impl(&self.lifecycle, params.0).await
    }
}

impl ServerHandler for ProxyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "saveit-proxy".into(),
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
