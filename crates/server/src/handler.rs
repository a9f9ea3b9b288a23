//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::cache::purge_impl;
use crate::tools::contributor::{
    AwaitUpdateParams, ContributorCreateParams, ContributorDeleteParams, ContributorGetByUsernameParams,
    ContributorGetParams, ContributorListParams, ContributorUpdateParams, await_update_impl, create_impl, delete_impl,
    get_by_username_impl, get_impl, list_impl, update_impl,
};

use contributors_core::ContributorService;
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

/// The main MCP server handler for the contributors service.
#[derive(Clone)]
pub struct ContributorsServer {
    service: ContributorService,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ContributorsServer {
    /// Create a new server handler over `service`.
    pub fn new(service: ContributorService) -> Self {
        Self { service, tool_router: Self::tool_router() }
    }

    #[tool(description = "Create a contributor. Username and email must be unique. Returns the stored record.")]
    async fn contributor_create(
        &self, params: Parameters<ContributorCreateParams>,
    ) -> Result<CallToolResult, McpError> {
        create_impl(&self.service, params.0).await
    }

    #[tool(description = "Fetch a contributor by id.")]
    async fn contributor_get(&self, params: Parameters<ContributorGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.service, params.0).await
    }

    #[tool(description = "Fetch a contributor by username.")]
    async fn contributor_get_by_username(
        &self, params: Parameters<ContributorGetByUsernameParams>,
    ) -> Result<CallToolResult, McpError> {
        get_by_username_impl(&self.service, params.0).await
    }

    /// List contributors, newest first.
    ///
    /// Lists always read the store; they are never served from the cache.
    #[tool(description = "List contributors newest first, with optional limit and offset.")]
    async fn contributor_list(&self, params: Parameters<ContributorListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.service, params.0).await
    }

    #[tool(description = "Replace every field of a contributor. Returns the updated record.")]
    async fn contributor_update(
        &self, params: Parameters<ContributorUpdateParams>,
    ) -> Result<CallToolResult, McpError> {
        update_impl(&self.service, params.0).await
    }

    #[tool(description = "Delete a contributor by id.")]
    async fn contributor_delete(
        &self, params: Parameters<ContributorDeleteParams>,
    ) -> Result<CallToolResult, McpError> {
        delete_impl(&self.service, params.0).await
    }

    #[tool(
        description = "Wait for the next contributor change (created, updated or deleted), optionally for one id. Returns timed_out=true if nothing changed in time."
    )]
    async fn contributor_await_update(
        &self, params: Parameters<AwaitUpdateParams>,
    ) -> Result<CallToolResult, McpError> {
        await_update_impl(&self.service, params.0).await
    }

    #[tool(description = "Remove expired cache entries now. Returns the number purged.")]
    async fn cache_purge(&self) -> Result<CallToolResult, McpError> {
        purge_impl(&self.service).await
    }
}

impl ServerHandler for ContributorsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "contributors-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Contributor directory. Reads may be served from a cache; writes are visible to subsequent reads once \
                 background invalidation completes."
                    .into(),
            ),
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
