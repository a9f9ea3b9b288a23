//! cache_purge tool implementation.
//!
//! Removes expired cache entries immediately instead of waiting for the
//! periodic sweep.

use contributors_core::ContributorService;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of expired entries removed.
    pub purged: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(service: &ContributorService) -> Result<CallToolResult, McpError> {
    let purged = service.sweep().await?;
    json_result(&CachePurgeOutput { purged })
}
