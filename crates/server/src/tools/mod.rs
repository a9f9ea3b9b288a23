//! MCP tool implementations.
//!
//! This module contains all tools exposed by the contributors server.

pub mod cache;
pub mod contributor;

use contributors_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Render `value` as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use contributors_core::{ContributorService, MemoryCache, ServiceConfig, StoreDb};
    use rmcp::model::CallToolResult;

    pub async fn service() -> ContributorService {
        let store = StoreDb::open_in_memory().await.unwrap();
        ContributorService::new(Arc::new(store), Arc::new(MemoryCache::new()), ServiceConfig::default())
    }

    /// Decode the JSON text carried by the first content item.
    pub fn output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
