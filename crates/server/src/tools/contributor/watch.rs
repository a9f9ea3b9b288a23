//! contributor_await_update tool implementation.
//!
//! Waits for the next committed change, optionally for one contributor.
//! Only changes made after the call starts are seen.

use std::time::Duration;

use contributors_core::{ContributorEvent, ContributorId, ContributorService};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const MAX_TIMEOUT_MS: u64 = 300_000;

/// Parameters for the contributor_await_update tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AwaitUpdateParams {
    /// Only report changes to this contributor id.
    #[serde(default)]
    pub id: Option<String>,

    /// How long to wait in milliseconds (default 30000, max 300000).
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Output from the contributor_await_update tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AwaitUpdateOutput {
    /// The change observed, absent on timeout.
    pub event: Option<ContributorEvent>,
    pub timed_out: bool,
}

pub async fn await_update_impl(
    service: &ContributorService, params: AwaitUpdateParams,
) -> Result<CallToolResult, McpError> {
    let filter = params.id.as_deref().map(ContributorId::parse).transpose()?;
    let wait = Duration::from_millis(params.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS).min(MAX_TIMEOUT_MS));
    let deadline = tokio::time::Instant::now() + wait;
    let mut subscription = service.subscribe();

    let event = loop {
        match tokio::time::timeout_at(deadline, subscription.next()).await {
            Ok(Some(event)) if filter.as_ref().is_none_or(|id| event.id() == id) => break Some(event),
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break None,
        }
    };

    json_result(&AwaitUpdateOutput { timed_out: event.is_none(), event })
}
