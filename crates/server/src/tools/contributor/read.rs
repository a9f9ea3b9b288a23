//! contributor_get, contributor_get_by_username and contributor_list.

use contributors_core::{Contributor, ContributorService};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the contributor_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContributorGetParams {
    /// Contributor id (24 hex characters).
    pub id: String,
}

/// Parameters for the contributor_get_by_username tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContributorGetByUsernameParams {
    pub username: String,
}

/// Parameters for the contributor_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ContributorListParams {
    /// Page size. Defaults to the configured default, clamped to the configured maximum.
    #[serde(default)]
    pub limit: Option<u32>,

    /// Number of records to skip. Defaults to 0.
    #[serde(default)]
    pub offset: Option<u32>,
}

/// Output from the contributor_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContributorListOutput {
    pub contributors: Vec<Contributor>,
    pub count: usize,
}

pub async fn get_impl(service: &ContributorService, params: ContributorGetParams) -> Result<CallToolResult, McpError> {
    let contributor = service.get(&params.id).await?;
    json_result(&contributor)
}

pub async fn get_by_username_impl(
    service: &ContributorService, params: ContributorGetByUsernameParams,
) -> Result<CallToolResult, McpError> {
    let contributor = service.get_by_username(&params.username).await?;
    json_result(&contributor)
}

pub async fn list_impl(
    service: &ContributorService, params: ContributorListParams,
) -> Result<CallToolResult, McpError> {
    let contributors = service.list(params.limit, params.offset).await?;
    json_result(&ContributorListOutput { count: contributors.len(), contributors })
}
