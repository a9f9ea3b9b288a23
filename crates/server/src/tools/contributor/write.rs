//! contributor_create, contributor_update and contributor_delete.

use contributors_core::{ContributorInput, ContributorService};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the contributor_create tool. Field names are camelCase,
/// matching the contributor JSON returned by every tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributorCreateParams {
    /// Unique handle.
    pub username: String,

    /// Unique email address.
    pub email: String,

    /// Display name.
    pub name: String,

    /// Avatar URL. Empty is treated as absent.
    #[serde(default)]
    pub avatar_url: Option<String>,

    /// Project names the contributor works on.
    #[serde(default)]
    pub projects: Vec<String>,
}

impl From<ContributorCreateParams> for ContributorInput {
    fn from(params: ContributorCreateParams) -> Self {
        ContributorInput {
            username: params.username,
            email: params.email,
            name: params.name,
            avatar_url: params.avatar_url,
            projects: params.projects,
        }
    }
}

/// Parameters for the contributor_update tool.
///
/// Update replaces every field; omitted optional fields are cleared.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContributorUpdateParams {
    /// Contributor id (24 hex characters).
    pub id: String,

    #[serde(flatten)]
    pub fields: ContributorCreateParams,
}

/// Parameters for the contributor_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContributorDeleteParams {
    /// Contributor id (24 hex characters).
    pub id: String,
}

/// Output from the contributor_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContributorDeleteOutput {
    pub deleted: bool,
}

pub async fn create_impl(
    service: &ContributorService, params: ContributorCreateParams,
) -> Result<CallToolResult, McpError> {
    let contributor = service.create(params.into()).await?;
    json_result(&contributor)
}

pub async fn update_impl(
    service: &ContributorService, params: ContributorUpdateParams,
) -> Result<CallToolResult, McpError> {
    let contributor = service.update(&params.id, params.fields.into()).await?;
    json_result(&contributor)
}

pub async fn delete_impl(
    service: &ContributorService, params: ContributorDeleteParams,
) -> Result<CallToolResult, McpError> {
    service.delete(&params.id).await?;
    json_result(&ContributorDeleteOutput { deleted: true })
}
