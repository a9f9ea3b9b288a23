//! Contributor entity and its input/identifier types.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Error;

/// Length of the canonical hex form of a [`ContributorId`].
pub const ID_HEX_LEN: usize = 24;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Store-assigned contributor identifier.
///
/// 12 bytes rendered as 24 lowercase hex characters: a big-endian unix
/// timestamp in seconds followed by 8 bytes of a SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContributorId(String);

impl ContributorId {
    /// Parse and canonicalize an identifier (hex is lowercased).
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        if trimmed.len() != ID_HEX_LEN || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidId(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        let now = Utc::now();
        let count = ID_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut hasher = Sha256::new();
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
        hasher.update(count.to_be_bytes());
        hasher.update(std::process::id().to_be_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&(now.timestamp() as u32).to_be_bytes());
        bytes[4..].copy_from_slice(&digest[..8]);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContributorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl schemars::JsonSchema for ContributorId {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        "ContributorId".into()
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        String::json_schema(generator)
    }
}

impl TryFrom<String> for ContributorId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContributorId> for String {
    fn from(id: ContributorId) -> Self {
        id.0
    }
}

/// A contributor record as held by the store.
///
/// This is also the JSON snapshot written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub id: ContributorId,
    pub username: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_avatar")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied on create and update.
///
/// Update is a full replacement: every field here overwrites the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContributorInput {
    pub username: String,
    pub email: String,
    pub name: String,
    /// Empty and absent are equivalent.
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub projects: Vec<String>,
}

impl ContributorInput {
    /// Check required fields and normalize the avatar URL.
    pub fn validated(mut self) -> Result<Self, Error> {
        if self.username.trim().is_empty() {
            return Err(Error::InvalidInput("username cannot be empty".into()));
        }
        if self.email.trim().is_empty() {
            return Err(Error::InvalidInput("email cannot be empty".into()));
        }
        self.avatar_url = normalize_avatar(self.avatar_url);
        Ok(self)
    }
}

/// Empty or whitespace-only avatar URLs collapse to `None`.
pub fn normalize_avatar(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.trim().is_empty())
}

fn de_avatar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(normalize_avatar)
}

/// Current time at the precision the store persists.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_canonical_and_unique() {
        let a = ContributorId::generate();
        let b = ContributorId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), ID_HEX_LEN);
        assert_eq!(ContributorId::parse(a.as_str()).unwrap(), a);
    }

    #[test]
    fn test_parse_lowercases() {
        let id = ContributorId::parse("65A1F0C2E4B0A1B2C3D4E5F6").unwrap();
        assert_eq!(id.as_str(), "65a1f0c2e4b0a1b2c3d4e5f6");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(ContributorId::parse("not-an-id"), Err(Error::InvalidId(_))));
        assert!(matches!(ContributorId::parse("65a1f0c2e4b0a1b2c3d4e5"), Err(Error::InvalidId(_))));
        assert!(matches!(ContributorId::parse("zza1f0c2e4b0a1b2c3d4e5f6"), Err(Error::InvalidId(_))));
    }

    #[test]
    fn test_validated_rejects_blank_fields() {
        let input = ContributorInput { username: " ".into(), email: "a@x.com".into(), ..Default::default() };
        assert!(matches!(input.validated(), Err(Error::InvalidInput(_))));

        let input = ContributorInput { username: "alice".into(), ..Default::default() };
        assert!(matches!(input.validated(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validated_normalizes_avatar() {
        let input = ContributorInput {
            username: "alice".into(),
            email: "a@x.com".into(),
            avatar_url: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(input.validated().unwrap().avatar_url, None);
    }

    #[test]
    fn test_contributor_json_shape() {
        let joined = now();
        let contributor = Contributor {
            id: ContributorId::generate(),
            username: "alice".into(),
            email: "a@x.com".into(),
            name: "Alice".into(),
            avatar_url: None,
            projects: vec!["atlas".into()],
            joined_at: joined,
            updated_at: joined,
        };

        let json = serde_json::to_value(&contributor).unwrap();
        assert!(json.get("avatarUrl").is_none());
        assert!(json.get("joinedAt").is_some());
        assert_eq!(json["projects"][0], "atlas");

        let back: Contributor = serde_json::from_value(json).unwrap();
        assert_eq!(back, contributor);
    }

    #[test]
    fn test_empty_avatar_decodes_as_absent() {
        let raw = r#"{"id":"65a1f0c2e4b0a1b2c3d4e5f6","username":"a","email":"a@x.com","name":"A",
            "avatarUrl":"","projects":[],"joinedAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#;
        let contributor: Contributor = serde_json::from_str(raw).unwrap();
        assert_eq!(contributor.avatar_url, None);
    }

    #[test]
    fn test_malformed_id_fails_decode() {
        let raw = r#"{"id":"nope","username":"a","email":"a@x.com","name":"A",
            "projects":[],"joinedAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Contributor>(raw).is_err());
    }
}
