//! SQLite implementation of the entity store.
//!
//! Uniqueness of username and email is enforced by unique indexes.
//! Writes use `RETURNING` so each mutation and the read of its result are
//! a single statement.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::{Connection, params, rusqlite};

use super::ContributorStore;
use crate::Error;
use crate::db;
use crate::model::{self, Contributor, ContributorId, ContributorInput};

/// Entity store handle.
///
/// Cloning is cheap; clones share the same background connection.
#[derive(Clone, Debug)]
pub struct StoreDb {
    conn: Connection,
}

impl StoreDb {
    /// Open the store at `path`, running pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = db::open(path, db::STORE_MIGRATIONS).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory store for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = db::open_in_memory(db::STORE_MIGRATIONS).await?;
        Ok(Self { conn })
    }
}

fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contributor> {
    let id: String = row.get(0)?;
    let projects_json: String = row.get(5)?;

    Ok(Contributor {
        id: ContributorId::parse(&id)
            .map_err(|_| rusqlite::Error::InvalidColumnType(0, "id".into(), rusqlite::types::Type::Text))?,
        username: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        avatar_url: model::normalize_avatar(row.get(4)?),
        projects: serde_json::from_str(&projects_json).map_err(|e| conversion_error(5, e))?,
        joined_at: timestamp(row, 6)?,
        updated_at: timestamp(row, 7)?,
    })
}

fn timestamp(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

/// Fixed-width UTC form so that text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Map unique-index violations to [`Error::DuplicateKey`].
fn write_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, Some(msg)) = &err
        && failure.code == rusqlite::ErrorCode::ConstraintViolation
        && msg.starts_with("UNIQUE")
    {
        let field = msg.rsplit('.').next().unwrap_or("key").trim().to_string();
        return Error::DuplicateKey { field };
    }
    Error::from(err)
}

fn not_found(id: &ContributorId) -> Error {
    Error::NotFound(format!("contributor {id}"))
}

#[async_trait]
impl ContributorStore for StoreDb {
    async fn create(&self, input: &ContributorInput) -> Result<Contributor, Error> {
        let input = input.clone();
        let id = ContributorId::generate();
        let now = format_timestamp(&model::now());
        let avatar_url = model::normalize_avatar(input.avatar_url.clone());
        let projects_json = serde_json::to_string(&input.projects)?;

        let contributor = self
            .conn
            .call(move |conn| -> Result<Contributor, Error> {
                conn.query_row(
                    "INSERT INTO contributors (
                        id, username, email, name, avatar_url, projects_json, joined_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                    RETURNING id, username, email, name, avatar_url, projects_json, joined_at, updated_at",
                    params![id.as_str(), &input.username, &input.email, &input.name, &avatar_url, &projects_json, &now],
                    from_row,
                )
                .map_err(write_error)
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(id = %contributor.id, username = %contributor.username, "contributor created");
        Ok(contributor)
    }

    async fn get_by_id(&self, id: &ContributorId) -> Result<Contributor, Error> {
        let id = id.clone();
        self.conn
            .call(move |conn| -> Result<Contributor, Error> {
                let result = conn.query_row(
                    "SELECT id, username, email, name, avatar_url, projects_json, joined_at, updated_at
                    FROM contributors WHERE id = ?1",
                    params![id.as_str()],
                    from_row,
                );

                match result {
                    Ok(c) => Ok(c),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Err(not_found(&id)),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn get_by_username(&self, username: &str) -> Result<Contributor, Error> {
        let username = username.to_string();
        self.conn
            .call(move |conn| -> Result<Contributor, Error> {
                let result = conn.query_row(
                    "SELECT id, username, email, name, avatar_url, projects_json, joined_at, updated_at
                    FROM contributors WHERE username = ?1",
                    params![username],
                    from_row,
                );

                match result {
                    Ok(c) => Ok(c),
                    Err(rusqlite::Error::QueryReturnedNoRows) => {
                        Err(Error::NotFound(format!("contributor with username {username}")))
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn update(&self, id: &ContributorId, input: &ContributorInput) -> Result<Contributor, Error> {
        let id = id.clone();
        let input = input.clone();
        let now = format_timestamp(&model::now());
        let avatar_url = model::normalize_avatar(input.avatar_url.clone());
        let projects_json = serde_json::to_string(&input.projects)?;

        self.conn
            .call(move |conn| -> Result<Contributor, Error> {
                let result = conn.query_row(
                    "UPDATE contributors SET
                        username = ?2,
                        email = ?3,
                        name = ?4,
                        avatar_url = ?5,
                        projects_json = ?6,
                        updated_at = MAX(?7, joined_at)
                    WHERE id = ?1
                    RETURNING id, username, email, name, avatar_url, projects_json, joined_at, updated_at",
                    params![id.as_str(), &input.username, &input.email, &input.name, &avatar_url, &projects_json, &now],
                    from_row,
                );

                match result {
                    Ok(c) => Ok(c),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Err(not_found(&id)),
                    Err(e) => Err(write_error(e)),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, id: &ContributorId) -> Result<Contributor, Error> {
        let id = id.clone();
        self.conn
            .call(move |conn| -> Result<Contributor, Error> {
                let result = conn.query_row(
                    "DELETE FROM contributors WHERE id = ?1
                    RETURNING id, username, email, name, avatar_url, projects_json, joined_at, updated_at",
                    params![id.as_str()],
                    from_row,
                );

                match result {
                    Ok(c) => Ok(c),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Err(not_found(&id)),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Contributor>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<Contributor>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, username, email, name, avatar_url, projects_json, joined_at, updated_at
                    FROM contributors
                    ORDER BY joined_at DESC, rowid DESC
                    LIMIT ?1 OFFSET ?2",
                )?;

                let rows = stmt.query_map(params![limit, offset], from_row)?;
                let contributors = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(contributors)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(username: &str, email: &str) -> ContributorInput {
        ContributorInput {
            username: username.to_string(),
            email: email.to_string(),
            name: username.to_uppercase(),
            avatar_url: None,
            projects: vec!["atlas".to_string(), "borealis".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = StoreDb::open_in_memory().await.unwrap();
        let created = store.create(&input("alice", "a@x.com")).await.unwrap();

        assert_eq!(created.username, "alice");
        assert_eq!(created.projects, vec!["atlas", "borealis"]);
        assert_eq!(created.joined_at, created.updated_at);

        let by_id = store.get_by_id(&created.id).await.unwrap();
        assert_eq!(by_id, created);

        let by_username = store.get_by_username("alice").await.unwrap();
        assert_eq!(by_username, created);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = StoreDb::open_in_memory().await.unwrap();
        let id = ContributorId::generate();
        assert!(matches!(store.get_by_id(&id).await, Err(Error::NotFound(_))));
        assert!(matches!(store.get_by_username("ghost").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let store = StoreDb::open_in_memory().await.unwrap();
        store.create(&input("alice", "a@x.com")).await.unwrap();

        let err = store.create(&input("alice", "other@x.com")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref field } if field == "username"));

        let err = store.create(&input("bob", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref field } if field == "email"));

        let all = store.list(10, 0).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let store = StoreDb::open_in_memory().await.unwrap();
        let created = store
            .create(&ContributorInput { avatar_url: Some("https://x.com/a.png".into()), ..input("alice", "a@x.com") })
            .await
            .unwrap();

        let replacement = ContributorInput {
            username: "alice2".into(),
            email: "a2@x.com".into(),
            name: "Alice Two".into(),
            avatar_url: None,
            projects: vec![],
        };
        let updated = store.update(&created.id, &replacement).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.avatar_url, None);
        assert!(updated.projects.is_empty());
        assert_eq!(updated.joined_at, created.joined_at);
        assert!(updated.updated_at >= updated.joined_at);

        assert_eq!(store.get_by_id(&created.id).await.unwrap(), updated);
        assert!(matches!(store.get_by_username("alice").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_conflict_and_missing() {
        let store = StoreDb::open_in_memory().await.unwrap();
        let alice = store.create(&input("alice", "a@x.com")).await.unwrap();
        store.create(&input("bob", "b@x.com")).await.unwrap();

        let err = store.update(&alice.id, &input("bob", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { ref field } if field == "username"));
        assert_eq!(store.get_by_id(&alice.id).await.unwrap(), alice);

        let missing = ContributorId::generate();
        assert!(matches!(store.update(&missing, &input("carol", "c@x.com")).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = StoreDb::open_in_memory().await.unwrap();
        let alice = store.create(&input("alice", "a@x.com")).await.unwrap();

        let removed = store.delete(&alice.id).await.unwrap();
        assert_eq!(removed, alice);
        assert!(matches!(store.get_by_id(&alice.id).await, Err(Error::NotFound(_))));
        assert!(matches!(store.delete(&alice.id).await, Err(Error::NotFound(_))));

        store.create(&input("alice", "a@x.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_newest_first_with_paging() {
        let store = StoreDb::open_in_memory().await.unwrap();
        for name in ["a", "b", "c", "d"] {
            store.create(&input(name, &format!("{name}@x.com"))).await.unwrap();
        }

        let all = store.list(10, 0).await.unwrap();
        let names: Vec<_> = all.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["d", "c", "b", "a"]);

        let page = store.list(2, 1).await.unwrap();
        let names: Vec<_> = page.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);

        assert!(store.list(0, 0).await.unwrap().is_empty());
        assert!(store.list(10, 10).await.unwrap().is_empty());
    }
}
