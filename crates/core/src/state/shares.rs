//! # Shared Views
//!
//! Share-token keyed snapshots of an investor list. Readers look a snapshot
//! up by token; the only thing they can change is appending a comment.

use anyhow::Context;
use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use super::db::MatchDb;
use super::startups::parse_timestamp;

/// Longest comment accepted, in characters
pub const MAX_COMMENT_CHARS: usize = 2_000;

fn token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{8,64}$").ok())
        .as_ref()
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("'{0}' is not a valid share token")]
    InvalidToken(String),
    #[error("no shared list for token '{0}'")]
    NotFound(String),
    #[error("comment must be between 1 and {} characters", MAX_COMMENT_CHARS)]
    InvalidComment,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// One entity in a shared snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedEntity {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareComment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedList {
    pub token: String,
    pub display_name: String,
    pub entities: Vec<SharedEntity>,
    pub comments: Vec<ShareComment>,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed shared list manager
#[derive(Debug, Clone)]
pub struct ShareManager {
    db: MatchDb,
}

impl ShareManager {
    pub fn new(db: &MatchDb) -> Self {
        Self { db: db.clone() }
    }

    /// Snapshot `entities` under a fresh token
    pub fn create(&self, display_name: &str, entities: &[SharedEntity]) -> Result<SharedList, ShareError> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let created_at = Utc::now();
        let entities_json = serde_json::to_string(entities).context("Failed to encode entities")?;

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO shared_lists (token, display_name, entities_json, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![token, display_name, entities_json, created_at.to_rfc3339()],
        )
        .context("Failed to create shared list")?;

        tracing::info!("Created shared list '{}' ({} entities)", display_name, entities.len());
        Ok(SharedList {
            token,
            display_name: display_name.to_string(),
            entities: entities.to_vec(),
            comments: Vec::new(),
            created_at,
        })
    }

    /// Look a shared list up by token, comments oldest first
    pub fn lookup(&self, token: &str) -> Result<Option<SharedList>, ShareError> {
        validate_token(token)?;
        let conn = self.db.lock()?;

        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT display_name, entities_json, created_at FROM shared_lists WHERE token = ?1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .context("Failed to load shared list")?;

        let Some((display_name, entities_json, created_at)) = row else {
            return Ok(None);
        };

        let entities: Vec<SharedEntity> =
            serde_json::from_str(&entities_json).context("Shared entities are not valid JSON")?;

        let mut stmt = conn
            .prepare(
                "SELECT id, author, body, created_at FROM share_comments WHERE token = ?1 ORDER BY rowid",
            )
            .context("Failed to prepare comment query")?;
        let comments = stmt
            .query_map(params![token], |row| {
                let created_at: String = row.get(3)?;
                Ok(ShareComment {
                    id: row.get(0)?,
                    author: row.get(1)?,
                    body: row.get(2)?,
                    created_at: parse_timestamp(&created_at),
                })
            })
            .context("Failed to load comments")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read comment row")?;

        Ok(Some(SharedList {
            token: token.to_string(),
            display_name,
            entities,
            comments,
            created_at: parse_timestamp(&created_at),
        }))
    }

    /// Append a comment to an existing shared list
    pub fn append_comment(&self, token: &str, author: &str, body: &str) -> Result<ShareComment, ShareError> {
        validate_token(token)?;
        let body = body.trim();
        if body.is_empty() || body.chars().count() > MAX_COMMENT_CHARS {
            return Err(ShareError::InvalidComment);
        }
        let author = match author.trim() {
            "" => "Anonymous",
            name => name,
        };

        let conn = self.db.lock()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM shared_lists WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to check shared list")?;
        if exists.is_none() {
            return Err(ShareError::NotFound(token.to_string()));
        }

        let comment = ShareComment {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO share_comments (id, token, author, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id,
                token,
                comment.author,
                comment.body,
                comment.created_at.to_rfc3339()
            ],
        )
        .context("Failed to append comment")?;

        Ok(comment)
    }
}

fn validate_token(token: &str) -> Result<(), ShareError> {
    if token_pattern().is_some_and(|re| re.is_match(token)) {
        Ok(())
    } else {
        Err(ShareError::InvalidToken(token.to_string()))
    }
}
