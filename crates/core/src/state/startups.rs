//! # Startup Directory
//!
//! Local SQLite-backed startup directory. Implements [`Resolver`] so the scan
//! flow can run without the hosted backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::db::MatchDb;
use crate::error::ResolutionError;
use crate::startup::{NormalizedUrl, ResolvedStartup, Resolver, StartupRef};

/// A canonical startup record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupRecord {
    pub id: String,
    pub normalized_url: String,
    pub raw_url: String,
    pub created_at: DateTime<Utc>,
}

impl StartupRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: String = row.get(3)?;
        Ok(Self {
            id: row.get(0)?,
            normalized_url: row.get(1)?,
            raw_url: row.get(2)?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// SQLite-backed directory of startups keyed by normalized URL
#[derive(Debug, Clone)]
pub struct StartupDirectory {
    db: MatchDb,
}

impl StartupDirectory {
    pub fn new(db: &MatchDb) -> Self {
        Self { db: db.clone() }
    }

    /// Return the record for `url`, creating it on first sight.
    pub fn upsert(&self, url: &NormalizedUrl, raw_url: &str) -> Result<StartupRecord> {
        let conn = self.db.lock()?;

        let inserted = conn
            .execute(
                r#"
                INSERT INTO startups (id, normalized_url, raw_url, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(normalized_url) DO NOTHING
                "#,
                params![
                    uuid::Uuid::new_v4().to_string(),
                    url.as_str(),
                    raw_url,
                    Utc::now().to_rfc3339()
                ],
            )
            .context("Failed to upsert startup")?;

        if inserted > 0 {
            tracing::info!("Created startup record for {}", url);
        }

        conn.query_row(
            "SELECT id, normalized_url, raw_url, created_at FROM startups WHERE normalized_url = ?1",
            params![url.as_str()],
            StartupRecord::from_row,
        )
        .with_context(|| format!("Startup '{}' missing after upsert", url))
    }

    pub fn get(&self, id: &str) -> Result<Option<StartupRecord>> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT id, normalized_url, raw_url, created_at FROM startups WHERE id = ?1",
            params![id],
            StartupRecord::from_row,
        )
        .optional()
        .context("Failed to load startup")
    }

    pub fn find_by_url(&self, url: &NormalizedUrl) -> Result<Option<StartupRecord>> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT id, normalized_url, raw_url, created_at FROM startups WHERE normalized_url = ?1",
            params![url.as_str()],
            StartupRecord::from_row,
        )
        .optional()
        .context("Failed to look up startup")
    }
}

#[async_trait]
impl Resolver for StartupDirectory {
    async fn resolve(
        &self,
        url: &NormalizedUrl,
    ) -> Result<Option<ResolvedStartup>, ResolutionError> {
        let record = self
            .upsert(url, url.as_str())
            .map_err(|e| ResolutionError::Unavailable(format!("{:#}", e)))?;
        Ok(Some(ResolvedStartup { id: record.id }))
    }

    async fn resolve_submission(
        &self,
        startup: &StartupRef,
    ) -> Result<Option<ResolvedStartup>, ResolutionError> {
        let record = self
            .upsert(&startup.normalized_url, &startup.raw_url)
            .map_err(|e| ResolutionError::Unavailable(format!("{:#}", e)))?;
        Ok(Some(ResolvedStartup { id: record.id }))
    }
}
