//! # Matchdeck Database
//!
//! Single SQLite database for the local startup directory, stored result
//! payloads and shared views. Lives at `.matchdeck/matchdeck.db` by default.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

pub const DEFAULT_DB_PATH: &str = ".matchdeck/matchdeck.db";

/// Shared handle to the SQLite database
#[derive(Debug, Clone)]
pub struct MatchDb {
    conn: Arc<Mutex<Connection>>,
}

impl MatchDb {
    /// Open or create the database at the default location
    pub fn open() -> Result<Self> {
        Self::open_at(DEFAULT_DB_PATH)
    }

    /// Open database at a specific path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path.as_ref()).context("Failed to open matchdeck database")?;
        Self::from_connection(conn)
    }

    /// Throwaway database for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Lock the connection for a single unit of work
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            migrate_v1(&conn)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [1],
            )?;
        }

        Ok(())
    }
}

/// Migration to version 1 - complete schema
fn migrate_v1(conn: &Connection) -> Result<()> {
    // Canonical startup records, one per normalized URL
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS startups (
            id TEXT PRIMARY KEY,
            normalized_url TEXT NOT NULL UNIQUE,
            raw_url TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    // Latest result contract per startup (JSON)
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS result_payloads (
            startup_id TEXT PRIMARY KEY,
            payload_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS shared_lists (
            token TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            entities_json TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS share_comments (
            id TEXT PRIMARY KEY,
            token TEXT NOT NULL REFERENCES shared_lists(token),
            author TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_share_comments_token ON share_comments(token, created_at)",
        [],
    )?;

    tracing::info!(
        "MatchDb initialized with schema version {}",
        SCHEMA_VERSION
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_tables() {
        let db = MatchDb::open_in_memory().unwrap();
        let conn = db.lock().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"startups".to_string()));
        assert!(tables.contains(&"result_payloads".to_string()));
        assert!(tables.contains(&"shared_lists".to_string()));
        assert!(tables.contains(&"share_comments".to_string()));
    }

    #[test]
    fn test_schema_version_tracking() {
        let dir = std::env::temp_dir().join(format!("matchdeck-db-{}", uuid::Uuid::new_v4()));
        let path = dir.join("matchdeck.db");

        // Open twice - should not fail on second open
        drop(MatchDb::open_at(&path).unwrap());
        let db = MatchDb::open_at(&path).unwrap();

        let version: i32 = db
            .lock()
            .unwrap()
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        drop(db);
        let _ = std::fs::remove_dir_all(dir);
    }
}
