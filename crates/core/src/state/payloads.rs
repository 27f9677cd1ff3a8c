//! # Result Payload Store
//!
//! Latest results contract per startup, stored as JSON. Serves as the local
//! [`PayloadFetcher`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::db::MatchDb;
use super::startups::StartupDirectory;
use crate::error::FetchError;
use crate::results::{parse_payload, Contract, FetchTarget, PayloadFetcher};

#[derive(Debug, Clone)]
pub struct PayloadStore {
    db: MatchDb,
    directory: StartupDirectory,
}

impl PayloadStore {
    pub fn new(db: &MatchDb) -> Self {
        Self {
            db: db.clone(),
            directory: StartupDirectory::new(db),
        }
    }

    /// Store the contract for `startup_id`, replacing any previous one.
    pub fn save(&self, startup_id: &str, contract: &Contract) -> Result<()> {
        let payload = serde_json::to_string(contract)?;
        let conn = self.db.lock()?;
        conn.execute(
            r#"
            INSERT INTO result_payloads (startup_id, payload_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(startup_id) DO UPDATE SET
                payload_json = ?2,
                updated_at = ?3
            "#,
            params![startup_id, payload, Utc::now().to_rfc3339()],
        )
        .with_context(|| format!("Failed to save results for '{}'", startup_id))?;

        tracing::debug!("Stored results for {}", startup_id);
        Ok(())
    }

    /// Raw stored payload, if any
    pub fn load_raw(&self, startup_id: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.db.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT payload_json FROM result_payloads WHERE startup_id = ?1",
                params![startup_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to load results")?;

        raw.map(|json| serde_json::from_str(&json).context("Stored results are not valid JSON"))
            .transpose()
    }

    fn startup_id_for(&self, target: &FetchTarget) -> Result<Option<String>> {
        match target {
            FetchTarget::StartupId(id) => Ok(Some(id.clone())),
            FetchTarget::Url(url) => Ok(self.directory.find_by_url(url)?.map(|record| record.id)),
        }
    }
}

#[async_trait]
impl PayloadFetcher for PayloadStore {
    async fn fetch(&self, target: &FetchTarget) -> Result<Option<Contract>, FetchError> {
        let raw = self
            .startup_id_for(target)
            .and_then(|id| match id {
                Some(id) => self.load_raw(&id),
                None => Ok(None),
            })
            .map_err(|e| FetchError::Transport(format!("{:#}", e)))?;

        match raw {
            Some(value) => parse_payload(value),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::contract::fixtures::contract;
    use crate::startup::normalize_url;

    #[tokio::test]
    async fn test_fetch_by_id_and_url() {
        let db = MatchDb::open_in_memory().unwrap();
        let directory = StartupDirectory::new(&db);
        let store = PayloadStore::new(&db);

        let url = normalize_url("acme.io").unwrap();
        let record = directory.upsert(&url, "acme.io").unwrap();
        store.save(&record.id, &contract(5, 3)).unwrap();

        let by_id = store
            .fetch(&FetchTarget::StartupId(record.id.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.row_count(), 8);

        let by_url = store.fetch(&FetchTarget::Url(url)).await.unwrap();
        assert_eq!(by_url, Some(by_id));
    }

    #[tokio::test]
    async fn test_unknown_targets_are_not_found() {
        let db = MatchDb::open_in_memory().unwrap();
        let store = PayloadStore::new(&db);

        let by_id = store
            .fetch(&FetchTarget::StartupId("missing".to_string()))
            .await
            .unwrap();
        assert_eq!(by_id, None);

        let by_url = store
            .fetch(&FetchTarget::Url(normalize_url("nobody.dev").unwrap()))
            .await
            .unwrap();
        assert_eq!(by_url, None);
    }

    #[test]
    fn test_save_replaces_previous() {
        let db = MatchDb::open_in_memory().unwrap();
        let store = PayloadStore::new(&db);

        store.save("st_1", &contract(1, 0)).unwrap();
        store.save("st_1", &contract(2, 2)).unwrap();

        let raw = store.load_raw("st_1").unwrap().unwrap();
        assert_eq!(raw["top5"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(raw["misaligned"].as_array().map(|a| a.len()), Some(2));
    }
}
