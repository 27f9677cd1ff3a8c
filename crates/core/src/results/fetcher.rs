//! # Payload Fetcher
//!
//! Injected seam for `fetchResults(urlOrId)`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::contract::{parse_payload, Contract};
use crate::error::FetchError;
use crate::startup::NormalizedUrl;

/// What to fetch results for. A resolved id is preferred over the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum FetchTarget {
    StartupId(String),
    Url(NormalizedUrl),
}

impl FetchTarget {
    pub fn as_str(&self) -> &str {
        match self {
            FetchTarget::StartupId(id) => id,
            FetchTarget::Url(url) => url.as_str(),
        }
    }
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchTarget::StartupId(id) => write!(f, "startup {}", id),
            FetchTarget::Url(url) => write!(f, "url {}", url),
        }
    }
}

/// Fetches the authoritative result payload.
///
/// `Ok(None)` means the call succeeded but no entity matched.
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    async fn fetch(&self, target: &FetchTarget) -> Result<Option<Contract>, FetchError>;
}

/// Raw JSON payloads held in memory, parsed on every fetch like a real
/// response would be.
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
    payloads: Mutex<HashMap<String, serde_json::Value>>,
    calls: AtomicUsize,
    failure: Option<String>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch fails at the transport level with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Register the raw payload served for `key` (startup id or normalized URL).
    pub fn insert(&self, key: impl Into<String>, payload: serde_json::Value) {
        if let Ok(mut payloads) = self.payloads.lock() {
            payloads.insert(key.into(), payload);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PayloadFetcher for InMemoryFetcher {
    async fn fetch(&self, target: &FetchTarget) -> Result<Option<Contract>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(FetchError::Transport(message.clone()));
        }

        let payload = self
            .payloads
            .lock()
            .map_err(|e| FetchError::Transport(format!("Lock error: {}", e)))?
            .get(target.as_str())
            .cloned();

        match payload {
            Some(value) => parse_payload(value),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_fetcher_parses_payloads() {
        let fetcher = InMemoryFetcher::new();
        fetcher.insert("st_1", json!({"top5": [], "misaligned": []}));
        fetcher.insert("st_2", json!({"top5": []}));

        let found = fetcher
            .fetch(&FetchTarget::StartupId("st_1".to_string()))
            .await
            .unwrap();
        assert!(found.is_some());

        let malformed = fetcher
            .fetch(&FetchTarget::StartupId("st_2".to_string()))
            .await;
        assert!(matches!(malformed, Err(FetchError::Malformed(_))));

        let missing = fetcher
            .fetch(&FetchTarget::StartupId("st_3".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
        assert_eq!(fetcher.calls(), 3);
    }

    #[test]
    fn test_target_serialization() {
        let json = serde_json::to_string(&FetchTarget::StartupId("st_9".to_string())).unwrap();
        assert_eq!(json, r#"{"by":"startup_id","value":"st_9"}"#);
    }
}
