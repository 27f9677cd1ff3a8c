//! # Backends
//!
//! Picks the resolver and payload fetcher for the configured mode:
//! the local SQLite store, or the hosted functions over HTTP.

pub mod http;

use std::sync::Arc;

pub use http::HttpBackend;

use crate::config::{BackendMode, MatchdeckConfig};
use crate::results::PayloadFetcher;
use crate::startup::Resolver;
use crate::state::{MatchDb, PayloadStore, StartupDirectory};

/// Resolver and fetcher pair shared by the orchestrator and result page
#[derive(Clone)]
pub struct Backends {
    pub resolver: Arc<dyn Resolver>,
    pub fetcher: Arc<dyn PayloadFetcher>,
}

impl Backends {
    pub fn local(db: &MatchDb) -> Self {
        Self {
            resolver: Arc::new(StartupDirectory::new(db)),
            fetcher: Arc::new(PayloadStore::new(db)),
        }
    }

    pub fn from_config(config: &MatchdeckConfig, db: &MatchDb) -> anyhow::Result<Self> {
        match config.backend {
            BackendMode::Local => Ok(Self::local(db)),
            BackendMode::Remote => {
                let http = Arc::new(HttpBackend::from_config(config)?);
                tracing::info!(
                    "Using remote backend at {}",
                    config.remote_url.as_deref().unwrap_or_default()
                );
                Ok(Self {
                    resolver: http.clone(),
                    fetcher: http,
                })
            }
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
