//! # Resolver
//!
//! The resolver is the injected seam in front of the startup directory. The
//! backend contract is `resolve(url) -> { startup?: { id }, error? }` and must
//! be idempotent per normalized URL: the first call creates the record, later
//! calls return it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{NormalizedUrl, StartupRef};
use crate::error::{ResolutionError, ResolveError};

/// The `startup` object of a resolver response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStartup {
    pub id: String,
}

/// Wire shape returned by the hosted `resolve` function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveResponse {
    #[serde(default)]
    pub startup: Option<ResolvedStartup>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ResolveResponse {
    /// An `error` field wins over a `startup` field.
    pub fn into_result(self) -> Result<Option<ResolvedStartup>, ResolutionError> {
        match self.error {
            Some(error) if !error.trim().is_empty() => Err(ResolutionError::Backend(error)),
            _ => Ok(self.startup),
        }
    }
}

/// Looks up or creates the canonical startup record for a normalized URL.
///
/// Implementations may create a persistent record as a side effect.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, url: &NormalizedUrl)
        -> Result<Option<ResolvedStartup>, ResolutionError>;

    /// Resolve a submission with the user's original text available.
    /// Directories that record the raw URL override this.
    async fn resolve_submission(
        &self,
        startup: &StartupRef,
    ) -> Result<Option<ResolvedStartup>, ResolutionError> {
        self.resolve(&startup.normalized_url).await
    }
}

/// Normalize `raw` and resolve it.
///
/// Validation happens first, so malformed input never reaches the backend.
pub async fn resolve_startup(resolver: &dyn Resolver, raw: &str) -> Result<StartupRef, ResolveError> {
    let startup = StartupRef::parse(raw)?;

    tracing::debug!("Resolving {}", startup.normalized_url);
    let resolved = resolver.resolve_submission(&startup).await?;

    Ok(match resolved {
        Some(found) => startup.with_startup_id(found.id),
        None => startup,
    })
}

/// In-memory directory for tests and embedded use.
#[derive(Debug, Default)]
pub struct InMemoryResolver {
    records: Mutex<HashMap<NormalizedUrl, String>>,
    calls: AtomicUsize,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver whose backend always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Delay every answer by `delay` (tokio time, so tests can pause it).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of backend calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolver for InMemoryResolver {
    async fn resolve(
        &self,
        url: &NormalizedUrl,
    ) -> Result<Option<ResolvedStartup>, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = &self.failure {
            return Err(ResolutionError::Unavailable(message.clone()));
        }

        let mut records = self
            .records
            .lock()
            .map_err(|e| ResolutionError::Unavailable(format!("Lock error: {}", e)))?;
        let id = records
            .entry(url.clone())
            .or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();

        Ok(Some(ResolvedStartup { id }))
    }
}
