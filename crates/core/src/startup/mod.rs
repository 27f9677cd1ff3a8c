//! # Startup Resolution
//!
//! Maps a raw URL typed by the user to a canonical startup record.
//!
//! ```text
//! raw input ──normalize──▶ NormalizedUrl ──Resolver::resolve──▶ StartupRef { startup_id }
//!     │                                         │
//!     └── ValidationError (no backend call)     └── ResolutionError
//! ```

pub mod normalize;
pub mod resolver;

use serde::{Deserialize, Serialize};

pub use normalize::{normalize_url, NormalizedUrl};
pub use resolver::{
    resolve_startup, InMemoryResolver, ResolveResponse, ResolvedStartup, Resolver,
};

/// A startup being analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupRef {
    /// Exactly what the user submitted
    pub raw_url: String,
    pub normalized_url: NormalizedUrl,
    /// Attached once the resolver has answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_id: Option<String>,
}

impl StartupRef {
    /// Validate and normalize user input. No backend involved.
    pub fn parse(raw: &str) -> Result<Self, crate::error::ValidationError> {
        Ok(Self {
            raw_url: raw.trim().to_string(),
            normalized_url: normalize_url(raw)?,
            startup_id: None,
        })
    }

    pub fn with_startup_id(mut self, id: impl Into<String>) -> Self {
        self.startup_id = Some(id.into());
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.startup_id.is_some()
    }
}
