//! # Flow Errors
//!
//! Typed failures for the resolve → scan → render flow. Storage and plumbing
//! code uses `anyhow`; these enums mark the boundaries where the caller has to
//! decide what the user sees.

use thiserror::Error;

/// Message shown in the `error` page state when a fetch failed without text.
pub const FETCH_FALLBACK_MESSAGE: &str =
    "We couldn't load results for this startup. Please try again.";

/// User input could not be normalized into a well-formed URL.
///
/// Never leaves the submitting component: no backend call and no navigation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a startup URL")]
    Empty,
    #[error("'{0}' is missing a host")]
    MissingHost(String),
    #[error("'{0}' is not a valid URL")]
    Malformed(String),
    #[error("Unsupported scheme '{0}', use http or https")]
    UnsupportedScheme(String),
}

/// Backend resolution failed (network, backend-reported error, bad response).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("resolver backend unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Backend(String),
    #[error("unexpected resolver response: {0}")]
    InvalidResponse(String),
}

/// Anything `resolve_startup` can fail with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Result payload fetch failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The backend answered with an explicit error text.
    #[error("{0}")]
    Backend(String),
    /// The payload is missing a required field or has the wrong shape.
    #[error("malformed results payload: {0}")]
    Malformed(String),
    #[error("results fetch failed: {0}")]
    Transport(String),
}

impl FetchError {
    /// Text for the `error` page state.
    ///
    /// Backend-provided text wins; shape and transport failures fall back to
    /// [`FETCH_FALLBACK_MESSAGE`].
    pub fn display_message(&self) -> String {
        match self {
            FetchError::Backend(text) if !text.trim().is_empty() => text.clone(),
            _ => FETCH_FALLBACK_MESSAGE.to_string(),
        }
    }
}
