//! # URL Normalization
//!
//! Turns whatever the user typed into the canonical form the directory keys
//! startups by.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::{Host, Url};

use crate::error::ValidationError;

/// Canonical startup URL: `https://<host><path>`, lowercase host without
/// `www.`, no query, no fragment, no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host part of the canonical URL.
    pub fn host(&self) -> &str {
        let rest = self.0.trim_start_matches("https://");
        match rest.find('/') {
            Some(idx) => &rest[..idx],
            None => rest,
        }
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a raw, user-supplied URL.
pub fn normalize_url(raw: &str) -> Result<NormalizedUrl, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        // Bare paths and free text have nothing to use as a host
        if trimmed.starts_with('/') || trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::MissingHost(trimmed.to_string()));
        }
        format!("https://{}", trimmed)
    };

    let parsed =
        Url::parse(&candidate).map_err(|_| ValidationError::Malformed(trimmed.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
    }

    let host = match parsed.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.');
            let domain = domain.strip_prefix("www.").unwrap_or(domain);
            // Checked after stripping so `www.io` is not accepted as `io`
            let is_dotted = domain.contains('.') && !domain.starts_with('.');
            if !is_dotted && domain != "localhost" {
                return Err(ValidationError::MissingHost(trimmed.to_string()));
            }
            domain.to_ascii_lowercase()
        }
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => format!("[{}]", addr),
        None => return Err(ValidationError::MissingHost(trimmed.to_string())),
    };

    let port = parsed
        .port()
        .map(|p| format!(":{}", p))
        .unwrap_or_default();
    let path = parsed.path().trim_end_matches('/');

    Ok(NormalizedUrl(format!("https://{}{}{}", host, port, path)))
}
