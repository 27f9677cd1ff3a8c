//! # Navigation Destination
//!
//! Where a finished scan sends the user. Success and failure both route to
//! the results page; a failure only adds `reason` and `error`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::startup::StartupRef;

pub const RESULTS_PATH: &str = "/results";

/// Enumerated `reason` query value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    ScanFailed,
    /// Reason written by a newer client; kept verbatim
    Other(String),
}

impl FailureReason {
    pub fn as_str(&self) -> &str {
        match self {
            FailureReason::ScanFailed => "scan_failed",
            FailureReason::Other(other) => other.as_str(),
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "scan_failed" => FailureReason::ScanFailed,
            other => FailureReason::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FailureReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FailureReason {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(FailureReason::parse(&value))
    }
}

/// Query parameters of the results page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// The URL as originally submitted
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Destination {
    /// Destination after a successful resolution
    pub fn resolved(startup: &StartupRef) -> Self {
        Self {
            url: startup.raw_url.clone(),
            startup_id: startup.startup_id.clone(),
            reason: None,
            error: None,
        }
    }

    /// Degraded destination after a failed resolution
    pub fn scan_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            startup_id: None,
            reason: Some(FailureReason::ScanFailed),
            error: Some(message.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.reason.is_some()
    }

    /// Encode as a query string (`url=...&startupId=...`)
    pub fn to_query(&self) -> String {
        let mut pairs = vec![("url", self.url.as_str())];
        if let Some(id) = &self.startup_id {
            pairs.push(("startupId", id.as_str()));
        }
        if let Some(reason) = &self.reason {
            pairs.push(("reason", reason.as_str()));
        }
        if let Some(error) = &self.error {
            pairs.push(("error", error.as_str()));
        }

        pairs
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Path plus query for the results page
    pub fn to_path(&self) -> String {
        format!("{}?{}", RESULTS_PATH, self.to_query())
    }

    /// Decode a query string. `url` is required; unknown keys are ignored.
    pub fn from_query(query: &str) -> Result<Self, ValidationError> {
        let query = query.trim_start_matches('?');
        let mut url = None;
        let mut startup_id = None;
        let mut reason = None;
        let mut error = None;

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let spaced = raw_value.replace('+', " ");
            let value = urlencoding::decode(&spaced)
                .map_err(|_| ValidationError::Malformed(query.to_string()))?
                .into_owned();
            if value.is_empty() {
                continue;
            }

            match key {
                "url" => url = Some(value),
                "startupId" => startup_id = Some(value),
                "reason" => reason = Some(FailureReason::parse(&value)),
                "error" => error = Some(value),
                _ => {}
            }
        }

        Ok(Self {
            url: url.ok_or(ValidationError::Empty)?,
            startup_id,
            reason,
            error,
        })
    }
}
