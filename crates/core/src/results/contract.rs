//! # Results Contract
//!
//! Fixed-shape payload the result page renders. `top5` and `misaligned` are
//! required; every other section is optional and simply omitted when absent.

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// How many ranked matches the top section shows
pub const TOP_MATCH_LIMIT: usize = 5;

/// How well an investor's thesis fits the startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitTier {
    Strong,
    Good,
    Moderate,
    Weak,
    #[serde(other)]
    Unknown,
}

impl FitTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorIdentity {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firm: Option<String>,
}

/// One investor-signal line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub investor: InvestorIdentity,
    /// Signal strength, 0-100
    pub signal: f32,
    pub fit: FitTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Synthesis / trust statements about how investors read the startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    #[serde(default)]
    pub statements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_summary: Option<String>,
}

impl Orientation {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.trust_summary.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageAction {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Counts of items held back behind the paywall
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeaserCounts {
    #[serde(default)]
    pub locked_matches: u32,
    #[serde(default)]
    pub locked_signals: u32,
}

impl TeaserCounts {
    pub fn is_empty(&self) -> bool {
        self.locked_matches == 0 && self.locked_signals == 0
    }
}

/// The payload behind a result page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    #[serde(rename = "top5")]
    pub top_matches: Vec<SignalRow>,
    pub misaligned: Vec<SignalRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverage: Option<Vec<LeverageAction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaser: Option<TeaserCounts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<serde_json::Value>,
}

impl Contract {
    /// Signal rows across the row-bearing sections
    pub fn row_count(&self) -> usize {
        self.top_matches.len() + self.misaligned.len()
    }
}

/// Interpret a raw `fetchResults` response.
///
/// `null` means no matching entity. An `error` string is a backend failure.
/// Anything that does not deserialize into a [`Contract`] is malformed.
pub fn parse_payload(value: serde_json::Value) -> Result<Option<Contract>, FetchError> {
    if value.is_null() {
        return Ok(None);
    }

    if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
        if !error.trim().is_empty() {
            return Err(FetchError::Backend(error.to_string()));
        }
    }

    serde_json::from_value::<Contract>(value)
        .map(Some)
        .map_err(|e| FetchError::Malformed(e.to_string()))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn row(id: &str, signal: f32, fit: FitTier) -> SignalRow {
        SignalRow {
            investor: InvestorIdentity {
                id: id.to_string(),
                name: format!("Investor {}", id),
                firm: None,
            },
            signal,
            fit,
            note: None,
        }
    }

    pub fn contract(top: usize, misaligned: usize) -> Contract {
        Contract {
            top_matches: (0..top)
                .map(|i| row(&format!("top-{}", i), 90.0 - i as f32, FitTier::Strong))
                .collect(),
            misaligned: (0..misaligned)
                .map(|i| row(&format!("mis-{}", i), 20.0, FitTier::Weak))
                .collect(),
            orientation: None,
            leverage: None,
            teaser: None,
            diagnostics: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_contract() {
        let payload = json!({
            "top5": [{
                "investor": {"id": "inv_1", "name": "Ada Ventures", "firm": "Ada"},
                "signal": 87.5,
                "fit": "strong",
                "note": "Led two seed rounds in climate SaaS"
            }],
            "misaligned": []
        });

        let contract = parse_payload(payload).unwrap().unwrap();
        assert_eq!(contract.top_matches.len(), 1);
        assert_eq!(contract.top_matches[0].fit, FitTier::Strong);
        assert_eq!(contract.orientation, None);
        assert_eq!(contract.row_count(), 1);
    }

    #[test]
    fn test_unknown_fit_tier_is_tolerated() {
        let payload = json!({
            "top5": [{"investor": {"id": "a", "name": "A"}, "signal": 40, "fit": "legendary"}],
            "misaligned": []
        });
        let contract = parse_payload(payload).unwrap().unwrap();
        assert_eq!(contract.top_matches[0].fit, FitTier::Unknown);
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let err = parse_payload(json!({"top5": []})).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(ref m) if m.contains("misaligned")));
    }

    #[test]
    fn test_error_field_is_backend_failure() {
        let err = parse_payload(json!({"error": "Startup not indexed yet"})).unwrap_err();
        assert_eq!(err, FetchError::Backend("Startup not indexed yet".to_string()));
        assert_eq!(err.display_message(), "Startup not indexed yet");
    }

    #[test]
    fn test_null_is_not_found() {
        assert_eq!(parse_payload(serde_json::Value::Null).unwrap(), None);
    }
}
