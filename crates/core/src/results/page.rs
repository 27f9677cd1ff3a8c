//! # Result Page State Machine
//!
//! ```text
//!            submit(valid)              fetch settles
//!   Idle ───────────────────▶ Analyzing ─────────────┬──▶ Live      (rows > 0)
//!     ▲ submit(invalid)           ▲                  ├──▶ NotFound  (no entity / zero rows)
//!     └─ stays Idle               │                  └──▶ Error     (FetchError)
//!                                 └──────── submit(valid) from any terminal state
//! ```
//!
//! A fetch is only ever in flight while `Analyzing`. Every submission carries
//! a generation; settling a submission that is no longer current (page torn
//! down) is a no-op.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::contract::Contract;
use super::fetcher::{FetchTarget, PayloadFetcher};
use super::sections::{render_sections, Section};
use crate::error::{FetchError, ValidationError};
use crate::scan::Destination;
use crate::startup::normalize_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Idle,
    Analyzing,
    Live,
    NotFound,
    Error,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Live => "live",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}

/// Exactly one of the five page states
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultPageState {
    Idle,
    Analyzing {
        target: FetchTarget,
    },
    Live {
        target: FetchTarget,
        row_count: usize,
        sections: Vec<Section>,
    },
    NotFound {
        target: FetchTarget,
    },
    Error {
        target: FetchTarget,
        message: String,
    },
}

impl ResultPageState {
    pub fn status(&self) -> PageStatus {
        match self {
            Self::Idle => PageStatus::Idle,
            Self::Analyzing { .. } => PageStatus::Analyzing,
            Self::Live { .. } => PageStatus::Live,
            Self::NotFound { .. } => PageStatus::NotFound,
            Self::Error { .. } => PageStatus::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Live { .. } | Self::NotFound { .. } | Self::Error { .. }
        )
    }
}

/// Why a submission did not start a fetch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("results are already loading")]
    InFlight,
    #[error("result page is closed")]
    TornDown,
}

/// Ticket for one in-flight fetch. Consumed by [`ResultPage::settle`].
#[derive(Debug)]
pub struct Submission {
    generation: u64,
    pub target: FetchTarget,
}

/// The result page
#[derive(Debug)]
pub struct ResultPage {
    state: ResultPageState,
    validation_message: Option<String>,
    scan_warning: Option<String>,
    generation: u64,
    torn_down: bool,
}

impl Default for ResultPage {
    fn default() -> Self {
        Self {
            state: ResultPageState::Idle,
            validation_message: None,
            scan_warning: None,
            generation: 0,
            torn_down: false,
        }
    }
}

impl ResultPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ResultPageState {
        &self.state
    }

    pub fn status(&self) -> PageStatus {
        self.state.status()
    }

    /// Inline message from the last rejected submission
    pub fn validation_message(&self) -> Option<&str> {
        self.validation_message.as_deref()
    }

    /// Failure carried in from a degraded scan destination
    pub fn scan_warning(&self) -> Option<&str> {
        self.scan_warning.as_deref()
    }

    /// Submit a URL typed into the page.
    pub fn submit(&mut self, input: &str) -> Result<Submission, SubmitRejected> {
        self.guard()?;
        match normalize_url(input) {
            Ok(url) => {
                self.scan_warning = None;
                Ok(self.begin(FetchTarget::Url(url)))
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Submit the parameters a scan navigated here with.
    ///
    /// A resolved id is fetched directly; otherwise the URL is. A degraded
    /// destination is still fetched and its message kept as a warning.
    pub fn submit_destination(&mut self, destination: &Destination) -> Result<Submission, SubmitRejected> {
        self.guard()?;

        let target = match &destination.startup_id {
            Some(id) if !id.trim().is_empty() => FetchTarget::StartupId(id.trim().to_string()),
            _ => match normalize_url(&destination.url) {
                Ok(url) => FetchTarget::Url(url),
                Err(e) => return Err(self.reject(e)),
            },
        };

        self.scan_warning = if destination.is_degraded() {
            Some(
                destination
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("Scan did not complete ({})", destination.url)),
            )
        } else {
            None
        };

        Ok(self.begin(target))
    }

    /// Apply the outcome of a fetch. Returns false if the submission is stale.
    pub fn settle(
        &mut self,
        submission: Submission,
        outcome: Result<Option<Contract>, FetchError>,
    ) -> bool {
        if self.torn_down || submission.generation != self.generation {
            tracing::debug!(
                "Discarding stale result for {} (generation {})",
                submission.target,
                submission.generation
            );
            return false;
        }
        if !matches!(self.state, ResultPageState::Analyzing { .. }) {
            return false;
        }

        let target = submission.target;
        self.state = match outcome {
            Ok(Some(contract)) if contract.row_count() > 0 => {
                tracing::info!("Results live for {} ({} rows)", target, contract.row_count());
                ResultPageState::Live {
                    row_count: contract.row_count(),
                    sections: render_sections(&contract),
                    target,
                }
            }
            Ok(_) => {
                tracing::info!("No results for {}", target);
                ResultPageState::NotFound { target }
            }
            Err(e) => {
                tracing::warn!("Results fetch failed for {}: {}", target, e);
                ResultPageState::Error {
                    message: e.display_message(),
                    target,
                }
            }
        };
        true
    }

    /// Close the page. Any outstanding submission becomes stale.
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.generation += 1;
    }

    /// Submit `input`, fetch and settle in one go.
    pub async fn load(
        &mut self,
        fetcher: &dyn PayloadFetcher,
        input: &str,
    ) -> Result<&ResultPageState, SubmitRejected> {
        let submission = self.submit(input)?;
        let outcome = fetcher.fetch(&submission.target).await;
        self.settle(submission, outcome);
        Ok(&self.state)
    }

    /// Open the page for a scan destination, fetch and settle.
    pub async fn open(
        &mut self,
        fetcher: &dyn PayloadFetcher,
        destination: &Destination,
    ) -> Result<&ResultPageState, SubmitRejected> {
        let submission = self.submit_destination(destination)?;
        let outcome = fetcher.fetch(&submission.target).await;
        self.settle(submission, outcome);
        Ok(&self.state)
    }

    fn guard(&self) -> Result<(), SubmitRejected> {
        if self.torn_down {
            return Err(SubmitRejected::TornDown);
        }
        if matches!(self.state, ResultPageState::Analyzing { .. }) {
            return Err(SubmitRejected::InFlight);
        }
        Ok(())
    }

    fn reject(&mut self, error: ValidationError) -> SubmitRejected {
        self.validation_message = Some(error.to_string());
        SubmitRejected::Invalid(error)
    }

    fn begin(&mut self, target: FetchTarget) -> Submission {
        self.validation_message = None;
        self.generation += 1;
        self.state = ResultPageState::Analyzing {
            target: target.clone(),
        };
        Submission {
            generation: self.generation,
            target,
        }
    }
}
