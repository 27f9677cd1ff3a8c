//! # Scan Events
//!
//! Notifications emitted by a live scan activation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of scan event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanEventKind {
    /// Activation started, first phase showing
    ScanStarted,
    /// Phase timer moved to the next phase
    PhaseAdvanced,
    /// Resolver answered with a startup reference
    ResolutionSucceeded,
    /// Resolver failed; a degraded destination follows
    ResolutionFailed,
    /// The one navigation decision of this activation
    NavigationDecided,
    /// Activation torn down before a decision
    TornDown,
}

/// An event from a scan activation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: ScanEventKind,
    /// Activation that produced this event
    pub scan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<PhaseSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Phase shown at the time of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub index: usize,
    pub label: String,
    pub progress: u8,
}

impl ScanEvent {
    pub fn new(kind: ScanEventKind, scan_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            scan_id: scan_id.to_string(),
            phase: None,
            data: None,
        }
    }

    pub fn with_phase(mut self, phase: PhaseSnapshot) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Name used for the SSE `event:` field
    pub fn name(&self) -> &'static str {
        match self.kind {
            ScanEventKind::ScanStarted => "scan_started",
            ScanEventKind::PhaseAdvanced => "phase_advanced",
            ScanEventKind::ResolutionSucceeded => "resolution_succeeded",
            ScanEventKind::ResolutionFailed => "resolution_failed",
            ScanEventKind::NavigationDecided => "navigation_decided",
            ScanEventKind::TornDown => "torn_down",
        }
    }
}
