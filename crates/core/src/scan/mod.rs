//! # Scan Orchestration
//!
//! Drives a scan from a submitted URL to exactly one navigation decision.
//!
//! ## Flow
//!
//! ```text
//! submit URL → phase timer ┐
//!            → Resolver ───┴→ NavigationDecision → /results?url=..&startupId=..
//!                                                 → /results?url=..&reason=scan_failed&error=..
//! ```

pub mod destination;
pub mod events;
pub mod orchestrator;
pub mod phases;

pub use destination::{Destination, FailureReason, RESULTS_PATH};
pub use events::{PhaseSnapshot, ScanEvent, ScanEventKind};
pub use orchestrator::{
    NavigationDecision, ScanHandle, ScanOrchestrator, ScanOutcome, ScanView, MAX_PHASE_SCALE,
};
pub use phases::{PhaseCursor, ScanPhase, SCAN_PHASES};
