//! # Scan Phases
//!
//! The labeled progress steps shown while a scan is in flight. Purely
//! cosmetic: advancing them never waits on the resolver.

use serde::Serialize;
use std::time::Duration;

/// One step of the progress sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanPhase {
    pub label: &'static str,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: Duration,
}

impl ScanPhase {
    pub const fn new(label: &'static str, millis: u64) -> Self {
        Self {
            label,
            duration: Duration::from_millis(millis),
        }
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

pub static SCAN_PHASES: [ScanPhase; 5] = [
    ScanPhase::new("Reading your website", 1_400),
    ScanPhase::new("Extracting traction signals", 1_800),
    ScanPhase::new("Matching investor theses", 2_200),
    ScanPhase::new("Scoring fit and alignment", 1_600),
    ScanPhase::new("Preparing your results", 1_200),
];

/// Position in a phase list. Stops on the last phase; never wraps.
#[derive(Debug, Clone)]
pub struct PhaseCursor {
    phases: &'static [ScanPhase],
    index: usize,
}

impl Default for PhaseCursor {
    fn default() -> Self {
        Self::new(&SCAN_PHASES)
    }
}

impl PhaseCursor {
    pub fn new(phases: &'static [ScanPhase]) -> Self {
        Self { phases, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&'static ScanPhase> {
        self.phases.get(self.index)
    }

    /// Move to the next phase. Returns false once the last phase is reached.
    pub fn advance(&mut self) -> bool {
        if self.index + 1 < self.phases.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.phases.len()
    }

    /// Percentage shown in the progress bar, 0-100
    pub fn progress(&self) -> u8 {
        if self.phases.is_empty() {
            return 0;
        }
        (((self.index + 1) * 100) / self.phases.len()).min(100) as u8
    }
}
