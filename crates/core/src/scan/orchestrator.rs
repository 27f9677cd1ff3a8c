//! # Scan Orchestrator
//!
//! Runs one scan activation: a cosmetic phase timer and the resolver call,
//! as two tasks sharing a [`CancellationToken`].
//!
//! ```text
//! start(url) ──validate──▶ ScanHandle
//!                 │
//!                 ├── timer task   phase 0 ─▶ phase 1 ─▶ ... ─▶ last   (child token)
//!                 │
//!                 └── driver task  resolver.resolve(url) ──▶ NavigationDecision (oneshot)
//!                                        │                        │
//!                                        └── decision cancels ────┘ the timer
//! teardown / drop(handle) ── cancels session token; late timer ticks and
//!                            resolver answers become no-ops
//! ```
//!
//! Every mutation of the shared view happens under its lock after a liveness
//! check, and teardown cancels under the same lock, so nothing changes after
//! teardown returns.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::destination::Destination;
use super::events::{PhaseSnapshot, ScanEvent, ScanEventKind};
use super::phases::{PhaseCursor, ScanPhase, SCAN_PHASES};
use crate::error::{ResolutionError, ValidationError};
use crate::startup::{Resolver, StartupRef};

/// How the activation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Resolver returned a startup id
    Resolved { startup_id: String },
    /// Resolver succeeded without a startup record
    Unresolved,
    /// Resolver failed; the destination is degraded
    Failed { message: String },
}

/// The single navigation decision of an activation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationDecision {
    pub scan_id: String,
    pub startup: StartupRef,
    pub outcome: ScanOutcome,
    pub destination: Destination,
}

impl NavigationDecision {
    fn from_resolution(
        scan_id: &str,
        startup: StartupRef,
        result: Result<Option<String>, ResolutionError>,
    ) -> Self {
        let (startup, outcome, destination) = match result {
            Ok(Some(id)) => {
                let startup = startup.with_startup_id(id.clone());
                let destination = Destination::resolved(&startup);
                (startup, ScanOutcome::Resolved { startup_id: id }, destination)
            }
            Ok(None) => {
                let destination = Destination::resolved(&startup);
                (startup, ScanOutcome::Unresolved, destination)
            }
            Err(e) => {
                let message = e.to_string();
                let destination = Destination::scan_failed(startup.raw_url.clone(), message.clone());
                (startup, ScanOutcome::Failed { message }, destination)
            }
        };

        Self {
            scan_id: scan_id.to_string(),
            startup,
            outcome,
            destination,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Failed { .. })
    }
}

/// What the scanning screen shows right now
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanView {
    pub scan_id: String,
    pub phase: PhaseSnapshot,
    pub decided: bool,
    pub torn_down: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
}

fn snapshot(cursor: &PhaseCursor) -> PhaseSnapshot {
    PhaseSnapshot {
        index: cursor.index(),
        label: cursor
            .current()
            .map(|p| p.label.to_string())
            .unwrap_or_default(),
        progress: cursor.progress(),
    }
}

/// State shared by the handle and both tasks of one activation
struct Activation {
    scan_id: String,
    session: CancellationToken,
    timer: CancellationToken,
    view: Mutex<ScanView>,
    event_tx: Option<mpsc::Sender<ScanEvent>>,
}

impl Activation {
    /// Lock the view only if the activation is still live.
    fn live_view(&self) -> Option<MutexGuard<'_, ScanView>> {
        let guard = match self.view.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        (!self.session.is_cancelled()).then_some(guard)
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(tx) = &self.event_tx {
            if let Err(e) = tx.try_send(event) {
                tracing::debug!("Dropping scan event for {}: {}", self.scan_id, e);
            }
        }
    }

    fn teardown(&self) {
        let mut view = match self.view.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.session.is_cancelled() {
            return;
        }
        self.session.cancel();
        view.torn_down = true;

        if !view.decided {
            tracing::info!("Scan {} torn down before a decision", self.scan_id);
            self.emit(
                ScanEvent::new(ScanEventKind::TornDown, &self.scan_id).with_phase(view.phase.clone()),
            );
        }
    }
}

/// Handle to a running activation. Dropping it tears the activation down.
pub struct ScanHandle {
    activation: Arc<Activation>,
    decision_rx: Option<oneshot::Receiver<NavigationDecision>>,
}

impl std::fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandle")
            .field("scan_id", &self.activation.scan_id)
            .field("torn_down", &self.activation.session.is_cancelled())
            .finish()
    }
}

impl ScanHandle {
    pub fn scan_id(&self) -> &str {
        &self.activation.scan_id
    }

    /// Snapshot of what the scanning screen shows
    pub fn view(&self) -> ScanView {
        match self.activation.view.lock() {
            Ok(view) => view.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_live(&self) -> bool {
        !self.activation.session.is_cancelled()
    }

    /// Stop the activation. Idempotent.
    pub fn teardown(&self) {
        self.activation.teardown();
    }

    /// Wait for the navigation decision.
    ///
    /// Returns `None` if the activation was torn down first, or if the
    /// decision was already taken by an earlier call.
    pub async fn decision(&mut self) -> Option<NavigationDecision> {
        let rx = self.decision_rx.take()?;
        tokio::select! {
            biased;
            decision = rx => decision.ok(),
            _ = self.activation.session.cancelled() => None,
        }
    }

    /// Wait for the decision, consuming the handle.
    pub async fn finish(mut self) -> Option<NavigationDecision> {
        self.decision().await
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        self.activation.teardown();
    }
}

/// Largest accepted phase duration multiplier
pub const MAX_PHASE_SCALE: f32 = 10.0;

/// Starts scan activations against an injected resolver
#[derive(Clone)]
pub struct ScanOrchestrator {
    resolver: Arc<dyn Resolver>,
    phases: &'static [ScanPhase],
    phase_scale: f32,
    event_tx: Option<mpsc::Sender<ScanEvent>>,
}

impl std::fmt::Debug for ScanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOrchestrator")
            .field("phases", &self.phases.len())
            .field("phase_scale", &self.phase_scale)
            .finish()
    }
}

impl ScanOrchestrator {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            phases: &SCAN_PHASES,
            phase_scale: 1.0,
            event_tx: None,
        }
    }

    /// Use a custom phase list
    pub fn with_phases(mut self, phases: &'static [ScanPhase]) -> Self {
        self.phases = phases;
        self
    }

    /// Stretch (> 1) or compress (< 1) every phase duration, clamped to
    /// `0..=MAX_PHASE_SCALE`
    pub fn with_phase_scale(mut self, scale: f32) -> Self {
        self.phase_scale = if scale.is_finite() {
            scale.clamp(0.0, MAX_PHASE_SCALE)
        } else {
            1.0
        };
        self
    }

    /// Stream events of every activation to `tx`
    pub fn with_event_channel(mut self, tx: mpsc::Sender<ScanEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Validate `raw_url` and start an activation.
    ///
    /// Invalid input is returned inline: nothing is spawned and no
    /// navigation follows.
    pub fn start(&self, raw_url: &str) -> Result<ScanHandle, ValidationError> {
        self.start_with_events(raw_url, self.event_tx.clone())
    }

    /// Like [`start`](Self::start) with a per-activation event channel.
    pub fn start_with_events(
        &self,
        raw_url: &str,
        event_tx: Option<mpsc::Sender<ScanEvent>>,
    ) -> Result<ScanHandle, ValidationError> {
        let startup = StartupRef::parse(raw_url)?;
        let scan_id = uuid::Uuid::new_v4().to_string();
        let session = CancellationToken::new();
        let timer = session.child_token();
        let cursor = PhaseCursor::new(self.phases);

        let activation = Arc::new(Activation {
            scan_id: scan_id.clone(),
            timer,
            session,
            view: Mutex::new(ScanView {
                scan_id: scan_id.clone(),
                phase: snapshot(&cursor),
                decided: false,
                torn_down: false,
                destination: None,
            }),
            event_tx,
        });

        tracing::info!("Scan {} started for {}", scan_id, startup.normalized_url);
        activation.emit(
            ScanEvent::new(ScanEventKind::ScanStarted, &scan_id)
                .with_phase(snapshot(&cursor))
                .with_data(serde_json::json!({ "url": startup.raw_url })),
        );

        let (decision_tx, decision_rx) = oneshot::channel();

        tokio::spawn(run_phase_timer(
            Arc::clone(&activation),
            cursor,
            self.phase_scale,
        ));
        tokio::spawn(drive_resolution(
            Arc::clone(&activation),
            Arc::clone(&self.resolver),
            startup,
            decision_tx,
        ));

        Ok(ScanHandle {
            activation,
            decision_rx: Some(decision_rx),
        })
    }

    /// Start an activation and wait for its decision.
    pub async fn run(&self, raw_url: &str) -> Result<NavigationDecision, ValidationError> {
        let startup = StartupRef::parse(raw_url)?;
        let handle = self.start(raw_url)?;
        let scan_id = handle.scan_id().to_string();

        // The handle is owned here, so None means the driver task died
        Ok(handle.finish().await.unwrap_or_else(|| {
            tracing::warn!("Scan {} ended without a decision", scan_id);
            NavigationDecision::from_resolution(
                &scan_id,
                startup,
                Err(ResolutionError::Unavailable("scan interrupted".to_string())),
            )
        }))
    }
}

async fn run_phase_timer(activation: Arc<Activation>, mut cursor: PhaseCursor, scale: f32) {
    while let Some(phase) = cursor.current() {
        if cursor.is_last() {
            break;
        }

        let wait = Duration::try_from_secs_f32(phase.duration.as_secs_f32() * scale)
            .unwrap_or(phase.duration);
        tokio::select! {
            _ = activation.timer.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        let Some(mut view) = activation.live_view() else {
            break;
        };
        if activation.timer.is_cancelled() {
            break;
        }

        cursor.advance();
        view.phase = snapshot(&cursor);
        tracing::debug!(
            "Scan {} phase {}: {}",
            activation.scan_id,
            view.phase.index,
            view.phase.label
        );
        activation.emit(
            ScanEvent::new(ScanEventKind::PhaseAdvanced, &activation.scan_id)
                .with_phase(view.phase.clone()),
        );
    }
}

async fn drive_resolution(
    activation: Arc<Activation>,
    resolver: Arc<dyn Resolver>,
    startup: StartupRef,
    decision_tx: oneshot::Sender<NavigationDecision>,
) {
    // Not raced against teardown: a late answer is ignored, not aborted
    let result = resolver
        .resolve_submission(&startup)
        .await
        .map(|found| found.map(|s| s.id));

    let Some(mut view) = activation.live_view() else {
        tracing::debug!(
            "Discarding late resolution for torn down scan {}",
            activation.scan_id
        );
        return;
    };

    activation.timer.cancel();

    let decision = NavigationDecision::from_resolution(&activation.scan_id, startup, result);
    view.decided = true;
    view.destination = Some(decision.destination.clone());

    match &decision.outcome {
        ScanOutcome::Failed { message } => {
            tracing::warn!(
                "Scan {} resolution failed, degrading: {}",
                activation.scan_id,
                message
            );
            activation.emit(
                ScanEvent::new(ScanEventKind::ResolutionFailed, &activation.scan_id)
                    .with_data(serde_json::json!({ "error": message })),
            );
        }
        ScanOutcome::Resolved { startup_id } => {
            activation.emit(
                ScanEvent::new(ScanEventKind::ResolutionSucceeded, &activation.scan_id)
                    .with_data(serde_json::json!({ "startupId": startup_id })),
            );
        }
        ScanOutcome::Unresolved => {
            activation.emit(ScanEvent::new(
                ScanEventKind::ResolutionSucceeded,
                &activation.scan_id,
            ));
        }
    }

    tracing::info!(
        "Scan {} navigating to {}",
        activation.scan_id,
        decision.destination.to_path()
    );
    activation.emit(
        ScanEvent::new(ScanEventKind::NavigationDecided, &activation.scan_id)
            .with_phase(view.phase.clone())
            .with_data(serde_json::json!({
                "destination": decision.destination.to_path(),
            })),
    );
    drop(view);

    let _ = decision_tx.send(decision);
}
