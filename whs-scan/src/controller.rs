//! Scan workflow controller
//!
//! Wires the decode debouncer, session state machine, in-flight guard,
//! submitter, occupancy guard and undo together. All operator-visible side
//! effects go out on the [`EventBus`]; feedback cues go to the injected
//! [`Feedback`] sink.
//!
//! Locks are never held across a ledger call, so decodes and operator
//! actions keep flowing while a submission is outstanding. Lock order is
//! session, then debouncer, then in-flight set.

use crate::decoder::{DebounceTiming, DecodeDebouncer, DecodeOutcome, Suppression};
use crate::error::{Result, ScanError};
use crate::feedback::Feedback;
use crate::inflight::InFlightSet;
use crate::ledger::{Ledger, LedgerError};
use crate::occupancy::{
    OccupancyChoice, OccupancyGuard, OccupancyPrompt, OccupancyVerdict, INSPECT_STATUS,
};
use crate::session::{ScanPrompt, SessionState, WrongScan};
use crate::submitter::{IdempotentSubmitter, Submission};
use crate::undo::UndoController;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use whs_common::api::{LedgerEvent, Location, Mode, UndoResult};
use whs_common::config::TimingConfig;
use whs_common::events::{EventBus, NoticeLevel, ScanEvent};
use whs_common::scan::ScanKind;

/// Decoded text tagged with the camera session it was captured under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub generation: u64,
    pub text: String,
}

/// Why an admitted scan caused no transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Pending location scanned again while awaiting a box
    PendingLocationRescan,
    /// Submission for this box already dispatched
    InFlight,
    /// Occupancy prompt is waiting for the operator
    AwaitingDecision,
    /// Mode changed while the ledger call was outstanding
    StaleSession,
}

/// A classified scan waiting on the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Location(String),
    Box(String),
}

/// Result of the serial half of frame handling
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    /// Nothing left to do; the outcome is final
    Done(ScanOutcome),
    /// Needs a ledger round trip
    Dispatch(Dispatch),
}

/// What one scan did to the workflow
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Suppressed(Suppression),
    Ignored(IgnoreReason),
    WrongType(WrongScan),
    Failed(ScanError),
    LocationLocked(Location),
    OccupancyConflict(OccupancyPrompt),
    Recorded(LedgerEvent),
}

pub struct ScanController {
    session: Mutex<SessionState>,
    debouncer: Mutex<DecodeDebouncer>,
    in_flight: Mutex<InFlightSet>,
    submitter: IdempotentSubmitter,
    occupancy: OccupancyGuard,
    undo: UndoController,
    ledger: Arc<dyn Ledger>,
    feedback: Arc<dyn Feedback>,
    event_bus: EventBus,
}

impl ScanController {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        feedback: Arc<dyn Feedback>,
        event_bus: EventBus,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            session: Mutex::new(SessionState::new()),
            debouncer: Mutex::new(DecodeDebouncer::new(DebounceTiming::from(timing))),
            in_flight: Mutex::new(InFlightSet::new(timing.in_flight_expiry())),
            submitter: IdempotentSubmitter::new(Arc::clone(&ledger)),
            occupancy: OccupancyGuard::new(Arc::clone(&ledger)),
            undo: UndoController::new(Arc::clone(&ledger)),
            ledger,
            feedback,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Copy of the current session state
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.clone()
    }

    pub async fn prompt(&self) -> Option<ScanPrompt> {
        self.session.lock().await.prompt()
    }

    /// Generation of the active camera session, if the camera is on
    pub async fn camera_generation(&self) -> Option<u64> {
        let debouncer = self.debouncer.lock().await;
        debouncer.is_active().then(|| debouncer.generation())
    }

    // ----------------------------------------
    // Mode and camera
    // ----------------------------------------

    /// Enter a mode, or return to action selection with `None`
    pub async fn select_mode(&self, mode: Option<Mode>) {
        let was_active = {
            let mut session = self.session.lock().await;
            let was_active = session.camera_active();
            session.select_mode(mode);
            self.debouncer.lock().await.reset();
            was_active
        };

        info!(mode = ?mode, "Mode selected");
        if was_active {
            self.emit(ScanEvent::CameraStateChanged {
                active: false,
                timestamp: Utc::now(),
            });
        }
        self.emit(ScanEvent::ModeSelected {
            mode,
            timestamp: Utc::now(),
        });
    }

    pub async fn back_to_actions(&self) {
        self.select_mode(None).await;
    }

    /// Turn the camera on; returns the camera session generation
    ///
    /// A confirmation still on screen is dismissed first.
    pub async fn start_camera(&self) -> Result<u64> {
        let (generation, dismissed) = {
            let mut session = self.session.lock().await;
            if session.mode().is_none() {
                drop(session);
                return Err(self.report(ScanError::NoModeSelected));
            }
            let dismissed = session.dismiss_confirmation();
            session.set_camera_active(true);
            let generation = self.debouncer.lock().await.activate();
            (generation, dismissed)
        };

        if dismissed {
            self.emit(ScanEvent::ConfirmationDismissed {
                timestamp: Utc::now(),
            });
        }
        self.emit(ScanEvent::CameraStateChanged {
            active: true,
            timestamp: Utc::now(),
        });
        Ok(generation)
    }

    pub async fn stop_camera(&self) {
        let was_active = {
            let mut session = self.session.lock().await;
            let was_active = session.camera_active();
            session.set_camera_active(false);
            self.debouncer.lock().await.deactivate();
            was_active
        };
        if was_active {
            self.emit(ScanEvent::CameraStateChanged {
                active: false,
                timestamp: Utc::now(),
            });
        }
    }

    /// The device refused to start the camera
    pub async fn camera_failed(&self, reason: &str) -> ScanError {
        warn!(reason = %reason, "Camera failed to start");
        self.stop_camera().await;
        self.report(ScanError::CameraStart(reason.to_string()))
    }

    // ----------------------------------------
    // Decode path
    // ----------------------------------------

    /// Decoded text from the active camera session
    pub async fn on_decoded(&self, raw: &str) -> ScanOutcome {
        let generation = self.debouncer.lock().await.generation();
        self.on_frame(generation, raw).await
    }

    /// Decoded text tagged with the camera session it came from
    pub async fn on_frame(&self, generation: u64, raw: &str) -> ScanOutcome {
        match self.route_frame(generation, raw).await {
            Routed::Done(outcome) => outcome,
            Routed::Dispatch(dispatch) => self.dispatch(dispatch).await,
        }
    }

    /// Debounce and classify a frame, playing its feedback cue
    ///
    /// Never waits on the ledger, so frames keep being interpreted while
    /// earlier scans are outstanding.
    pub async fn route_frame(&self, generation: u64, raw: &str) -> Routed {
        let (outcome, pending_code) = {
            let session = self.session.lock().await;
            let Some(expected) = session.expectation() else {
                return Routed::Done(ScanOutcome::Suppressed(Suppression::Inactive));
            };
            if session.occupancy_prompt().is_some() {
                return Routed::Done(ScanOutcome::Ignored(IgnoreReason::AwaitingDecision));
            }
            let outcome = self.debouncer.lock().await.offer_frame(
                generation,
                raw,
                expected,
                Instant::now(),
            );
            (outcome, session.pending_location_code().map(str::to_string))
        };

        let outcome = match outcome {
            DecodeOutcome::Suppressed(reason) => ScanOutcome::Suppressed(reason),
            DecodeOutcome::WrongType {
                expected,
                received,
                id,
            } => {
                if received == ScanKind::Location && pending_code.as_deref() == Some(id.as_str()) {
                    debug!(location_code = %id, "Pending location scanned again");
                    ScanOutcome::Ignored(IgnoreReason::PendingLocationRescan)
                } else {
                    self.wrong_type(expected, received).await
                }
            }
            DecodeOutcome::Unrecognized { expected } => {
                self.feedback.error();
                let err = ScanError::UnrecognizedPrefix(expected.prefix_hint());
                debug!(value = %raw, "Unrecognized label");
                ScanOutcome::Failed(self.report(err))
            }
            DecodeOutcome::Accepted(scan) => {
                self.feedback.success();
                return Routed::Dispatch(match scan.kind {
                    ScanKind::Location => Dispatch::Location(scan.id),
                    ScanKind::Box => Dispatch::Box(scan.id),
                });
            }
        };
        Routed::Done(outcome)
    }

    /// Ledger half of frame handling
    pub async fn dispatch(&self, dispatch: Dispatch) -> ScanOutcome {
        match dispatch {
            Dispatch::Location(code) => self.scan_location(&code).await,
            Dispatch::Box(box_id) => self.submit_box(&box_id).await,
        }
    }

    async fn wrong_type(&self, expected: ScanKind, received: ScanKind) -> ScanOutcome {
        self.feedback.error();
        self.session
            .lock()
            .await
            .note_wrong_scan(expected, received);
        debug!(expected = %expected, received = %received, "Wrong label kind scanned");
        self.emit(ScanEvent::WrongScanType {
            expected,
            received,
            timestamp: Utc::now(),
        });
        ScanOutcome::WrongType(WrongScan { expected, received })
    }

    // ----------------------------------------
    // MOVE: location step
    // ----------------------------------------

    async fn scan_location(&self, code: &str) -> ScanOutcome {
        let epoch = {
            let session = self.session.lock().await;
            if session.pending_location_code() == Some(code) {
                return ScanOutcome::Ignored(IgnoreReason::PendingLocationRescan);
            }
            session.epoch()
        };

        let verdict = match self.occupancy.check_location(code).await {
            Ok(verdict) => verdict,
            Err(e) => return ScanOutcome::Failed(self.report(e)),
        };

        debug!(
            location_code = %verdict.location().location_code,
            occupied = matches!(verdict, OccupancyVerdict::Occupied { .. }),
            "Location verdict"
        );

        let mut session = self.session.lock().await;
        if session.epoch() != epoch {
            warn!(location_code = %code, "Discarding location check for a previous session");
            return ScanOutcome::Ignored(IgnoreReason::StaleSession);
        }

        match verdict {
            OccupancyVerdict::Clear { location, .. } => {
                if !session.lock_location(location.clone()) {
                    return ScanOutcome::Ignored(IgnoreReason::StaleSession);
                }
                drop(session);
                self.location_locked(&location);
                ScanOutcome::LocationLocked(location)
            }
            OccupancyVerdict::Occupied {
                location,
                occupancy,
            } => {
                let prompt = OccupancyPrompt::new(location, occupancy);
                session.open_occupancy_prompt(prompt.clone());
                drop(session);

                self.emit(ScanEvent::OccupancyConflict {
                    location_id: prompt.location.location_id,
                    location_code: prompt.location.location_code.clone(),
                    active_box_count: prompt.occupancy.active_box_count,
                    preview: prompt.preview().to_vec(),
                    more: prompt.more(),
                    timestamp: Utc::now(),
                });
                ScanOutcome::OccupancyConflict(prompt)
            }
        }
    }

    fn location_locked(&self, location: &Location) {
        info!(location_code = %location.location_code, "Location locked");
        self.emit(ScanEvent::LocationLocked {
            location_id: location.location_id,
            location_code: location.location_code.clone(),
            timestamp: Utc::now(),
        });
        self.notice(
            NoticeLevel::Success,
            format!("Location locked: {}", location.location_code),
        );
    }

    /// Operator decision on an open occupancy prompt
    pub async fn resolve_occupancy(&self, choice: OccupancyChoice) -> Result<()> {
        let mut session = self.session.lock().await;
        let Some(prompt) = session.take_occupancy_prompt() else {
            return Err(ScanError::NoOccupancyPrompt);
        };

        match choice {
            OccupancyChoice::AssignAnyway => {
                let locked = session.lock_location(prompt.location.clone());
                drop(session);
                if locked {
                    self.location_locked(&prompt.location);
                }
            }
            OccupancyChoice::ScanDifferent => {
                drop(session);
                self.notice(NoticeLevel::Info, "Scan a different location");
            }
            OccupancyChoice::InspectContents => {
                drop(session);
                self.emit(ScanEvent::NavigateToInventory {
                    location_id: prompt.location_id(),
                    status: INSPECT_STATUS.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        debug!(choice = ?choice, "Occupancy prompt resolved");
        self.emit(ScanEvent::OccupancyPromptClosed {
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Release the pending location without dismissing a confirmation
    pub async fn clear_pending_location(&self) {
        self.session.lock().await.clear_pending_location();
        self.emit(ScanEvent::LocationCleared {
            timestamp: Utc::now(),
        });
        self.notice(NoticeLevel::Info, "Location cleared");
    }

    // ----------------------------------------
    // Box step / submission
    // ----------------------------------------

    /// Submit a box under the current mode
    ///
    /// Decoded box labels arrive here; manual entry may call it directly.
    pub async fn submit_box(&self, box_id: &str) -> ScanOutcome {
        let (mode, location_code, epoch) = {
            let session = self.session.lock().await;
            let Some(mode) = session.mode() else {
                drop(session);
                return ScanOutcome::Failed(self.report(ScanError::NoModeSelected));
            };
            let location_code = session.pending_location_code().map(str::to_string);
            if mode == Mode::Move && location_code.is_none() {
                drop(session);
                return ScanOutcome::Failed(self.report(ScanError::MissingPendingLocation));
            }
            (mode, location_code, session.epoch())
        };

        if !self.in_flight.lock().await.try_insert(box_id, Instant::now()) {
            return ScanOutcome::Ignored(IgnoreReason::InFlight);
        }

        let submission = Submission::new(mode, box_id, location_code);
        let result = self.submitter.submit(&submission).await;
        self.in_flight.lock().await.complete(box_id, Instant::now());

        match result {
            Ok(event) if event.success => self.record(event, submission, epoch).await,
            Ok(event) => {
                let err = ScanError::Submission(LedgerError::Rejected {
                    status: 200,
                    detail: event.message,
                });
                ScanOutcome::Failed(self.report(err))
            }
            Err(e) => {
                warn!(box_id = %box_id, status = ?e.status(), error = %e, "Submission failed");
                ScanOutcome::Failed(self.report(ScanError::Submission(e)))
            }
        }
    }

    async fn record(&self, event: LedgerEvent, submission: Submission, epoch: u64) -> ScanOutcome {
        let Submission {
            mode,
            location_code,
            ..
        } = submission;

        let (undoable, stopped_camera) = {
            let mut session = self.session.lock().await;
            if session.epoch() != epoch {
                warn!(
                    event_id = %event.event_id,
                    box_id = %event.box_id,
                    "Discarding ledger response for a previous session"
                );
                return ScanOutcome::Ignored(IgnoreReason::StaleSession);
            }
            session.record_event(event.clone(), mode, location_code.clone());

            let stop = !event.is_duplicate && session.camera_active();
            if stop {
                session.set_camera_active(false);
                self.debouncer.lock().await.deactivate();
            }
            (session.undo_available(), stop)
        };

        if stopped_camera {
            self.emit(ScanEvent::CameraStateChanged {
                active: false,
                timestamp: Utc::now(),
            });
        }

        let box_details = match self.ledger.get_box_details(&event.box_id).await {
            Ok(Some(details)) => {
                self.session
                    .lock()
                    .await
                    .attach_box_details(event.event_id, details.clone());
                Some(details)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(box_id = %event.box_id, error = %e, "Box detail fetch failed");
                None
            }
        };

        self.emit(ScanEvent::EventRecorded {
            event: event.clone(),
            mode,
            location_code: location_code.clone(),
            box_details,
            undoable,
            timestamp: Utc::now(),
        });
        self.outcome_notices(&event, mode, location_code.as_deref());
        self.emit(ScanEvent::StatsRefreshRequested {
            timestamp: Utc::now(),
        });

        ScanOutcome::Recorded(event)
    }

    fn outcome_notices(&self, event: &LedgerEvent, mode: Mode, location_code: Option<&str>) {
        if event.is_duplicate {
            self.notice(NoticeLevel::Info, "Event already processed");
        } else if !event.state_changed() {
            self.notice(
                NoticeLevel::Info,
                format!(
                    "Already in {}. No changes made.",
                    location_code.unwrap_or("this location")
                ),
            );
        } else if mode == Mode::Move {
            self.notice(
                NoticeLevel::Success,
                format!("Moved to {}", location_code.unwrap_or("location")),
            );
        } else if event.message.is_empty() {
            self.notice(NoticeLevel::Success, "Event created successfully");
        } else {
            self.notice(NoticeLevel::Success, event.message.clone());
        }

        if let Some(warning) = &event.warning {
            self.notice(NoticeLevel::Warning, warning.clone());
        }
    }

    /// Close the confirmation card; MOVE goes back to awaiting a location
    pub async fn dismiss_confirmation(&self) {
        if self.session.lock().await.dismiss_confirmation() {
            self.emit(ScanEvent::ConfirmationDismissed {
                timestamp: Utc::now(),
            });
        }
    }

    // ----------------------------------------
    // Undo
    // ----------------------------------------

    /// Reverse the most recent successful, non-duplicate event
    pub async fn undo(&self) -> Result<UndoResult> {
        let (entry, epoch) = {
            let mut session = self.session.lock().await;
            match session.begin_undo() {
                Ok(entry) => (entry, session.epoch()),
                Err(e) => {
                    drop(session);
                    return Err(self.report(e));
                }
            }
        };

        match self.undo.reverse(&entry).await {
            Ok(result) => {
                {
                    let mut session = self.session.lock().await;
                    if session.epoch() == epoch {
                        session.apply_undo(&entry);
                    } else {
                        warn!(event_id = %entry.event_id, "Undo completed after mode change");
                    }
                }
                self.emit(ScanEvent::UndoCompleted {
                    event_id: entry.event_id,
                    result: result.clone(),
                    timestamp: Utc::now(),
                });
                self.notice(NoticeLevel::Success, "Action undone successfully");
                self.emit(ScanEvent::StatsRefreshRequested {
                    timestamp: Utc::now(),
                });
                Ok(result)
            }
            Err(e) => {
                {
                    let mut session = self.session.lock().await;
                    if session.epoch() == epoch {
                        session.undo_failed(entry);
                    }
                }
                Err(self.report(e))
            }
        }
    }

    // ----------------------------------------
    // Camera frame loop
    // ----------------------------------------

    /// Feed camera frames to the workflow until the channel closes or
    /// `shutdown` fires, then tear the session down
    ///
    /// Frames are debounced one at a time in arrival order. Location checks
    /// and submissions run as separate tasks. A closed channel waits for
    /// them; shutdown aborts them.
    pub async fn run(
        self: Arc<Self>,
        mut frames: mpsc::Receiver<DecodedFrame>,
        shutdown: CancellationToken,
    ) {
        info!("Scan controller started");
        let mut dispatches: JoinSet<ScanOutcome> = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(outstanding = dispatches.len(), "Shutdown requested");
                    dispatches.abort_all();
                    break;
                }
                Some(joined) = dispatches.join_next(), if !dispatches.is_empty() => {
                    log_dispatch(joined);
                }
                frame = frames.recv() => match frame {
                    Some(frame) => match self.route_frame(frame.generation, &frame.text).await {
                        Routed::Done(outcome) => debug!(outcome = ?outcome, "Frame processed"),
                        Routed::Dispatch(dispatch) => {
                            let controller = Arc::clone(&self);
                            dispatches.spawn(async move { controller.dispatch(dispatch).await });
                        }
                    },
                    None => {
                        debug!(outstanding = dispatches.len(), "Frame channel closed");
                        break;
                    }
                },
            }
        }

        while let Some(joined) = dispatches.join_next().await {
            log_dispatch(joined);
        }
        self.teardown().await;
    }

    /// Stop the camera and forget all decode state
    pub async fn teardown(&self) {
        self.stop_camera().await;
        self.debouncer.lock().await.reset();
        info!("Scan controller stopped");
    }

    // ----------------------------------------
    // Helpers
    // ----------------------------------------

    fn emit(&self, event: ScanEvent) {
        self.event_bus.emit_lossy(event);
    }

    fn notice(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(ScanEvent::notice(level, message));
    }

    /// Surface an error to the operator and hand it back
    fn report(&self, err: ScanError) -> ScanError {
        self.notice(NoticeLevel::Error, err.to_string());
        err
    }
}

fn log_dispatch(joined: std::result::Result<ScanOutcome, JoinError>) {
    match joined {
        Ok(outcome) => debug!(outcome = ?outcome, "Scan dispatched"),
        Err(e) if e.is_cancelled() => debug!("Scan dispatch aborted"),
        Err(e) => warn!(error = %e, "Scan dispatch task failed"),
    }
}
