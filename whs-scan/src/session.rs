//! Scan session state machine
//!
//! One exclusively-owned struct holds the mode, the MOVE sub-step, the
//! pending location, the confirmation payload, the undo slot and the
//! operator-coaching fields. It is mutated only through the transition
//! methods below, each of which preserves:
//!
//! - a pending location exists iff mode is MOVE and the step is
//!   `AwaitingBox`;
//! - the undo slot references at most the latest successful,
//!   non-duplicate event since the last mode change.
//!
//! `epoch` advances on every mode change so responses dispatched under an
//! earlier session can be recognised and discarded.

use crate::decoder::Expectation;
use crate::error::Result;
use crate::occupancy::OccupancyPrompt;
use crate::undo::{UndoEntry, UndoSlot};
use uuid::Uuid;
use whs_common::api::{BoxDetails, LedgerEvent, Location, Mode};
use whs_common::scan::{ScanKind, ScanResult};

/// MOVE sub-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveStep {
    #[default]
    AwaitingLocation,
    AwaitingBox,
}

/// Last wrong-kind scan, kept for corrective guidance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrongScan {
    pub expected: ScanKind,
    pub received: ScanKind,
}

/// Confirmation card payload for the latest recorded event
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub event: LedgerEvent,
    pub mode: Mode,
    pub location_code: Option<String>,
    pub box_details: Option<BoxDetails>,
}

/// Operator prompt for the current mode/step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPrompt {
    pub title: &'static str,
    pub instruction: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    mode: Option<Mode>,
    move_step: MoveStep,
    pending_location: Option<Location>,
    confirmation: Option<Confirmation>,
    last_scanned: Option<ScanResult>,
    wrong_scan: Option<WrongScan>,
    camera_active: bool,
    occupancy_prompt: Option<OccupancyPrompt>,
    undo: UndoSlot,
    epoch: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn move_step(&self) -> MoveStep {
        self.move_step
    }

    pub fn pending_location(&self) -> Option<&Location> {
        self.pending_location.as_ref()
    }

    pub fn pending_location_code(&self) -> Option<&str> {
        self.pending_location
            .as_ref()
            .map(|l| l.location_code.as_str())
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn last_scanned(&self) -> Option<&ScanResult> {
        self.last_scanned.as_ref()
    }

    pub fn wrong_scan(&self) -> Option<WrongScan> {
        self.wrong_scan
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    pub fn occupancy_prompt(&self) -> Option<&OccupancyPrompt> {
        self.occupancy_prompt.as_ref()
    }

    pub fn undo(&self) -> &UndoSlot {
        &self.undo
    }

    pub fn undo_available(&self) -> bool {
        self.undo.is_available()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True when the pending-location invariant holds
    pub fn is_consistent(&self) -> bool {
        let awaiting_box =
            self.mode == Some(Mode::Move) && self.move_step == MoveStep::AwaitingBox;
        self.pending_location.is_some() == awaiting_box
    }

    /// Label kind the workflow accepts next; `None` before a mode is chosen
    pub fn expectation(&self) -> Option<Expectation> {
        match (self.mode?, self.move_step) {
            (Mode::Move, MoveStep::AwaitingLocation) => {
                Some(Expectation::Only(ScanKind::Location))
            }
            _ => Some(Expectation::Only(ScanKind::Box)),
        }
    }

    pub fn prompt(&self) -> Option<ScanPrompt> {
        let prompt = match (self.mode?, self.move_step) {
            (Mode::Move, MoveStep::AwaitingLocation) => ScanPrompt {
                title: "Ready to scan location QR code",
                instruction: "Find the location QR code on the shelf where you want to place the box",
            },
            (Mode::Move, MoveStep::AwaitingBox) => ScanPrompt {
                title: "Ready to scan box QR code",
                instruction: "Find the box QR code on the label of the box you want to move",
            },
            (Mode::Receive, _) => ScanPrompt {
                title: "Ready to scan box QR code",
                instruction: "Find the box QR code on the label of the box you received",
            },
            (Mode::Ship, _) => ScanPrompt {
                title: "Ready to scan box QR code",
                instruction: "Find the box QR code on the label of the box you want to ship",
            },
        };
        Some(prompt)
    }

    /// Enter a mode (or the action-selection pseudostate with `None`)
    ///
    /// Everything but the epoch is reset; the camera is off afterwards.
    pub fn select_mode(&mut self, mode: Option<Mode>) {
        let epoch = self.epoch + 1;
        *self = Self {
            mode,
            epoch,
            ..Self::default()
        };
    }

    pub fn set_camera_active(&mut self, active: bool) {
        self.camera_active = active;
    }

    pub fn note_wrong_scan(&mut self, expected: ScanKind, received: ScanKind) {
        self.wrong_scan = Some(WrongScan { expected, received });
    }

    pub fn note_scanned(&mut self, scan: ScanResult) {
        self.last_scanned = Some(scan);
        self.wrong_scan = None;
    }

    pub fn open_occupancy_prompt(&mut self, prompt: OccupancyPrompt) {
        self.occupancy_prompt = Some(prompt);
    }

    pub fn take_occupancy_prompt(&mut self) -> Option<OccupancyPrompt> {
        self.occupancy_prompt.take()
    }

    /// MOVE: lock a location and wait for a box
    ///
    /// Returns `false` without changing anything unless the session is in
    /// MOVE awaiting a location.
    pub fn lock_location(&mut self, location: Location) -> bool {
        if self.mode != Some(Mode::Move) || self.move_step != MoveStep::AwaitingLocation {
            return false;
        }
        self.note_scanned(ScanResult::new(
            ScanKind::Location,
            location.location_code.clone(),
        ));
        self.pending_location = Some(location);
        self.move_step = MoveStep::AwaitingBox;
        self.occupancy_prompt = None;
        true
    }

    /// Release the pending location without touching the confirmation
    pub fn clear_pending_location(&mut self) {
        self.reset_move_step();
        self.last_scanned = None;
        self.wrong_scan = None;
    }

    /// Ledger accepted a submission
    ///
    /// The pending location stays for the confirmation card; it is released
    /// when the confirmation is dismissed.
    pub fn record_event(&mut self, event: LedgerEvent, mode: Mode, location_code: Option<String>) {
        self.undo.record(&event, mode, location_code.as_deref());
        self.note_scanned(ScanResult::new(ScanKind::Box, event.box_id.clone()));
        self.confirmation = Some(Confirmation {
            event,
            mode,
            location_code,
            box_details: None,
        });
    }

    /// Enrich the confirmation with box details if it still shows `event_id`
    pub fn attach_box_details(&mut self, event_id: Uuid, details: BoxDetails) -> bool {
        match &mut self.confirmation {
            Some(confirmation) if confirmation.event.event_id == event_id => {
                confirmation.box_details = Some(details);
                true
            }
            _ => false,
        }
    }

    /// Close the confirmation card; MOVE returns to awaiting a location
    ///
    /// Returns `false` when no confirmation was showing.
    pub fn dismiss_confirmation(&mut self) -> bool {
        if self.confirmation.take().is_none() {
            return false;
        }
        if self.mode == Some(Mode::Move) {
            self.reset_move_step();
        }
        self.last_scanned = None;
        self.wrong_scan = None;
        true
    }

    /// Claim the undo entry for a reversal attempt
    pub fn begin_undo(&mut self) -> Result<UndoEntry> {
        self.undo.take()
    }

    /// Reversal failed: the entry stays undoable
    pub fn undo_failed(&mut self, entry: UndoEntry) {
        self.undo.restore(entry);
    }

    /// Ledger reversed `entry`: back to a neutral pre-scan condition
    ///
    /// Mode is never changed. Reversing a MOVE releases the pending location
    /// only while it is still the one that event used; a location locked
    /// since then stays.
    pub fn apply_undo(&mut self, entry: &UndoEntry) {
        if self.undo.event_id() == Some(entry.event_id) {
            self.undo.clear();
        }
        self.confirmation = None;
        self.last_scanned = None;
        self.wrong_scan = None;
        let same_location = entry.location_code.is_some()
            && self.pending_location_code() == entry.location_code.as_deref();
        if entry.mode == Mode::Move && self.mode == Some(Mode::Move) && same_location {
            self.reset_move_step();
        }
    }

    fn reset_move_step(&mut self) {
        self.move_step = MoveStep::AwaitingLocation;
        self.pending_location = None;
    }
}
