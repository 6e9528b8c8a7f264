//! Single-slot undo
//!
//! Only the most recent successful, non-duplicate event is undoable. The
//! slot is filled by the session when such an event is recorded and
//! emptied by the next recorded event, a mode change, or a successful undo.

use crate::error::{Result, ScanError};
use crate::ledger::{Ledger, LedgerError};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use whs_common::api::{LedgerEvent, Mode, UndoResult};

/// The event an undo would reverse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    pub event_id: Uuid,
    pub mode: Mode,
    pub box_id: String,
    /// MOVE target the event shelved the box at
    pub location_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoSlot {
    entry: Option<UndoEntry>,
}

impl UndoSlot {
    /// Offer a freshly recorded event
    ///
    /// Any recorded event displaces the previous entry; only a successful,
    /// non-duplicate one takes its place.
    pub fn record(&mut self, event: &LedgerEvent, mode: Mode, location_code: Option<&str>) {
        self.entry = (event.success && !event.is_duplicate).then(|| UndoEntry {
            event_id: event.event_id,
            mode,
            box_id: event.box_id.clone(),
            location_code: location_code.map(str::to_string),
        });
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn entry(&self) -> Option<&UndoEntry> {
        self.entry.as_ref()
    }

    pub fn event_id(&self) -> Option<Uuid> {
        self.entry.as_ref().map(|e| e.event_id)
    }

    pub fn is_available(&self) -> bool {
        self.entry.is_some()
    }

    /// Remove the entry for a reversal attempt
    pub fn take(&mut self) -> Result<UndoEntry> {
        self.entry.take().ok_or(ScanError::NothingToUndo)
    }

    /// Put back an entry whose reversal failed, unless a newer event took
    /// the slot meanwhile
    pub fn restore(&mut self, entry: UndoEntry) {
        if self.entry.is_none() {
            self.entry = Some(entry);
        }
    }
}

/// Calls the ledger's reversal operation
#[derive(Clone)]
pub struct UndoController {
    ledger: Arc<dyn Ledger>,
}

impl UndoController {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn reverse(&self, entry: &UndoEntry) -> Result<UndoResult> {
        let result = self
            .ledger
            .undo_event(entry.event_id)
            .await
            .map_err(|e| {
                warn!(event_id = %entry.event_id, error = %e, "Undo failed");
                ScanError::Undo(e)
            })?;

        if !result.success {
            warn!(event_id = %entry.event_id, message = %result.message, "Ledger declined undo");
            return Err(ScanError::Undo(LedgerError::Rejected {
                status: 200,
                detail: result.message,
            }));
        }

        info!(
            event_id = %entry.event_id,
            box_id = %result.box_id,
            status = %result.status,
            "Event undone"
        );
        Ok(result)
    }
}
