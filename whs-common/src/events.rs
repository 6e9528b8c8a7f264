//! Event types for the WHS event system
//!
//! Every operator-visible side effect of the scan workflow (notices,
//! confirmations, prompts, stats refresh requests) is published as a
//! `ScanEvent` on the `EventBus`. Display layers subscribe; the workflow
//! never calls into them directly.

use crate::api::{BoxDetails, LedgerEvent, Mode, OccupiedBox, StatsToday, UndoResult};
use crate::scan::ScanKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Severity of an operator notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// WHS scan workflow events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScanEvent {
    /// Operator picked an action (None = back to action selection)
    ModeSelected {
        mode: Option<Mode>,
        timestamp: DateTime<Utc>,
    },

    /// Camera view turned on or off
    CameraStateChanged {
        active: bool,
        timestamp: DateTime<Utc>,
    },

    /// Short operator message (toast)
    Notice {
        level: NoticeLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A label of the other known kind was scanned
    ///
    /// Triggers:
    /// - UI: corrective guidance ("this is a location label, scan the box")
    WrongScanType {
        expected: ScanKind,
        received: ScanKind,
        timestamp: DateTime<Utc>,
    },

    /// MOVE workflow locked a location and now awaits a box
    LocationLocked {
        location_id: Uuid,
        location_code: String,
        timestamp: DateTime<Utc>,
    },

    /// Pending location released (explicit clear or confirmation dismissed)
    LocationCleared {
        timestamp: DateTime<Utc>,
    },

    /// Scanned location already holds boxes; operator must decide
    ///
    /// `preview` holds at most the first few boxes, `more` counts the rest.
    OccupancyConflict {
        location_id: Uuid,
        location_code: String,
        active_box_count: u32,
        preview: Vec<OccupiedBox>,
        more: usize,
        timestamp: DateTime<Utc>,
    },

    /// Occupancy prompt resolved or abandoned
    OccupancyPromptClosed {
        timestamp: DateTime<Utc>,
    },

    /// Operator asked to inspect a location's contents
    NavigateToInventory {
        location_id: Uuid,
        status: String,
        timestamp: DateTime<Utc>,
    },

    /// Ledger accepted a submission (confirmation card payload)
    EventRecorded {
        event: LedgerEvent,
        mode: Mode,
        location_code: Option<String>,
        box_details: Option<BoxDetails>,
        undoable: bool,
        timestamp: DateTime<Utc>,
    },

    /// Confirmation card dismissed
    ConfirmationDismissed {
        timestamp: DateTime<Utc>,
    },

    /// Last event reversed by the ledger
    UndoCompleted {
        event_id: Uuid,
        result: UndoResult,
        timestamp: DateTime<Utc>,
    },

    /// Dashboard counters are stale and should be refetched
    StatsRefreshRequested {
        timestamp: DateTime<Utc>,
    },

    /// Fresh dashboard counters
    StatsUpdated {
        stats: StatsToday,
        timestamp: DateTime<Utc>,
    },
}

impl ScanEvent {
    /// Variant name, used for logging and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            ScanEvent::ModeSelected { .. } => "ModeSelected",
            ScanEvent::CameraStateChanged { .. } => "CameraStateChanged",
            ScanEvent::Notice { .. } => "Notice",
            ScanEvent::WrongScanType { .. } => "WrongScanType",
            ScanEvent::LocationLocked { .. } => "LocationLocked",
            ScanEvent::LocationCleared { .. } => "LocationCleared",
            ScanEvent::OccupancyConflict { .. } => "OccupancyConflict",
            ScanEvent::OccupancyPromptClosed { .. } => "OccupancyPromptClosed",
            ScanEvent::NavigateToInventory { .. } => "NavigateToInventory",
            ScanEvent::EventRecorded { .. } => "EventRecorded",
            ScanEvent::ConfirmationDismissed { .. } => "ConfirmationDismissed",
            ScanEvent::UndoCompleted { .. } => "UndoCompleted",
            ScanEvent::StatsRefreshRequested { .. } => "StatsRefreshRequested",
            ScanEvent::StatsUpdated { .. } => "StatsUpdated",
        }
    }

    /// Build a notice stamped with the current time
    pub fn notice(level: NoticeLevel, message: impl Into<String>) -> Self {
        ScanEvent::Notice {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Fan-out of workflow side effects to the console, stats refresher and tests
///
/// Publishing never waits on a subscriber. A subscriber that falls more than
/// `capacity` events behind sees `RecvError::Lagged` and resumes from the
/// oldest retained event.
///
/// ```
/// use whs_common::events::{EventBus, NoticeLevel, ScanEvent};
///
/// let bus = EventBus::new(16);
/// let mut console = bus.subscribe();
/// bus.emit_lossy(ScanEvent::notice(NoticeLevel::Info, "Location cleared"));
/// assert_eq!(console.try_recv().map(|e| e.event_type()).ok(), Some("Notice"));
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScanEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.sender.subscribe()
    }

    /// Publish; `Err` hands the event back when nobody is subscribed
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ScanEvent,
    ) -> Result<usize, broadcast::error::SendError<ScanEvent>> {
        self.sender.send(event)
    }

    /// Publish, dropping the event when nobody is subscribed
    pub fn emit_lossy(&self, event: ScanEvent) {
        if self.sender.send(event).is_err() {
            trace!("No event bus subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bus_has_no_subscribers() {
        let bus = EventBus::new(32);
        assert_eq!(bus.capacity(), 32);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(4);
        assert!(bus
            .emit(ScanEvent::StatsRefreshRequested {
                timestamp: Utc::now()
            })
            .is_err());
        // lossy publish just drops it
        bus.emit_lossy(ScanEvent::LocationCleared {
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_every_subscriber_sees_wrong_scan() {
        let bus = EventBus::new(8);
        let mut console = bus.subscribe();
        let mut stats = bus.subscribe();

        bus.emit(ScanEvent::WrongScanType {
            expected: ScanKind::Box,
            received: ScanKind::Location,
            timestamp: Utc::now(),
        })
        .expect("emit should succeed");

        assert_eq!(console.try_recv().unwrap().event_type(), "WrongScanType");
        assert_eq!(stats.try_recv().unwrap().event_type(), "WrongScanType");
    }

    #[test]
    fn test_scan_event_serializes_with_type_tag() {
        let event = ScanEvent::notice(NoticeLevel::Success, "Location locked: 11-1-3");
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"Notice\""));
        assert!(json.contains("\"level\":\"success\""));

        let back: ScanEvent = serde_json::from_str(&json).expect("deserialize");
        match back {
            ScanEvent::Notice { message, .. } => assert_eq!(message, "Location locked: 11-1-3"),
            other => panic!("Wrong event type deserialized: {:?}", other),
        }
    }
}
