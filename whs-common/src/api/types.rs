//! Ledger request/response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Operator intent for a scan session
///
/// Wire names follow the ledger (`INBOUND`/`OUTBOUND`/`MOVE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Receiving a delivery
    #[serde(rename = "INBOUND")]
    Receive,
    /// Shipping boxes out
    #[serde(rename = "OUTBOUND")]
    Ship,
    /// Putting boxes on shelves (location first, then box)
    #[serde(rename = "MOVE")]
    Move,
}

impl Mode {
    /// Ledger event type recorded by a box scan in this mode
    pub fn event_type(self) -> EventType {
        match self {
            Mode::Receive => EventType::In,
            Mode::Ship => EventType::Out,
            Mode::Move => EventType::Move,
        }
    }

    /// Operator-facing title
    pub fn title(self) -> &'static str {
        match self {
            Mode::Receive => "Receive",
            Mode::Ship => "Outgoing",
            Mode::Move => "Move",
        }
    }

    /// Parse an operator-entered mode name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RECEIVE" | "INBOUND" | "IN" => Some(Mode::Receive),
            "SHIP" | "OUTBOUND" | "OUT" | "OUTGOING" => Some(Mode::Ship),
            "MOVE" => Some(Mode::Move),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Receive => write!(f, "RECEIVE"),
            Mode::Ship => write!(f, "SHIP"),
            Mode::Move => write!(f, "MOVE"),
        }
    }
}

/// Event type stored by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    In,
    Out,
    Move,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::In => write!(f, "IN"),
            EventType::Out => write!(f, "OUT"),
            EventType::Move => write!(f, "MOVE"),
        }
    }
}

/// Where a submission originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    #[default]
    Phone,
    InboundStation,
    OutboundStation,
    Api,
}

/// Exception verdict attached by the ledger
///
/// Decided server-side; the controller only displays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionType {
    OutWithoutIn,
    MoveWhenOut,
    DuplicateScan,
    #[serde(other)]
    Unknown,
}

/// Product summary echoed with events and box details
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
}

impl Product {
    /// "Brand - Name (size)" display form
    pub fn display_name(&self) -> String {
        let base = format!("{} - {}", self.brand, self.name);
        let base = base.trim_matches(|c| c == ' ' || c == '-').to_string();
        match &self.size {
            Some(size) if !size.is_empty() => format!("{} ({})", base, size),
            _ => base,
        }
    }
}

/// Shelf or system location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub location_id: Uuid,
    pub location_code: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub aisle: String,
    #[serde(default)]
    pub rack: String,
    #[serde(default)]
    pub shelf: String,
    #[serde(default)]
    pub is_system_location: bool,
}

/// Body of `POST /events`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCreate {
    /// Idempotency key; one per logical operator submission
    pub client_event_id: Uuid,
    pub event_type: EventType,
    pub box_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_code: Option<String>,
    pub mode: Mode,
    #[serde(default)]
    pub source_type: SourceType,
}

/// Ledger verdict for a submitted event
///
/// Authoritative: never recomputed locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub event_id: Uuid,
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub exception_type: Option<ExceptionType>,
    /// Same `client_event_id` was already recorded
    #[serde(default, alias = "duplicate")]
    pub is_duplicate: bool,
    /// Whether box state actually changed (false: already at location)
    #[serde(default)]
    pub changed: Option<bool>,
    pub box_id: String,
    #[serde(default)]
    pub product: Product,
    #[serde(default)]
    pub lot_code: Option<String>,
}

impl LedgerEvent {
    /// Ledger omits `changed` for legacy events; absent means changed
    pub fn state_changed(&self) -> bool {
        self.changed.unwrap_or(true)
    }
}

/// Response of `POST /events/{id}/undo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub box_id: String,
    #[serde(default)]
    pub product: Product,
    #[serde(default)]
    pub lot_code: Option<String>,
    pub status: String,
    #[serde(default)]
    pub current_location: Option<Location>,
}

/// One box listed in an occupancy snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupiedBox {
    pub box_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub lot_code: Option<String>,
    #[serde(default)]
    pub last_moved_at: Option<DateTime<Utc>>,
}

/// Point-in-time contents of a location; never cached across scans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationOccupancy {
    pub location_id: Uuid,
    #[serde(default)]
    pub location_code: String,
    pub active_box_count: u32,
    #[serde(default)]
    pub boxes: Vec<OccupiedBox>,
}

impl LocationOccupancy {
    pub fn is_empty(&self) -> bool {
        self.active_box_count == 0
    }
}

/// Response of `GET /boxes/{box_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxDetails {
    pub box_id: String,
    #[serde(default)]
    pub product: Product,
    #[serde(default)]
    pub lot_code: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub current_location: Option<Location>,
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

/// Box received but not yet shelved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingPutawayItem {
    pub box_id: String,
    #[serde(default)]
    pub product: Product,
    #[serde(default)]
    pub lot_code: Option<String>,
    #[serde(default)]
    pub last_event_time: Option<String>,
}

/// Recent ledger activity line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEvent {
    pub event_id: Uuid,
    pub timestamp: String,
    pub event_type: EventType,
    pub box_id: String,
    #[serde(default)]
    pub product: Product,
    #[serde(default)]
    pub lot_code: Option<String>,
    #[serde(default)]
    pub location_code: Option<String>,
}

/// Response of `GET /stats/today`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsToday {
    #[serde(default)]
    pub received_today: u32,
    #[serde(default)]
    pub to_put_away: u32,
    #[serde(default)]
    pub moved_today: u32,
    #[serde(default)]
    pub shipped_today: u32,
    #[serde(default)]
    pub exceptions_today: u32,
    #[serde(default)]
    pub server_time: String,
    #[serde(default)]
    pub waiting_putaway_preview: Vec<WaitingPutawayItem>,
    #[serde(default)]
    pub recent_events: Vec<RecentEvent>,
}

/// Operator role preference (persisted locally)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    #[default]
    Employee,
}

impl UserRole {
    pub fn is_admin(self) -> bool {
        self == UserRole::Admin
    }
}
