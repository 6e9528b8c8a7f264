//! Ledger API types shared by WHS services
//!
//! Request/response bodies exchanged with the event ledger service.
//! Only serde types live here; each service wraps them with its own
//! HTTP client.

pub mod types;

pub use types::{
    BoxDetails, EventCreate, EventType, ExceptionType, LedgerEvent, Location, LocationOccupancy,
    Mode, OccupiedBox, Product, RecentEvent, SourceType, StatsToday, UndoResult, UserRole,
    WaitingPutawayItem,
};
