//! Event ledger boundary
//!
//! The ledger lives behind the network: it stores events, collapses
//! submissions sharing a `client_event_id`, decides duplicate/exception
//! verdicts, and reverses events on undo. The controller only talks to it
//! through the [`Ledger`] trait so the transport can be swapped (HTTP in
//! production, in-memory fakes in tests).

pub mod http;

pub use http::HttpLedger;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use whs_common::api::{
    BoxDetails, EventCreate, LedgerEvent, Location, LocationOccupancy, StatsToday, UndoResult,
};

/// Ledger call failure
///
/// `Display` is the operator-facing message: the server's own `detail`
/// text when the ledger supplied one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// 404 from the ledger
    #[error("{0}")]
    NotFound(String),

    /// Ledger refused the request (validation, rules, server error)
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    /// Request never completed (connect, timeout, reset)
    #[error("Network error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("Unexpected ledger response: {0}")]
    Decode(String),
}

impl LedgerError {
    /// HTTP status when the ledger answered
    pub fn status(&self) -> Option<u16> {
        match self {
            LedgerError::NotFound(_) => Some(404),
            LedgerError::Rejected { status, .. } => Some(*status),
            LedgerError::Transport(_) | LedgerError::Decode(_) => None,
        }
    }
}

/// Operations the scan controller consumes from the ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Record an IN/OUT/MOVE event; must honour `client_event_id`
    async fn submit_event(&self, request: &EventCreate) -> Result<LedgerEvent, LedgerError>;

    /// Reverse a previously recorded event
    async fn undo_event(&self, event_id: Uuid) -> Result<UndoResult, LedgerError>;

    /// Look up a location by its printed code; `None` when unknown
    async fn resolve_location(&self, code: &str) -> Result<Option<Location>, LedgerError>;

    /// Boxes currently assigned to a location
    async fn get_occupancy(&self, location_id: Uuid) -> Result<LocationOccupancy, LedgerError>;

    /// Box detail for confirmation display; `None` when unknown
    async fn get_box_details(&self, box_id: &str) -> Result<Option<BoxDetails>, LedgerError>;

    /// Today's dashboard counters
    async fn stats_today(&self) -> Result<StatsToday, LedgerError>;
}
