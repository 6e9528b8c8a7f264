//! # WHS Scan Workflow Controller (whs-scan)
//!
//! Turns a handset camera's stream of decoded QR strings into warehouse
//! inventory events: receive, ship, and move-to-shelf.
//!
//! **Pipeline:** decode debouncer → session state machine → in-flight guard
//! → idempotent submitter → event ledger. MOVE adds an occupancy check
//! before a location is locked. The last successful event can be undone.
//!
//! Side effects are published on the `whs_common::events::EventBus`;
//! display layers subscribe to it.

pub mod console;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod feedback;
pub mod inflight;
pub mod ledger;
pub mod occupancy;
pub mod role;
pub mod session;
pub mod stats;
pub mod submitter;
pub mod undo;

pub use controller::{DecodedFrame, Dispatch, IgnoreReason, Routed, ScanController, ScanOutcome};
pub use error::{Result, ScanError};
pub use ledger::{HttpLedger, Ledger, LedgerError};
pub use session::{MoveStep, SessionState};
