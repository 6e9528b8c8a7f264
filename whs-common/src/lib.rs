//! # WHS Common Library
//!
//! Shared code for the warehouse scanning services including:
//! - Ledger wire types (events, locations, occupancy, box details)
//! - Event types (ScanEvent enum) and the EventBus
//! - Configuration loading
//! - Barcode prefix classification

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod scan;

pub use error::{Error, Result};
