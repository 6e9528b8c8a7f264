//! Error types for whs-scan
//!
//! A label of the other known kind is not an error; it comes back as
//! `ScanOutcome::WrongType` for corrective guidance.
//!
//! Every variant is recoverable: decode- and resolution-level errors are
//! handled inside the controller (feedback + notice), submission and undo
//! errors are surfaced to the operator without ending the session.

use crate::ledger::LedgerError;
use thiserror::Error;

/// Scan workflow error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Decoded text carries no known prefix
    #[error("Invalid QR type. Expected {0} prefix.")]
    UnrecognizedPrefix(String),

    /// Camera could not be started
    #[error("Failed to start camera. Please check permissions.")]
    CameraStart(String),

    /// Camera or scan requested before an action was chosen
    #[error("Please select an action first")]
    NoModeSelected,

    /// Scanned location code is not in the catalog
    #[error("Location not found: {0}")]
    UnknownLocation(String),

    /// Location lookup failed before occupancy could be checked
    #[error("{0}")]
    LocationLookup(#[source] LedgerError),

    /// MOVE box scan without a locked location
    #[error("Please scan location first")]
    MissingPendingLocation,

    /// Ledger rejected or never received the submission
    #[error("{0}")]
    Submission(#[source] LedgerError),

    /// Undo requested with an empty undo slot
    #[error("No action to undo")]
    NothingToUndo,

    /// Ledger failed to reverse the event; undo slot retained
    #[error("{0}")]
    Undo(#[source] LedgerError),

    /// Occupancy resolution chosen while no prompt is open
    #[error("No location decision is pending")]
    NoOccupancyPrompt,
}

/// Convenience Result type using whs-scan ScanError
pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_error_surfaces_server_text() {
        let err = ScanError::Submission(LedgerError::Rejected {
            status: 400,
            detail: "Unknown box. Create label first.".to_string(),
        });
        assert_eq!(err.to_string(), "Unknown box. Create label first.");
    }

}
