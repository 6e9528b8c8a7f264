//! Idempotent event submitter
//!
//! Mints a fresh `client_event_id` for every call and forwards the request
//! to the ledger once. The ledger collapses transport-level duplicates that
//! share a token; physically repeated scans get distinct tokens and are the
//! ledger's to judge. No automatic retry: a manual rescan is a new logical
//! submission.

use crate::ledger::{Ledger, LedgerError};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use whs_common::api::{EventCreate, LedgerEvent, Mode, SourceType};

/// One logical operator submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub mode: Mode,
    pub box_id: String,
    /// Target shelf (MOVE only)
    pub location_code: Option<String>,
}

impl Submission {
    pub fn new(mode: Mode, box_id: impl Into<String>, location_code: Option<String>) -> Self {
        Self {
            mode,
            box_id: box_id.into(),
            location_code,
        }
    }

    /// Build the ledger request under the given idempotency token
    pub fn to_request(&self, client_event_id: Uuid, source_type: SourceType) -> EventCreate {
        EventCreate {
            client_event_id,
            event_type: self.mode.event_type(),
            box_id: self.box_id.clone(),
            location_code: self.location_code.clone(),
            mode: self.mode,
            source_type,
        }
    }
}

#[derive(Clone)]
pub struct IdempotentSubmitter {
    ledger: Arc<dyn Ledger>,
    source_type: SourceType,
}

impl IdempotentSubmitter {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self {
            ledger,
            source_type: SourceType::Phone,
        }
    }

    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    /// Submit under a freshly minted token
    pub async fn submit(&self, submission: &Submission) -> Result<LedgerEvent, LedgerError> {
        self.submit_with_token(submission, Uuid::new_v4()).await
    }

    /// Submit under a caller-held token
    ///
    /// Re-sending the same request after a transport failure must reuse the
    /// token so the ledger records it at most once.
    pub async fn submit_with_token(
        &self,
        submission: &Submission,
        client_event_id: Uuid,
    ) -> Result<LedgerEvent, LedgerError> {
        let request = submission.to_request(client_event_id, self.source_type);
        debug!(
            client_event_id = %client_event_id,
            event_type = %request.event_type,
            box_id = %request.box_id,
            "Submitting event"
        );

        let event = self.ledger.submit_event(&request).await?;

        info!(
            client_event_id = %client_event_id,
            event_id = %event.event_id,
            box_id = %event.box_id,
            duplicate = event.is_duplicate,
            changed = event.state_changed(),
            "Ledger recorded event"
        );
        Ok(event)
    }
}
