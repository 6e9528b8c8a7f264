//! Test helper modules for whs-scan integration tests
//!
//! - FakeLedger: in-memory ledger honouring idempotency tokens, with
//!   failure injection and call recording
//! - RecordingFeedback: counts success/error cues
//! - StubServer: canned-response HTTP server for the HTTP ledger client
//! - Harness: controller wired to the fakes, plus event-bus capture

#![allow(dead_code)]

pub mod fake_ledger;
pub mod feedback;
pub mod stub_server;

pub use fake_ledger::FakeLedger;
pub use feedback::RecordingFeedback;
pub use stub_server::{StubResponse, StubServer};

use std::sync::Arc;
use tokio::sync::broadcast;
use whs_common::api::Mode;
use whs_common::config::TimingConfig;
use whs_common::events::{EventBus, NoticeLevel, ScanEvent};
use whs_scan::ScanController;

pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub feedback: Arc<RecordingFeedback>,
    pub controller: Arc<ScanController>,
    pub events: broadcast::Receiver<ScanEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_ledger(FakeLedger::new())
    }

    pub fn with_ledger(ledger: FakeLedger) -> Self {
        let ledger = Arc::new(ledger);
        let feedback = Arc::new(RecordingFeedback::default());
        let event_bus = EventBus::new(1024);
        let events = event_bus.subscribe();
        let controller = Arc::new(ScanController::new(
            ledger.clone(),
            feedback.clone(),
            event_bus,
            &TimingConfig::default(),
        ));
        Self {
            ledger,
            feedback,
            controller,
            events,
        }
    }

    /// Select `mode` and turn the camera on
    pub async fn scanning(mode: Mode) -> Self {
        let harness = Self::new();
        harness.controller.select_mode(Some(mode)).await;
        harness
            .controller
            .start_camera()
            .await
            .expect("camera starts once a mode is selected");
        harness
    }

    /// Everything published since the last drain
    pub fn drain(&mut self) -> Vec<ScanEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }

    /// Notice messages published since the last drain
    pub fn notices(&mut self) -> Vec<(NoticeLevel, String)> {
        self.drain()
            .into_iter()
            .filter_map(|event| match event {
                ScanEvent::Notice { level, message, .. } => Some((level, message)),
                _ => None,
            })
            .collect()
    }
}

/// Names of the events, for order assertions
pub fn event_types(events: &[ScanEvent]) -> Vec<&'static str> {
    events.iter().map(ScanEvent::event_type).collect()
}
