//! Occupancy guard integration tests

mod helpers;

use helpers::{FakeLedger, Harness};
use std::time::Duration;
use whs_common::api::Mode;
use whs_common::events::{NoticeLevel, ScanEvent};
use whs_scan::controller::IgnoreReason;
use whs_scan::occupancy::{OccupancyChoice, OccupancyGuard, OccupancyVerdict, INSPECT_STATUS};
use whs_scan::{MoveStep, ScanError, ScanOutcome};

async fn move_harness(ledger: FakeLedger) -> Harness {
    let h = Harness::with_ledger(ledger);
    h.controller.select_mode(Some(Mode::Move)).await;
    h.controller.start_camera().await.unwrap();
    h
}

#[tokio::test(start_paused = true)]
async fn test_occupied_location_opens_prompt_and_waits() {
    let ledger = FakeLedger::with_locations(&["11-1-3"]);
    ledger.set_occupancy("11-1-3", 2);
    let mut h = move_harness(ledger).await;
    h.drain();

    let outcome = h.controller.on_decoded("LOC:11-1-3").await;

    let ScanOutcome::OccupancyConflict(prompt) = outcome else {
        panic!("expected occupancy conflict, got {:?}", outcome);
    };
    assert_eq!(prompt.occupancy.active_box_count, 2);
    assert_eq!(prompt.preview().len(), 2);

    let state = h.controller.state().await;
    assert_eq!(state.move_step(), MoveStep::AwaitingLocation);
    assert!(state.pending_location().is_none());
    assert!(state.occupancy_prompt().is_some());

    let events = h.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ScanEvent::OccupancyConflict { location_code, active_box_count: 2, more: 0, .. }
            if location_code == "11-1-3"
    )));
}

#[tokio::test(start_paused = true)]
async fn test_scan_different_keeps_awaiting_location() {
    let ledger = FakeLedger::with_locations(&["11-1-3"]);
    ledger.set_occupancy("11-1-3", 2);
    let mut h = move_harness(ledger).await;
    h.controller.on_decoded("LOC:11-1-3").await;
    h.drain();

    h.controller
        .resolve_occupancy(OccupancyChoice::ScanDifferent)
        .await
        .unwrap();

    let state = h.controller.state().await;
    assert_eq!(state.move_step(), MoveStep::AwaitingLocation);
    assert!(state.pending_location().is_none());
    assert!(state.occupancy_prompt().is_none());

    let events = h.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ScanEvent::Notice { level: NoticeLevel::Info, message, .. } if message == "Scan a different location"
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, ScanEvent::OccupancyPromptClosed { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_assign_anyway_locks_location() {
    let ledger = FakeLedger::with_locations(&["11-1-3"]);
    ledger.set_occupancy("11-1-3", 2);
    let h = move_harness(ledger).await;
    h.controller.on_decoded("LOC:11-1-3").await;

    h.controller
        .resolve_occupancy(OccupancyChoice::AssignAnyway)
        .await
        .unwrap();

    let state = h.controller.state().await;
    assert_eq!(state.move_step(), MoveStep::AwaitingBox);
    assert_eq!(state.pending_location_code(), Some("11-1-3"));
    assert!(state.is_consistent());

    // And the box goes to that shelf
    tokio::time::advance(Duration::from_secs(4)).await;
    assert!(matches!(
        h.controller.on_decoded("BOX:BX-1").await,
        ScanOutcome::Recorded(_)
    ));
    assert_eq!(
        h.ledger.submit_calls()[0].location_code.as_deref(),
        Some("11-1-3")
    );
}

#[tokio::test(start_paused = true)]
async fn test_inspect_contents_navigates_without_transition() {
    let ledger = FakeLedger::with_locations(&["11-1-3"]);
    ledger.set_occupancy("11-1-3", 8);
    let location_id = ledger.location("11-1-3").location_id;
    let mut h = move_harness(ledger).await;
    h.drain();
    h.controller.on_decoded("LOC:11-1-3").await;

    h.controller
        .resolve_occupancy(OccupancyChoice::InspectContents)
        .await
        .unwrap();

    let events = h.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ScanEvent::OccupancyConflict { preview, more: 3, .. } if preview.len() == 5
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        ScanEvent::NavigateToInventory { location_id: id, status, .. }
            if *id == location_id && status == INSPECT_STATUS
    )));
    let state = h.controller.state().await;
    assert_eq!(state.move_step(), MoveStep::AwaitingLocation);
    assert!(state.pending_location().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_frames_ignored_while_prompt_open() {
    let ledger = FakeLedger::with_locations(&["11-1-3", "02-1-1"]);
    ledger.set_occupancy("11-1-3", 1);
    let h = move_harness(ledger).await;
    h.controller.on_decoded("LOC:11-1-3").await;
    tokio::time::advance(Duration::from_secs(5)).await;

    assert_eq!(
        h.controller.on_decoded("LOC:02-1-1").await,
        ScanOutcome::Ignored(IgnoreReason::AwaitingDecision)
    );
    assert_eq!(h.ledger.resolve_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_occupancy_failure_treated_as_clear() {
    let ledger = FakeLedger::with_locations(&["11-1-3"]);
    ledger.set_occupancy("11-1-3", 4);
    ledger.fail_occupancy();
    let h = move_harness(ledger).await;

    let outcome = h.controller.on_decoded("LOC:11-1-3").await;

    assert!(matches!(outcome, ScanOutcome::LocationLocked(_)));
    let state = h.controller.state().await;
    assert_eq!(state.move_step(), MoveStep::AwaitingBox);
    assert!(state.occupancy_prompt().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_location_is_reported_without_transition() {
    let mut h = move_harness(FakeLedger::with_locations(&["11-1-3"])).await;
    h.drain();

    let outcome = h.controller.on_decoded("LOC:99-9-9").await;

    assert_eq!(
        outcome,
        ScanOutcome::Failed(ScanError::UnknownLocation("99-9-9".to_string()))
    );
    assert_eq!(h.ledger.occupancy_calls(), 0);
    let state = h.controller.state().await;
    assert_eq!(state.move_step(), MoveStep::AwaitingLocation);
    assert!(state.pending_location().is_none());
    assert_eq!(
        h.notices(),
        vec![(NoticeLevel::Error, "Location not found: 99-9-9".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_resolve_without_prompt_is_an_error() {
    let h = move_harness(FakeLedger::with_locations(&["11-1-3"])).await;

    let err = h
        .controller
        .resolve_occupancy(OccupancyChoice::AssignAnyway)
        .await
        .unwrap_err();

    assert_eq!(err, ScanError::NoOccupancyPrompt);
}

#[tokio::test]
async fn test_guard_verdicts() {
    let ledger = std::sync::Arc::new(FakeLedger::with_locations(&["01-1-1", "01-1-2"]));
    ledger.set_occupancy("01-1-2", 3);
    let guard = OccupancyGuard::new(ledger.clone());

    assert!(matches!(
        guard.check_location("01-1-1").await.unwrap(),
        OccupancyVerdict::Clear { occupancy: Some(_), .. }
    ));

    let verdict = guard.check_location("01-1-2").await.unwrap();
    assert_eq!(verdict.location().location_code, "01-1-2");
    assert!(matches!(verdict, OccupancyVerdict::Occupied { ref occupancy, .. } if occupancy.active_box_count == 3));
}
