//! In-memory ledger
//!
//! Behaves like the ledger service for the parts the controller relies on:
//! submissions sharing a `client_event_id` collapse into one stored event
//! (the repeat comes back flagged duplicate), MOVE to the box's current
//! location reports `changed = false`, undo reverses a stored event once.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;
use whs_common::api::{
    BoxDetails, EventCreate, EventType, ExceptionType, LedgerEvent, Location, LocationOccupancy, OccupiedBox,
    Product, StatsToday, UndoResult,
};
use whs_scan::ledger::{Ledger, LedgerError};

#[derive(Default)]
struct State {
    locations: HashMap<String, Location>,
    occupancy: HashMap<Uuid, u32>,
    occupancy_fails: bool,
    box_locations: HashMap<String, String>,
    box_details_fail: bool,
    by_token: HashMap<Uuid, LedgerEvent>,
    undone: Vec<Uuid>,
    submit_calls: Vec<EventCreate>,
    undo_calls: Vec<Uuid>,
    resolve_calls: usize,
    occupancy_calls: usize,
    stats_calls: usize,
    submit_failures: VecDeque<LedgerError>,
    undo_failures: VecDeque<LedgerError>,
    stats_fail: bool,
    submit_delay: Option<Duration>,
    next_warning: Option<(String, ExceptionType)>,
}

#[derive(Default)]
pub struct FakeLedger {
    state: Mutex<State>,
}

pub fn location(code: &str) -> Location {
    Location {
        location_id: Uuid::new_v4(),
        location_code: code.to_string(),
        zone: code.split('-').next().unwrap_or_default().to_string(),
        aisle: String::new(),
        rack: String::new(),
        shelf: String::new(),
        is_system_location: false,
    }
}

pub fn product() -> Product {
    Product {
        product_id: None,
        brand: "Vina Rosa".to_string(),
        name: "Cabernet".to_string(),
        size: Some("750ml".to_string()),
    }
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the given location codes, all empty
    pub fn with_locations(codes: &[&str]) -> Self {
        let ledger = Self::new();
        for code in codes {
            ledger.add_location(code);
        }
        ledger
    }

    pub fn add_location(&self, code: &str) -> Location {
        let loc = location(code);
        self.state
            .lock()
            .unwrap()
            .locations
            .insert(code.to_string(), loc.clone());
        loc
    }

    pub fn location(&self, code: &str) -> Location {
        self.state.lock().unwrap().locations[code].clone()
    }

    pub fn set_occupancy(&self, code: &str, count: u32) {
        let mut state = self.state.lock().unwrap();
        let id = state.locations[code].location_id;
        state.occupancy.insert(id, count);
    }

    pub fn fail_occupancy(&self) {
        self.state.lock().unwrap().occupancy_fails = true;
    }

    pub fn fail_box_details(&self) {
        self.state.lock().unwrap().box_details_fail = true;
    }

    pub fn fail_stats(&self, fail: bool) {
        self.state.lock().unwrap().stats_fail = fail;
    }

    /// Next `submit_event` call fails with `err`
    pub fn fail_next_submit(&self, err: LedgerError) {
        self.state.lock().unwrap().submit_failures.push_back(err);
    }

    pub fn fail_next_undo(&self, err: LedgerError) {
        self.state.lock().unwrap().undo_failures.push_back(err);
    }

    /// Next stored event carries this exception verdict
    pub fn flag_next_event(&self, warning: &str, exception_type: ExceptionType) {
        self.state.lock().unwrap().next_warning = Some((warning.to_string(), exception_type));
    }

    /// Each submission waits this long before answering
    pub fn set_submit_delay(&self, delay: Duration) {
        self.state.lock().unwrap().submit_delay = Some(delay);
    }

    pub fn place_box(&self, box_id: &str, code: &str) {
        self.state
            .lock()
            .unwrap()
            .box_locations
            .insert(box_id.to_string(), code.to_string());
    }

    pub fn submit_calls(&self) -> Vec<EventCreate> {
        self.state.lock().unwrap().submit_calls.clone()
    }

    /// Distinct events stored (one per idempotency token)
    pub fn stored_event_count(&self) -> usize {
        self.state.lock().unwrap().by_token.len()
    }

    pub fn undo_calls(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().undo_calls.clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.state.lock().unwrap().resolve_calls
    }

    pub fn occupancy_calls(&self) -> usize {
        self.state.lock().unwrap().occupancy_calls
    }

    pub fn stats_calls(&self) -> usize {
        self.state.lock().unwrap().stats_calls
    }

    pub fn box_location(&self, box_id: &str) -> Option<String> {
        self.state.lock().unwrap().box_locations.get(box_id).cloned()
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn submit_event(&self, request: &EventCreate) -> Result<LedgerEvent, LedgerError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.submit_calls.push(request.clone());
            state.submit_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.submit_failures.pop_front() {
            return Err(err);
        }

        if let Some(existing) = state.by_token.get(&request.client_event_id) {
            let mut repeat = existing.clone();
            repeat.is_duplicate = true;
            repeat.message = "Event already processed".to_string();
            return Ok(repeat);
        }

        let (message, changed) = match request.event_type {
            EventType::In => {
                state
                    .box_locations
                    .insert(request.box_id.clone(), "RECEIVING".to_string());
                ("Box received".to_string(), true)
            }
            EventType::Out => {
                state.box_locations.remove(&request.box_id);
                ("Box shipped".to_string(), true)
            }
            EventType::Move => {
                let target = request.location_code.clone().unwrap_or_default();
                let changed = state.box_locations.get(&request.box_id) != Some(&target);
                state.box_locations.insert(request.box_id.clone(), target.clone());
                (format!("Box moved to {}", target), changed)
            }
        };

        let flagged = state.next_warning.take();
        let event = LedgerEvent {
            event_id: Uuid::new_v4(),
            success: true,
            message,
            warning: flagged.as_ref().map(|(warning, _)| warning.clone()),
            exception_type: flagged.map(|(_, exception_type)| exception_type),
            is_duplicate: false,
            changed: Some(changed),
            box_id: request.box_id.clone(),
            product: product(),
            lot_code: Some("L-2024-07".to_string()),
        };
        state.by_token.insert(request.client_event_id, event.clone());
        Ok(event)
    }

    async fn undo_event(&self, event_id: Uuid) -> Result<UndoResult, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.undo_calls.push(event_id);
        if let Some(err) = state.undo_failures.pop_front() {
            return Err(err);
        }
        if state.undone.contains(&event_id) {
            return Err(LedgerError::Rejected {
                status: 400,
                detail: "Event already undone".to_string(),
            });
        }
        let Some(event) = state.by_token.values().find(|e| e.event_id == event_id).cloned() else {
            return Err(LedgerError::NotFound("Event not found".to_string()));
        };
        state.undone.push(event_id);
        Ok(UndoResult {
            success: true,
            message: "Event undone".to_string(),
            box_id: event.box_id,
            product: event.product,
            lot_code: event.lot_code,
            status: "IN_STOCK".to_string(),
            current_location: None,
        })
    }

    async fn resolve_location(&self, code: &str) -> Result<Option<Location>, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.resolve_calls += 1;
        Ok(state.locations.get(code).cloned())
    }

    async fn get_occupancy(&self, location_id: Uuid) -> Result<LocationOccupancy, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.occupancy_calls += 1;
        if state.occupancy_fails {
            return Err(LedgerError::Rejected {
                status: 500,
                detail: "Internal Server Error".to_string(),
            });
        }
        let count = state.occupancy.get(&location_id).copied().unwrap_or(0);
        let code = state
            .locations
            .values()
            .find(|l| l.location_id == location_id)
            .map(|l| l.location_code.clone())
            .unwrap_or_default();
        Ok(LocationOccupancy {
            location_id,
            location_code: code,
            active_box_count: count,
            boxes: (0..count)
                .map(|i| OccupiedBox {
                    box_id: format!("BX-OCC-{}", i),
                    product_name: product().display_name(),
                    size: product().size,
                    lot_code: None,
                    last_moved_at: None,
                })
                .collect(),
        })
    }

    async fn get_box_details(&self, box_id: &str) -> Result<Option<BoxDetails>, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.box_details_fail {
            return Err(LedgerError::Transport("connection reset".to_string()));
        }
        Ok(Some(BoxDetails {
            box_id: box_id.to_string(),
            product: product(),
            lot_code: Some("L-2024-07".to_string()),
            status: "IN_STOCK".to_string(),
            current_location: state
                .box_locations
                .get(box_id)
                .and_then(|code| state.locations.get(code))
                .cloned(),
            events: Vec::new(),
        }))
    }

    async fn stats_today(&self) -> Result<StatsToday, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.stats_calls += 1;
        if state.stats_fail {
            return Err(LedgerError::Transport("connection refused".to_string()));
        }
        Ok(StatsToday {
            received_today: state.by_token.len() as u32,
            to_put_away: 1,
            ..StatsToday::default()
        })
    }
}
