//! Occupancy guard
//!
//! Before a MOVE locks a location, the location is resolved and its current
//! contents fetched. Resolution failure stops the workflow; an occupancy
//! query failure does not (the location is treated as clear). A non-empty
//! location suspends the transition until the operator decides.

use crate::error::{Result, ScanError};
use crate::ledger::Ledger;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use whs_common::api::{Location, LocationOccupancy, OccupiedBox};

/// Boxes listed in the occupancy prompt before the overflow count
pub const PREVIEW_LIMIT: usize = 5;

/// Inventory status filter used by the "inspect contents" resolution
pub const INSPECT_STATUS: &str = "IN_STOCK";

/// Guard verdict for a scanned location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccupancyVerdict {
    /// Lock immediately. `occupancy` is `None` when the query failed.
    Clear {
        location: Location,
        occupancy: Option<LocationOccupancy>,
    },
    /// Operator must decide
    Occupied {
        location: Location,
        occupancy: LocationOccupancy,
    },
}

impl OccupancyVerdict {
    pub fn location(&self) -> &Location {
        match self {
            OccupancyVerdict::Clear { location, .. } | OccupancyVerdict::Occupied { location, .. } => {
                location
            }
        }
    }
}

/// Operator resolution of an occupancy conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyChoice {
    /// Lock the location anyway
    AssignAnyway,
    /// Close the prompt and rescan
    ScanDifferent,
    /// Leave to view the location's full contents
    InspectContents,
}

/// Open occupancy conflict awaiting the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyPrompt {
    pub location: Location,
    pub occupancy: LocationOccupancy,
}

impl OccupancyPrompt {
    pub fn new(location: Location, occupancy: LocationOccupancy) -> Self {
        Self {
            location,
            occupancy,
        }
    }

    /// First boxes shown in the prompt
    pub fn preview(&self) -> &[OccupiedBox] {
        let end = self.occupancy.boxes.len().min(PREVIEW_LIMIT);
        &self.occupancy.boxes[..end]
    }

    /// Boxes beyond the preview ("N more")
    pub fn more(&self) -> usize {
        (self.occupancy.active_box_count as usize).saturating_sub(self.preview().len())
    }

    pub fn location_id(&self) -> Uuid {
        self.location.location_id
    }
}

#[derive(Clone)]
pub struct OccupancyGuard {
    ledger: Arc<dyn Ledger>,
}

impl OccupancyGuard {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Resolve a scanned location code and judge its occupancy
    pub async fn check_location(&self, code: &str) -> Result<OccupancyVerdict> {
        let location = self
            .ledger
            .resolve_location(code)
            .await
            .map_err(ScanError::LocationLookup)?
            .ok_or_else(|| ScanError::UnknownLocation(code.to_string()))?;

        match self.ledger.get_occupancy(location.location_id).await {
            Ok(occupancy) if occupancy.is_empty() => {
                debug!(location_code = %code, "Location is empty");
                Ok(OccupancyVerdict::Clear {
                    location,
                    occupancy: Some(occupancy),
                })
            }
            Ok(occupancy) => {
                debug!(
                    location_code = %code,
                    active_box_count = occupancy.active_box_count,
                    "Location is occupied"
                );
                Ok(OccupancyVerdict::Occupied {
                    location,
                    occupancy,
                })
            }
            Err(e) => {
                warn!(location_code = %code, error = %e, "Occupancy check failed, treating location as clear");
                Ok(OccupancyVerdict::Clear {
                    location,
                    occupancy: None,
                })
            }
        }
    }
}
