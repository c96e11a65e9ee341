//! Event and event allocation rows and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::event_allocation::AllocationLine;
use stockroom_core::types::{DbId, Quantity, Timestamp};

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventRow {
    pub id: DbId,
    pub name: String,
    pub status_id: i16,
    pub starts_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `event_allocations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventAllocationRow {
    pub id: DbId,
    pub event_id: DbId,
    pub asset_id: DbId,
    pub quantity: Quantity,
    pub unit_cost_cents: Option<i64>,
    pub returned_quantity: Option<Quantity>,
    pub hold_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: EventRow,
    pub allocations: Vec<EventAllocationRow>,
}

/// DTO for `POST /api/v1/events`.
#[derive(Debug, Deserialize)]
pub struct CreateEvent {
    pub name: String,
    pub starts_at: Option<Timestamp>,
}

/// DTO for `POST /api/v1/events/{id}/allocations`.
#[derive(Debug, Deserialize)]
pub struct AllocateLines {
    pub lines: Vec<AllocationLine>,
}

/// DTO for `PUT /api/v1/events/{id}/allocations/{line_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateAllocation {
    pub quantity: Quantity,
}

/// Units of one allocation that came back after the event.
#[derive(Debug, Clone, Deserialize)]
pub struct LineReturn {
    pub line_id: DbId,
    pub returned_quantity: Quantity,
}

/// DTO for `POST /api/v1/events/{id}/complete`.
///
/// Every allocation line must be listed once.
#[derive(Debug, Default, Deserialize)]
pub struct CompleteEvent {
    #[serde(default)]
    pub returns: Vec<LineReturn>,
}
