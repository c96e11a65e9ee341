//! Maintenance, repair and issue ticket rows and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::tickets::TicketKind;
use stockroom_core::types::{DbId, Quantity, Timestamp};

/// A row from the `tickets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TicketRow {
    pub id: DbId,
    pub kind_id: i16,
    pub status_id: i16,
    pub asset_id: DbId,
    pub quantity: Quantity,
    pub description: Option<String>,
    pub hold_id: Option<DbId>,
    pub scrapped_quantity: Quantity,
    pub opened_by: Option<DbId>,
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for `POST /api/v1/tickets`.
#[derive(Debug, Deserialize)]
pub struct OpenTicket {
    pub kind: TicketKind,
    pub asset_id: DbId,
    pub quantity: Quantity,
    pub description: Option<String>,
}

/// DTO for `PUT /api/v1/tickets/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateTicket {
    pub quantity: Quantity,
}

/// DTO for `POST /api/v1/tickets/{id}/scrap`.
#[derive(Debug, Deserialize)]
pub struct ScrapTicket {
    pub scrapped_quantity: Quantity,
}
