//! Outgoing (permanent withdrawal) rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::types::{DbId, Quantity, Timestamp};

/// A row from the `outgoing_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OutgoingRow {
    pub id: DbId,
    pub asset_id: DbId,
    pub quantity: Quantity,
    pub reason: String,
    pub recipient: Option<String>,
    pub hold_id: Option<DbId>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for `POST /api/v1/outgoing`.
#[derive(Debug, Deserialize)]
pub struct CreateOutgoing {
    pub asset_id: DbId,
    pub quantity: Quantity,
    pub reason: String,
    pub recipient: Option<String>,
}
