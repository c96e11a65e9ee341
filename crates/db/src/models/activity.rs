//! Activity log rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::types::{DbId, Timestamp};

/// A row from the `activity_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityLogRow {
    pub id: DbId,
    pub asset_id: DbId,
    pub action: String,
    pub hold_kind_id: Option<i16>,
    pub owner_ref: Option<DbId>,
    pub field: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub actor_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// Insert payload for one activity row.
#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub asset_id: DbId,
    pub action: String,
    pub hold_kind_id: Option<i16>,
    pub owner_ref: Option<DbId>,
    pub field: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub actor_id: Option<DbId>,
}

/// Query parameters for `GET /api/v1/assets/{id}/activity`.
#[derive(Debug, Default, Deserialize)]
pub struct ActivityListQuery {
    /// Maximum number of results. Defaults to 50, capped at 200.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
