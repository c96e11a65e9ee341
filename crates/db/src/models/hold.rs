//! Hold rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::error::CoreError;
use stockroom_core::ledger::{HoldKind, HoldState, HoldStatus};
use stockroom_core::types::{DbId, Quantity, Timestamp};

/// A row from the `holds` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct HoldRow {
    pub id: DbId,
    pub asset_id: DbId,
    pub kind_id: i16,
    pub status_id: i16,
    pub quantity: Quantity,
    pub consumed_quantity: Quantity,
    pub owner_ref: Option<DbId>,
    pub settled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HoldRow {
    pub fn kind(&self) -> Result<HoldKind, CoreError> {
        HoldKind::from_id(self.kind_id).ok_or_else(|| {
            CoreError::Internal(format!("hold {} has unknown kind_id {}", self.id, self.kind_id))
        })
    }

    pub fn status(&self) -> Result<HoldStatus, CoreError> {
        HoldStatus::from_id(self.status_id).ok_or_else(|| {
            CoreError::Internal(format!(
                "hold {} has unknown status_id {}",
                self.id, self.status_id
            ))
        })
    }

    /// Convert to the engine's representation.
    pub fn to_state(&self) -> Result<HoldState, CoreError> {
        Ok(HoldState::persisted(
            self.id,
            self.kind()?,
            self.quantity,
            self.consumed_quantity,
            self.owner_ref,
            self.status()?,
        ))
    }
}

/// Hold as shown to API consumers, with kind and status resolved to names.
#[derive(Debug, Clone, Serialize)]
pub struct HoldView {
    pub id: DbId,
    pub kind: HoldKind,
    pub quantity: Quantity,
    pub consumed_quantity: Quantity,
    pub owner_ref: Option<DbId>,
    pub status: HoldStatus,
    pub created_at: Timestamp,
    pub settled_at: Option<Timestamp>,
}

impl TryFrom<HoldRow> for HoldView {
    type Error = CoreError;

    fn try_from(row: HoldRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            kind: row.kind()?,
            status: row.status()?,
            quantity: row.quantity,
            consumed_quantity: row.consumed_quantity,
            owner_ref: row.owner_ref,
            created_at: row.created_at,
            settled_at: row.settled_at,
        })
    }
}

/// Query parameters for `GET /api/v1/assets/{id}/holds`.
#[derive(Debug, Default, Deserialize)]
pub struct HoldListQuery {
    /// Only return Active holds.
    #[serde(default)]
    pub active: bool,
    /// Restrict active holds to one kind.
    pub kind: Option<HoldKind>,
}

/// Query parameters for `GET /api/v1/holds`.
#[derive(Debug, Deserialize)]
pub struct HoldOwnerQuery {
    pub kind: HoldKind,
    pub owner_ref: DbId,
}
