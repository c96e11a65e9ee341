//! Asset ledger rows and the reader view.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::ledger::{HoldKind, LedgerState};
use stockroom_core::types::{DbId, Quantity, Timestamp};

use super::hold::HoldView;

/// A row from the `asset_ledgers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssetLedgerRow {
    pub id: DbId,
    pub name: String,
    pub total_owned: Quantity,
    pub free_quantity: Quantity,
    pub borrowing_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for `POST /api/v1/assets`.
#[derive(Debug, Deserialize)]
pub struct CreateAsset {
    pub name: String,
    #[serde(default)]
    pub total_owned: Quantity,
}

/// DTO for `POST /api/v1/assets/{id}/intake`.
#[derive(Debug, Deserialize)]
pub struct AssetIntake {
    pub quantity: Quantity,
}

/// DTO for `PUT /api/v1/assets/{id}/borrowing`.
///
/// `enabled: true` with no active pool creates one of `pool_size`; with an
/// active pool it resizes it. `enabled: false` releases the pool.
#[derive(Debug, Deserialize)]
pub struct SetBorrowing {
    pub enabled: bool,
    pub pool_size: Option<Quantity>,
}

/// Ledger figures plus the holds currently claiming units.
#[derive(Debug, Clone, Serialize)]
pub struct AssetLedgerView {
    pub asset_id: DbId,
    pub name: String,
    pub total_owned: Quantity,
    pub free_quantity: Quantity,
    pub borrowing_enabled: bool,
    pub borrowing_pool: Quantity,
    pub available_to_borrow: Quantity,
    pub holds: Vec<HoldView>,
}

impl AssetLedgerView {
    pub fn new(row: AssetLedgerRow, holds: Vec<HoldView>) -> Self {
        let pool: Quantity = holds
            .iter()
            .filter(|h| h.kind == HoldKind::BorrowingPool)
            .map(|h| h.quantity)
            .sum();
        let lent: Quantity = holds
            .iter()
            .filter(|h| h.kind == HoldKind::BorrowingRequest)
            .map(|h| h.quantity)
            .sum();
        Self {
            asset_id: row.id,
            name: row.name,
            total_owned: row.total_owned,
            free_quantity: row.free_quantity,
            borrowing_enabled: row.borrowing_enabled,
            borrowing_pool: pool,
            available_to_borrow: pool - lent,
            holds,
        }
    }
}

/// Compact figures returned by the coordinator after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerFigures {
    pub asset_id: DbId,
    pub total_owned: Quantity,
    pub free_quantity: Quantity,
    pub borrowing_enabled: bool,
    pub available_to_borrow: Quantity,
}

impl From<&LedgerState> for LedgerFigures {
    fn from(state: &LedgerState) -> Self {
        Self {
            asset_id: state.asset_id(),
            total_owned: state.total_owned(),
            free_quantity: state.free_quantity(),
            borrowing_enabled: state.borrowing_enabled(),
            available_to_borrow: state.available_to_borrow(),
        }
    }
}
