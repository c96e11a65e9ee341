//! Ledger rule violations.
//!
//! Every variant is a synchronous validation failure. None of them means the
//! stored ledger is corrupt; invariant breaches are reported separately as
//! [`CoreError::Internal`](crate::error::CoreError::Internal).

use serde::Serialize;

use crate::ledger::hold::{HoldKind, HoldStatus};
use crate::types::{DbId, Quantity};

/// A consumer claim that blocks a destructive operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blocker {
    pub kind: HoldKind,
    pub owner_ref: Option<DbId>,
    pub quantity: Quantity,
}

impl Blocker {
    pub fn describe(&self) -> String {
        match self.owner_ref {
            Some(owner) => format!("{}#{} ({} units)", self.kind, owner, self.quantity),
            None => format!("{} ({} units)", self.kind, self.quantity),
        }
    }
}

fn list(blockers: &[Blocker]) -> String {
    blockers
        .iter()
        .map(Blocker::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Invalid quantity {quantity}: {reason}")]
    InvalidQuantity {
        quantity: Quantity,
        reason: &'static str,
    },

    #[error(
        "Insufficient quantity for asset {asset_id}: {available} available, {requested} requested"
    )]
    InsufficientFree {
        asset_id: DbId,
        available: Quantity,
        requested: Quantity,
    },

    #[error("Hold {hold_id} is {status} and can no longer change")]
    HoldNotActive { hold_id: DbId, status: HoldStatus },

    #[error(
        "Borrowing for asset {asset_id} cannot be disabled while requests are outstanding: {}",
        list(.blockers)
    )]
    RequestsStillPending {
        asset_id: DbId,
        blockers: Vec<Blocker>,
    },

    #[error(
        "Borrowing pool for asset {asset_id} cannot shrink to {requested}: {outstanding} units are lent out"
    )]
    BelowOutstanding {
        asset_id: DbId,
        outstanding: Quantity,
        requested: Quantity,
    },

    #[error("Asset {asset_id} still has active holds: {}", list(.blockers))]
    HasActiveHolds {
        asset_id: DbId,
        blockers: Vec<Blocker>,
    },

    #[error("Borrowing is not enabled for asset {asset_id}")]
    BorrowingDisabled { asset_id: DbId },

    #[error("Borrowing is already enabled for asset {asset_id}")]
    PoolAlreadyEnabled { asset_id: DbId },

    #[error("A {kind} hold must name the record that owns it")]
    OwnerRequired { kind: HoldKind },
}

impl LedgerError {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidQuantity { .. } => "INVALID_QUANTITY",
            Self::InsufficientFree { .. } => "INSUFFICIENT_FREE",
            Self::HoldNotActive { .. } => "HOLD_NOT_ACTIVE",
            Self::RequestsStillPending { .. } => "REQUESTS_STILL_PENDING",
            Self::BelowOutstanding { .. } => "BELOW_OUTSTANDING",
            Self::HasActiveHolds { .. } => "HAS_ACTIVE_HOLDS",
            Self::BorrowingDisabled { .. } => "BORROWING_DISABLED",
            Self::PoolAlreadyEnabled { .. } => "POOL_ALREADY_ENABLED",
            Self::OwnerRequired { .. } => "OWNER_REQUIRED",
        }
    }

    /// Structured context for error responses (`available`, `requested`, blockers).
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::InsufficientFree {
                asset_id,
                available,
                requested,
            } => serde_json::json!({
                "asset_id": asset_id,
                "available": available,
                "requested": requested,
            }),
            Self::BelowOutstanding {
                asset_id,
                outstanding,
                requested,
            } => serde_json::json!({
                "asset_id": asset_id,
                "outstanding": outstanding,
                "requested": requested,
            }),
            Self::RequestsStillPending { asset_id, blockers }
            | Self::HasActiveHolds { asset_id, blockers } => serde_json::json!({
                "asset_id": asset_id,
                "blockers": blockers,
            }),
            Self::HoldNotActive { hold_id, status } => serde_json::json!({
                "hold_id": hold_id,
                "status": status,
            }),
            Self::BorrowingDisabled { asset_id } | Self::PoolAlreadyEnabled { asset_id } => {
                serde_json::json!({ "asset_id": asset_id })
            }
            Self::OwnerRequired { kind } => serde_json::json!({ "kind": kind }),
            Self::NotFound { .. } | Self::InvalidQuantity { .. } => serde_json::Value::Null,
        }
    }
}
