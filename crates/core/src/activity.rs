//! Before/after records emitted by ledger operations.
//!
//! The ledger engine records one [`ActivityChange`] per field it touches. They
//! travel with the committed result and are handed to the activity notifier
//! afterwards; they never take part in the transaction itself.

use serde::Serialize;

use crate::ledger::HoldKind;
use crate::types::DbId;

/// Event type published for every ledger field change.
pub const EVENT_QUANTITY_CHANGED: &str = "asset.quantity_changed";

/// Ledger fields that produce activity records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerField {
    TotalOwned,
    FreeQuantity,
    BorrowingEnabled,
    BorrowingPool,
    AvailableToBorrow,
}

impl LedgerField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalOwned => "total_owned",
            Self::FreeQuantity => "free_quantity",
            Self::BorrowingEnabled => "borrowing_enabled",
            Self::BorrowingPool => "borrowing_pool",
            Self::AvailableToBorrow => "available_to_borrow",
        }
    }
}

/// The ledger primitive that produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerAction {
    Register,
    Intake,
    Reserve,
    Release,
    Adjust,
    Consume,
}

impl LedgerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Intake => "intake",
            Self::Reserve => "reserve",
            Self::Release => "release",
            Self::Adjust => "adjust",
            Self::Consume => "consume",
        }
    }
}

/// A single field transition on one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityChange {
    pub asset_id: DbId,
    pub action: LedgerAction,
    pub hold_kind: Option<HoldKind>,
    pub owner_ref: Option<DbId>,
    pub field: LedgerField,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
}

impl ActivityChange {
    /// JSON payload carried on the event bus.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "asset_id": self.asset_id,
            "action": self.action,
            "hold_kind": self.hold_kind,
            "owner_ref": self.owner_ref,
            "field": self.field,
            "old_value": self.old_value,
            "new_value": self.new_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_uses_snake_case_names() {
        let change = ActivityChange {
            asset_id: 9,
            action: LedgerAction::Reserve,
            hold_kind: Some(HoldKind::MaintenanceHold),
            owner_ref: Some(4),
            field: LedgerField::FreeQuantity,
            old_value: 15.into(),
            new_value: 11.into(),
        };
        let payload = change.to_payload();
        assert_eq!(payload["action"], "reserve");
        assert_eq!(payload["hold_kind"], "maintenance_hold");
        assert_eq!(payload["field"], "free_quantity");
        assert_eq!(payload["old_value"], 15);
        assert_eq!(payload["new_value"], 11);
    }

    #[test]
    fn field_names_match_serde_names() {
        for field in [
            LedgerField::TotalOwned,
            LedgerField::FreeQuantity,
            LedgerField::BorrowingEnabled,
            LedgerField::BorrowingPool,
            LedgerField::AvailableToBorrow,
        ] {
            assert_eq!(serde_json::json!(field), field.as_str());
        }
    }
}
