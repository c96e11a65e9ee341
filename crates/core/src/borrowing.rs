//! Borrowing request lifecycle rules.
//!
//! A request is a wish list until it is approved; only approval creates
//! borrowing-request holds. Status transitions:
//!
//! ```text
//! Pending -> Approved -> Returned
//!         -> Rejected
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ledger::LedgerError;
use crate::types::{DbId, Quantity, Timestamp};

/// Longest accepted rejection reason.
pub const MAX_REASON_LEN: usize = 1000;

/// Borrowing request status. Discriminants match `borrowing_request_statuses`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BorrowingStatus {
    Pending = 1,
    Approved = 2,
    Rejected = 3,
    Returned = 4,
}

impl BorrowingStatus {
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Pending),
            2 => Some(Self::Approved),
            3 => Some(Self::Rejected),
            4 => Some(Self::Returned),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Returned => "Returned",
        }
    }

    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Returned)
        )
    }
}

/// Fail with `Conflict` unless `from -> to` is an allowed transition.
pub fn validate_transition(from: BorrowingStatus, to: BorrowingStatus) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Borrowing request is {} and cannot become {}",
            from.label(),
            to.label()
        )))
    }
}

/// One requested asset and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowLine {
    pub asset_id: DbId,
    pub quantity: Quantity,
}

/// Lines must be non-empty, positive, and list each asset at most once.
pub fn validate_lines(lines: &[BorrowLine]) -> Result<(), CoreError> {
    if lines.is_empty() {
        return Err(CoreError::Validation(
            "A borrowing request needs at least one line".into(),
        ));
    }
    let mut seen = HashSet::new();
    for line in lines {
        if line.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity {
                quantity: line.quantity,
                reason: "borrowed quantity must be positive",
            }
            .into());
        }
        if !seen.insert(line.asset_id) {
            return Err(CoreError::Validation(format!(
                "Asset {} is listed more than once",
                line.asset_id
            )));
        }
    }
    Ok(())
}

/// The expected return must not precede collection.
pub fn validate_schedule(
    collect_at: Option<Timestamp>,
    expected_return_at: Option<Timestamp>,
) -> Result<(), CoreError> {
    match (collect_at, expected_return_at) {
        (Some(collect), Some(ret)) if ret < collect => Err(CoreError::Validation(
            "expected_return_at must not be before collect_at".into(),
        )),
        _ => Ok(()),
    }
}

/// Units reported lost on return must fit within the borrowed quantity.
pub fn validate_lost(borrowed: Quantity, lost: Quantity) -> Result<(), CoreError> {
    if lost < 0 || lost > borrowed {
        return Err(CoreError::Validation(format!(
            "Lost quantity {lost} must be between 0 and the borrowed {borrowed}"
        )));
    }
    Ok(())
}

pub fn validate_rejection_reason(reason: Option<&str>) -> Result<(), CoreError> {
    if reason.is_some_and(|r| r.len() > MAX_REASON_LEN) {
        return Err(CoreError::Validation(format!(
            "Rejection reason must be at most {MAX_REASON_LEN} characters"
        )));
    }
    Ok(())
}
