//! Event allocation rules.
//!
//! Each allocation line is backed by one event-allocation hold. On completion
//! the caller reports how many units came back per line; the rest are
//! consumed.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ledger::LedgerError;
use crate::types::{DbId, Quantity};

/// Event status. Discriminants match `event_statuses`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Planned = 1,
    Completed = 2,
    Cancelled = 3,
}

impl EventStatus {
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Planned),
            2 => Some(Self::Completed),
            3 => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Planned => "Planned",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn id(&self) -> i16 {
        *self as i16
    }
}

/// Allocations can only change while the event is still planned.
pub fn ensure_planned(status: EventStatus) -> Result<(), CoreError> {
    if status == EventStatus::Planned {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Event is {} and its allocations can no longer change",
            status.label()
        )))
    }
}

/// Requested allocation for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub asset_id: DbId,
    pub quantity: Quantity,
    /// Unit cost in cents at allocation time, kept for later costing.
    pub unit_cost_cents: Option<i64>,
}

pub fn validate_lines(lines: &[AllocationLine]) -> Result<(), CoreError> {
    if lines.is_empty() {
        return Err(CoreError::Validation(
            "An allocation needs at least one line".into(),
        ));
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity {
                quantity: line.quantity,
                reason: "allocated quantity must be positive",
            }
            .into());
        }
        if line.unit_cost_cents.is_some_and(|c| c < 0) {
            return Err(CoreError::Validation(format!(
                "Unit cost for asset {} cannot be negative",
                line.asset_id
            )));
        }
    }
    Ok(())
}

/// Units consumed by the event for a line, given what came back.
pub fn consumed_on_completion(
    allocated: Quantity,
    returned: Quantity,
) -> Result<Quantity, CoreError> {
    if returned < 0 || returned > allocated {
        return Err(CoreError::Validation(format!(
            "Returned quantity {returned} must be between 0 and the allocated {allocated}"
        )));
    }
    Ok(allocated - returned)
}
