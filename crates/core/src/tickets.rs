//! Maintenance, repair and issue tickets.
//!
//! Each ticket kind maps to its own hold kind. Opening reserves, resolving
//! releases, scrapping consumes.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ledger::HoldKind;
use crate::types::Quantity;

#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Maintenance = 1,
    Repair = 2,
    Issue = 3,
}

impl TicketKind {
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Maintenance),
            2 => Some(Self::Repair),
            3 => Some(Self::Issue),
            _ => None,
        }
    }

    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// The hold kind backing tickets of this kind.
    pub fn hold_kind(&self) -> HoldKind {
        match self {
            Self::Maintenance => HoldKind::MaintenanceHold,
            Self::Repair => HoldKind::RepairHold,
            Self::Issue => HoldKind::IssueHold,
        }
    }
}

#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Scheduled = 1,
    InProgress = 2,
    Completed = 3,
    Scrapped = 4,
}

impl TicketStatus {
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Scheduled),
            2 => Some(Self::InProgress),
            3 => Some(Self::Completed),
            4 => Some(Self::Scrapped),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Scrapped => "Scrapped",
        }
    }

    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Open tickets still hold their units.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Scheduled, Self::InProgress) => true,
            (from, Self::Completed | Self::Scrapped) => from.is_open(),
            _ => false,
        }
    }
}

pub fn validate_transition(from: TicketStatus, to: TicketStatus) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Ticket is {} and cannot become {}",
            from.label(),
            to.label()
        )))
    }
}

/// Editing or deleting requires the ticket to still be open.
pub fn ensure_open(status: TicketStatus) -> Result<(), CoreError> {
    if status.is_open() {
        Ok(())
    } else {
        Err(CoreError::Conflict(format!(
            "Ticket is {} and can no longer change",
            status.label()
        )))
    }
}

/// Scrapping writes off between one unit and everything the ticket holds.
pub fn validate_scrap(held: Quantity, scrapped: Quantity) -> Result<(), CoreError> {
    if scrapped <= 0 || scrapped > held {
        return Err(CoreError::Validation(format!(
            "Scrapped quantity {scrapped} must be between 1 and the held {held}"
        )));
    }
    Ok(())
}
