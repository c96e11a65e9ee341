//! Hold kinds, hold statuses and the in-memory hold record.
//!
//! Discriminant values match the seeded rows in the `hold_kinds` and
//! `hold_statuses` lookup tables (1-based).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Quantity};

// ---------------------------------------------------------------------------
// HoldKind
// ---------------------------------------------------------------------------

/// The consumer a hold belongs to.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldKind {
    BorrowingPool = 1,
    BorrowingRequest = 2,
    EventAllocation = 3,
    MaintenanceHold = 4,
    RepairHold = 5,
    IssueHold = 6,
    Outgoing = 7,
}

impl HoldKind {
    /// Resolve a database kind ID to the corresponding enum variant.
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::BorrowingPool),
            2 => Some(Self::BorrowingRequest),
            3 => Some(Self::EventAllocation),
            4 => Some(Self::MaintenanceHold),
            5 => Some(Self::RepairHold),
            6 => Some(Self::IssueHold),
            7 => Some(Self::Outgoing),
            _ => None,
        }
    }

    /// Machine name matching the `name` column in `hold_kinds`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BorrowingPool => "borrowing_pool",
            Self::BorrowingRequest => "borrowing_request",
            Self::EventAllocation => "event_allocation",
            Self::MaintenanceHold => "maintenance_hold",
            Self::RepairHold => "repair_hold",
            Self::IssueHold => "issue_hold",
            Self::Outgoing => "outgoing",
        }
    }

    /// Return the database kind ID.
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Whether an active hold of this kind is subtracted from `free_quantity`.
    ///
    /// Borrowing-request holds are carved out of the borrowing pool hold, which
    /// already left the free pool when borrowing was enabled.
    pub fn draws_from_free(&self) -> bool {
        !matches!(self, Self::BorrowingRequest)
    }

    /// Whether holds of this kind must carry an owning record reference.
    pub fn requires_owner(&self) -> bool {
        !matches!(self, Self::BorrowingPool)
    }
}

impl fmt::Display for HoldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// HoldStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a hold. Released and Consumed are terminal.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldStatus {
    Active = 1,
    Released = 2,
    Consumed = 3,
}

impl HoldStatus {
    /// Resolve a database status ID to the corresponding enum variant.
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Active),
            2 => Some(Self::Released),
            3 => Some(Self::Consumed),
            _ => None,
        }
    }

    /// Human-readable label matching the `label` column in `hold_statuses`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Released => "Released",
            Self::Consumed => "Consumed",
        }
    }

    /// Return the database status ID.
    pub fn id(&self) -> i16 {
        *self as i16
    }
}

impl fmt::Display for HoldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// HoldState
// ---------------------------------------------------------------------------

/// A hold as seen by the ledger engine.
///
/// `id` is `None` until the row has been inserted. `dirty` marks holds the
/// engine changed and the persistence layer must write back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoldState {
    pub id: Option<DbId>,
    pub kind: HoldKind,
    pub quantity: Quantity,
    pub consumed_quantity: Quantity,
    pub owner_ref: Option<DbId>,
    pub status: HoldStatus,
    #[serde(skip)]
    pub(crate) dirty: bool,
}

impl HoldState {
    /// Rebuild a hold from a persisted row.
    pub fn persisted(
        id: DbId,
        kind: HoldKind,
        quantity: Quantity,
        consumed_quantity: Quantity,
        owner_ref: Option<DbId>,
        status: HoldStatus,
    ) -> Self {
        Self {
            id: Some(id),
            kind,
            quantity,
            consumed_quantity,
            owner_ref,
            status,
            dirty: false,
        }
    }

    pub(crate) fn new_active(kind: HoldKind, quantity: Quantity, owner_ref: Option<DbId>) -> Self {
        Self {
            id: None,
            kind,
            quantity,
            consumed_quantity: 0,
            owner_ref,
            status: HoldStatus::Active,
            dirty: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == HoldStatus::Active
    }

    /// Whether this hold has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Short description used in blocking-error messages, e.g. `event_allocation#12 (3 units)`.
    pub fn describe(&self) -> String {
        match self.owner_ref {
            Some(owner) => format!("{}#{} ({} units)", self.kind, owner, self.quantity),
            None => format!("{} ({} units)", self.kind, self.quantity),
        }
    }
}
