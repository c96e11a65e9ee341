//! In-memory ledger snapshot for a single asset.
//!
//! [`LedgerState`] holds an asset's ledger row together with the holds that
//! can affect it. The four primitives (`reserve`, `release`, `adjust`,
//! `consume`) validate completely before touching any field, so a failed call
//! leaves the snapshot exactly as it was. Successful calls mark rows dirty and
//! record [`ActivityChange`]s; the persistence layer writes dirty rows back
//! while the asset row is still locked.

use crate::activity::{ActivityChange, LedgerAction, LedgerField};
use crate::ledger::error::{Blocker, LedgerError};
use crate::ledger::hold::{HoldKind, HoldState, HoldStatus};
use crate::types::{DbId, Quantity};

/// Position of a hold inside a [`LedgerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoldSlot(usize);

impl HoldSlot {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Observable figures captured before an operation to diff against afterwards.
#[derive(Debug, Clone, Copy)]
struct Observed {
    total_owned: Quantity,
    free_quantity: Quantity,
    borrowing_enabled: bool,
    pool: Quantity,
    available_to_borrow: Quantity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    asset_id: DbId,
    total_owned: Quantity,
    free_quantity: Quantity,
    borrowing_enabled: bool,
    holds: Vec<HoldState>,
    row_dirty: bool,
    changes: Vec<ActivityChange>,
}

impl LedgerState {
    /// Start a brand-new ledger: everything owned is free, no holds.
    pub fn register(asset_id: DbId, total_owned: Quantity) -> Result<Self, LedgerError> {
        if total_owned < 0 {
            return Err(LedgerError::InvalidQuantity {
                quantity: total_owned,
                reason: "total owned cannot be negative",
            });
        }
        let mut state = Self::load(asset_id, total_owned, total_owned, false, Vec::new());
        state.row_dirty = true;
        state.changes.push(ActivityChange {
            asset_id,
            action: LedgerAction::Register,
            hold_kind: None,
            owner_ref: None,
            field: LedgerField::TotalOwned,
            old_value: 0.into(),
            new_value: total_owned.into(),
        });
        Ok(state)
    }

    /// Rebuild a snapshot from persisted rows.
    ///
    /// `holds` must contain every Active hold of the asset. Settled holds may
    /// be included when an operation targets them.
    pub fn load(
        asset_id: DbId,
        total_owned: Quantity,
        free_quantity: Quantity,
        borrowing_enabled: bool,
        holds: Vec<HoldState>,
    ) -> Self {
        Self {
            asset_id,
            total_owned,
            free_quantity,
            borrowing_enabled,
            holds,
            row_dirty: false,
            changes: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn asset_id(&self) -> DbId {
        self.asset_id
    }

    pub fn total_owned(&self) -> Quantity {
        self.total_owned
    }

    pub fn free_quantity(&self) -> Quantity {
        self.free_quantity
    }

    pub fn borrowing_enabled(&self) -> bool {
        self.borrowing_enabled
    }

    pub fn holds(&self) -> &[HoldState] {
        &self.holds
    }

    pub fn hold(&self, slot: HoldSlot) -> &HoldState {
        &self.holds[slot.0]
    }

    pub fn active_holds(&self) -> impl Iterator<Item = &HoldState> {
        self.holds.iter().filter(|h| h.is_active())
    }

    /// Sum of active hold quantities, optionally restricted to one kind.
    pub fn sum_active(&self, kind: Option<HoldKind>) -> Quantity {
        self.active_holds()
            .filter(|h| kind.map_or(true, |k| h.kind == k))
            .map(|h| h.quantity)
            .sum()
    }

    /// Slot of the active borrowing pool hold, if borrowing is enabled.
    pub fn pool_slot(&self) -> Option<HoldSlot> {
        self.holds
            .iter()
            .position(|h| h.kind == HoldKind::BorrowingPool && h.is_active())
            .map(HoldSlot)
    }

    pub fn pool_quantity(&self) -> Quantity {
        self.pool_slot().map_or(0, |slot| self.holds[slot.0].quantity)
    }

    /// Units currently lent out through approved borrowing requests.
    pub fn outstanding_borrowed(&self) -> Quantity {
        self.sum_active(Some(HoldKind::BorrowingRequest))
    }

    /// Units of the pool not yet promised to a borrowing request.
    pub fn available_to_borrow(&self) -> Quantity {
        self.pool_quantity() - self.outstanding_borrowed()
    }

    /// Locate a loaded hold by its database id.
    pub fn slot_of(&self, hold_id: DbId) -> Result<HoldSlot, LedgerError> {
        self.holds
            .iter()
            .position(|h| h.id == Some(hold_id))
            .map(HoldSlot)
            .ok_or(LedgerError::NotFound {
                entity: "Hold",
                id: hold_id,
            })
    }

    // -----------------------------------------------------------------------
    // Persistence bookkeeping
    // -----------------------------------------------------------------------

    /// Record the id assigned to a newly inserted hold.
    pub fn assign_id(&mut self, slot: HoldSlot, id: DbId) {
        self.holds[slot.0].id = Some(id);
    }

    pub fn is_row_dirty(&self) -> bool {
        self.row_dirty
    }

    pub fn dirty_holds(&self) -> impl Iterator<Item = (HoldSlot, &HoldState)> {
        self.holds
            .iter()
            .enumerate()
            .filter(|(_, h)| h.dirty)
            .map(|(i, h)| (HoldSlot(i), h))
    }

    /// Clear dirty flags once every change has been written.
    pub fn mark_clean(&mut self) {
        self.row_dirty = false;
        for hold in &mut self.holds {
            hold.dirty = false;
        }
    }

    /// Drain the activity records accumulated since the last call.
    pub fn take_changes(&mut self) -> Vec<ActivityChange> {
        std::mem::take(&mut self.changes)
    }

    // -----------------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------------

    /// Intake: new units arrive, both `total_owned` and `free_quantity` grow.
    pub fn increase_total_owned(&mut self, delta: Quantity) -> Result<(), LedgerError> {
        if delta <= 0 {
            return Err(LedgerError::InvalidQuantity {
                quantity: delta,
                reason: "intake quantity must be positive",
            });
        }
        let before = self.observe();
        self.total_owned += delta;
        self.free_quantity += delta;
        self.row_dirty = true;
        self.record_since(before, LedgerAction::Intake, None, None);
        Ok(())
    }

    /// Claim `quantity` units for a consumer.
    ///
    /// Borrowing-request holds are carved out of the borrowing pool and leave
    /// `free_quantity` untouched; every other kind is taken from the free pool.
    pub fn reserve(
        &mut self,
        kind: HoldKind,
        quantity: Quantity,
        owner_ref: Option<DbId>,
    ) -> Result<HoldSlot, LedgerError> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity {
                quantity,
                reason: "reserved quantity must be positive",
            });
        }
        if kind.requires_owner() && owner_ref.is_none() {
            return Err(LedgerError::OwnerRequired { kind });
        }

        match kind {
            HoldKind::BorrowingPool => {
                if self.pool_slot().is_some() {
                    return Err(LedgerError::PoolAlreadyEnabled {
                        asset_id: self.asset_id,
                    });
                }
                self.ensure_free(quantity, self.free_quantity, quantity)?;
            }
            HoldKind::BorrowingRequest => {
                if self.pool_slot().is_none() {
                    return Err(LedgerError::BorrowingDisabled {
                        asset_id: self.asset_id,
                    });
                }
                let available = self.available_to_borrow();
                self.ensure_free(quantity, available, quantity)?;
            }
            _ => self.ensure_free(quantity, self.free_quantity, quantity)?,
        }

        let owner_ref = if kind.requires_owner() { owner_ref } else { None };
        let before = self.observe();
        if kind.draws_from_free() {
            self.free_quantity -= quantity;
            self.row_dirty = true;
        }
        if kind == HoldKind::BorrowingPool {
            self.borrowing_enabled = true;
            self.row_dirty = true;
        }
        self.holds.push(HoldState::new_active(kind, quantity, owner_ref));
        self.record_since(before, LedgerAction::Reserve, Some(kind), owner_ref);
        Ok(HoldSlot(self.holds.len() - 1))
    }

    /// Return a hold's units to where they came from.
    ///
    /// Returns `Ok(false)` without changing anything when the hold was already
    /// released, so retried completion calls are harmless.
    pub fn release(&mut self, slot: HoldSlot) -> Result<bool, LedgerError> {
        let hold = &self.holds[slot.0];
        match hold.status {
            HoldStatus::Released => return Ok(false),
            HoldStatus::Consumed => return Err(self.not_active(slot)),
            HoldStatus::Active => {}
        }
        let (kind, quantity, owner_ref) = (hold.kind, hold.quantity, hold.owner_ref);

        if kind == HoldKind::BorrowingPool {
            self.ensure_pool_idle()?;
        }

        let before = self.observe();
        if kind.draws_from_free() {
            self.free_quantity += quantity;
            self.row_dirty = true;
        }
        if kind == HoldKind::BorrowingPool {
            self.borrowing_enabled = false;
            self.row_dirty = true;
        }
        let hold = &mut self.holds[slot.0];
        hold.status = HoldStatus::Released;
        hold.dirty = true;
        self.record_since(before, LedgerAction::Release, Some(kind), owner_ref);
        Ok(true)
    }

    /// Change an active hold's quantity in place.
    ///
    /// Growing takes only the difference from the source pool, so no other
    /// consumer can grab units between a release and a re-reserve.
    pub fn adjust(&mut self, slot: HoldSlot, new_quantity: Quantity) -> Result<(), LedgerError> {
        let hold = &self.holds[slot.0];
        if !hold.is_active() {
            return Err(self.not_active(slot));
        }
        if new_quantity <= 0 {
            return Err(LedgerError::InvalidQuantity {
                quantity: new_quantity,
                reason: "an active hold must keep a positive quantity; release it instead",
            });
        }
        let (kind, current, owner_ref) = (hold.kind, hold.quantity, hold.owner_ref);
        let delta = new_quantity - current;
        if delta == 0 {
            return Ok(());
        }

        match kind {
            HoldKind::BorrowingRequest => {
                let available = self.available_to_borrow();
                if delta > available {
                    return Err(LedgerError::InsufficientFree {
                        asset_id: self.asset_id,
                        available: available + current,
                        requested: new_quantity,
                    });
                }
            }
            HoldKind::BorrowingPool => {
                let outstanding = self.outstanding_borrowed();
                if new_quantity < outstanding {
                    return Err(LedgerError::BelowOutstanding {
                        asset_id: self.asset_id,
                        outstanding,
                        requested: new_quantity,
                    });
                }
                self.ensure_growth(delta, current, new_quantity)?;
            }
            _ => self.ensure_growth(delta, current, new_quantity)?,
        }

        let before = self.observe();
        if kind.draws_from_free() {
            self.free_quantity -= delta;
            self.row_dirty = true;
        }
        let hold = &mut self.holds[slot.0];
        hold.quantity = new_quantity;
        hold.dirty = true;
        self.record_since(before, LedgerAction::Adjust, Some(kind), owner_ref);
        Ok(())
    }

    /// Permanently remove `consumed` units of a hold from ownership and
    /// release the rest. Returns the released remainder.
    ///
    /// A zero consumption settles the hold as Released.
    pub fn consume(&mut self, slot: HoldSlot, consumed: Quantity) -> Result<Quantity, LedgerError> {
        let hold = &self.holds[slot.0];
        if !hold.is_active() {
            return Err(self.not_active(slot));
        }
        let (kind, quantity, owner_ref) = (hold.kind, hold.quantity, hold.owner_ref);
        if consumed < 0 || consumed > quantity {
            return Err(LedgerError::InvalidQuantity {
                quantity: consumed,
                reason: "consumed quantity must be between zero and the held quantity",
            });
        }
        let pool = match kind {
            HoldKind::BorrowingPool => {
                self.ensure_pool_idle()?;
                None
            }
            HoldKind::BorrowingRequest => Some(self.pool_slot().ok_or(
                LedgerError::BorrowingDisabled {
                    asset_id: self.asset_id,
                },
            )?),
            _ => None,
        };
        let remainder = quantity - consumed;

        let before = self.observe();
        self.total_owned -= consumed;
        if kind.draws_from_free() {
            self.free_quantity += remainder;
        }
        if kind == HoldKind::BorrowingPool {
            self.borrowing_enabled = false;
        }
        if let Some(pool) = pool {
            // Lost borrowed units leave the pool they were lent from.
            let pool_hold = &mut self.holds[pool.0];
            pool_hold.quantity -= consumed;
            pool_hold.consumed_quantity += consumed;
            pool_hold.dirty = true;
            if pool_hold.quantity == 0 {
                pool_hold.status = HoldStatus::Consumed;
                self.borrowing_enabled = false;
            }
        }
        self.row_dirty = true;

        let hold = &mut self.holds[slot.0];
        hold.consumed_quantity = consumed;
        hold.status = if consumed == 0 {
            HoldStatus::Released
        } else {
            HoldStatus::Consumed
        };
        hold.dirty = true;
        self.record_since(before, LedgerAction::Consume, Some(kind), owner_ref);
        Ok(remainder)
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    /// Fails with `HasActiveHolds` unless the asset can be deleted.
    pub fn ensure_deletable(&self) -> Result<(), LedgerError> {
        let blockers: Vec<Blocker> = self.active_holds().map(blocker).collect();
        if blockers.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::HasActiveHolds {
                asset_id: self.asset_id,
                blockers,
            })
        }
    }

    /// Active borrowing-request holds that keep the pool from being released.
    pub fn pool_blockers(&self) -> Vec<Blocker> {
        self.active_holds()
            .filter(|h| h.kind == HoldKind::BorrowingRequest)
            .map(blocker)
            .collect()
    }

    /// Verify conservation, pool containment and non-negativity.
    ///
    /// A failure here means the snapshot is corrupt, not that a request was
    /// invalid, so it is reported as a plain message.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.total_owned < 0 || self.free_quantity < 0 {
            return Err(format!(
                "asset {}: negative ledger (total_owned={}, free_quantity={})",
                self.asset_id, self.total_owned, self.free_quantity
            ));
        }
        if let Some(hold) = self.holds.iter().find(|h| h.quantity < 0 || h.consumed_quantity < 0) {
            return Err(format!(
                "asset {}: negative hold {}",
                self.asset_id,
                hold.describe()
            ));
        }
        let held: Quantity = self
            .active_holds()
            .filter(|h| h.kind.draws_from_free())
            .map(|h| h.quantity)
            .sum();
        if self.total_owned != self.free_quantity + held {
            return Err(format!(
                "asset {}: conservation broken (total_owned={} free_quantity={} held={})",
                self.asset_id, self.total_owned, self.free_quantity, held
            ));
        }
        let pools = self
            .active_holds()
            .filter(|h| h.kind == HoldKind::BorrowingPool)
            .count();
        if pools > 1 {
            return Err(format!("asset {}: {pools} active borrowing pools", self.asset_id));
        }
        if self.borrowing_enabled != (pools == 1) {
            return Err(format!(
                "asset {}: borrowing_enabled={} but {pools} active pool holds",
                self.asset_id, self.borrowing_enabled
            ));
        }
        if self.outstanding_borrowed() > self.pool_quantity() {
            return Err(format!(
                "asset {}: {} units lent out of a pool of {}",
                self.asset_id,
                self.outstanding_borrowed(),
                self.pool_quantity()
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn ensure_free(
        &self,
        needed: Quantity,
        available: Quantity,
        requested: Quantity,
    ) -> Result<(), LedgerError> {
        if needed > available {
            Err(LedgerError::InsufficientFree {
                asset_id: self.asset_id,
                available,
                requested,
            })
        } else {
            Ok(())
        }
    }

    /// Growth of a free-drawing hold: the delta must come out of free units.
    fn ensure_growth(
        &self,
        delta: Quantity,
        current: Quantity,
        new_quantity: Quantity,
    ) -> Result<(), LedgerError> {
        if delta > self.free_quantity {
            Err(LedgerError::InsufficientFree {
                asset_id: self.asset_id,
                available: self.free_quantity + current,
                requested: new_quantity,
            })
        } else {
            Ok(())
        }
    }

    fn ensure_pool_idle(&self) -> Result<(), LedgerError> {
        let blockers = self.pool_blockers();
        if blockers.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::RequestsStillPending {
                asset_id: self.asset_id,
                blockers,
            })
        }
    }

    fn not_active(&self, slot: HoldSlot) -> LedgerError {
        let hold = &self.holds[slot.0];
        LedgerError::HoldNotActive {
            hold_id: hold.id.unwrap_or_default(),
            status: hold.status,
        }
    }

    fn observe(&self) -> Observed {
        Observed {
            total_owned: self.total_owned,
            free_quantity: self.free_quantity,
            borrowing_enabled: self.borrowing_enabled,
            pool: self.pool_quantity(),
            available_to_borrow: self.available_to_borrow(),
        }
    }

    fn record_since(
        &mut self,
        before: Observed,
        action: LedgerAction,
        hold_kind: Option<HoldKind>,
        owner_ref: Option<DbId>,
    ) {
        let after = self.observe();
        let mut push = |field, old: serde_json::Value, new: serde_json::Value| {
            if old != new {
                self.changes.push(ActivityChange {
                    asset_id: self.asset_id,
                    action,
                    hold_kind,
                    owner_ref,
                    field,
                    old_value: old,
                    new_value: new,
                });
            }
        };
        push(
            LedgerField::TotalOwned,
            before.total_owned.into(),
            after.total_owned.into(),
        );
        push(
            LedgerField::FreeQuantity,
            before.free_quantity.into(),
            after.free_quantity.into(),
        );
        push(
            LedgerField::BorrowingEnabled,
            before.borrowing_enabled.into(),
            after.borrowing_enabled.into(),
        );
        push(LedgerField::BorrowingPool, before.pool.into(), after.pool.into());
        push(
            LedgerField::AvailableToBorrow,
            before.available_to_borrow.into(),
            after.available_to_borrow.into(),
        );
    }
}

fn blocker(hold: &HoldState) -> Blocker {
    Blocker {
        kind: hold.kind,
        owner_ref: hold.owner_ref,
        quantity: hold.quantity,
    }
}
