//! All-or-nothing reservations across several assets.
//!
//! Callers lock every asset returned by [`lock_order`] (ascending id) before
//! loading snapshots into a [`LedgerBatch`]. The batch applies each line to a
//! staged copy and only swaps the copies in when every line succeeded.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::activity::ActivityChange;
use crate::ledger::error::LedgerError;
use crate::ledger::hold::HoldKind;
use crate::ledger::state::{HoldSlot, LedgerState};
use crate::types::{DbId, Quantity};

/// One requested claim inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLine {
    pub asset_id: DbId,
    pub kind: HoldKind,
    pub quantity: Quantity,
    pub owner_ref: Option<DbId>,
}

/// Deterministic lock order for a set of assets: ascending, deduplicated.
///
/// Two transactions touching overlapping assets always request the row
/// locks in the same order, so they serialize instead of deadlocking.
pub fn lock_order<I>(asset_ids: I) -> Vec<DbId>
where
    I: IntoIterator<Item = DbId>,
{
    asset_ids
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Locked snapshots for a multi-asset operation, keyed by asset id.
#[derive(Debug, Default, Clone)]
pub struct LedgerBatch {
    states: BTreeMap<DbId, LedgerState>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: LedgerState) {
        self.states.insert(state.asset_id(), state);
    }

    pub fn get(&self, asset_id: DbId) -> Option<&LedgerState> {
        self.states.get(&asset_id)
    }

    pub fn get_mut(&mut self, asset_id: DbId) -> Result<&mut LedgerState, LedgerError> {
        self.states.get_mut(&asset_id).ok_or(LedgerError::NotFound {
            entity: "Asset",
            id: asset_id,
        })
    }

    pub fn states(&self) -> impl Iterator<Item = &LedgerState> {
        self.states.values()
    }

    pub fn states_mut(&mut self) -> impl Iterator<Item = &mut LedgerState> {
        self.states.values_mut()
    }

    /// Reserve every line or none of them.
    ///
    /// Returns `(asset_id, slot)` per line, in input order. On the first
    /// failing line the batch is left untouched and that error is returned.
    pub fn reserve_all(
        &mut self,
        lines: &[ReservationLine],
    ) -> Result<Vec<(DbId, HoldSlot)>, LedgerError> {
        let mut staged: BTreeMap<DbId, LedgerState> = BTreeMap::new();
        for asset_id in lock_order(lines.iter().map(|l| l.asset_id)) {
            let state = self.states.get(&asset_id).ok_or(LedgerError::NotFound {
                entity: "Asset",
                id: asset_id,
            })?;
            staged.insert(asset_id, state.clone());
        }

        let mut slots = Vec::with_capacity(lines.len());
        for line in lines {
            let state = staged
                .get_mut(&line.asset_id)
                .ok_or(LedgerError::NotFound {
                    entity: "Asset",
                    id: line.asset_id,
                })?;
            let slot = state.reserve(line.kind, line.quantity, line.owner_ref)?;
            slots.push((line.asset_id, slot));
        }

        self.states.extend(staged);
        Ok(slots)
    }

    /// Invariant check across every snapshot in the batch.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.states.values().try_for_each(LedgerState::check_invariants)
    }

    /// Drain activity records from every snapshot.
    pub fn take_changes(&mut self) -> Vec<ActivityChange> {
        self.states
            .values_mut()
            .flat_map(LedgerState::take_changes)
            .collect()
    }
}
