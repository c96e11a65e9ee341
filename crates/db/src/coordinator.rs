//! Reservation Coordinator.
//!
//! Every quantity change goes through here. A call opens a transaction with
//! the configured `lock_timeout`, locks the affected `asset_ledgers` rows with
//! `SELECT ... FOR UPDATE` in ascending id order, loads their active holds into
//! [`LedgerState`] snapshots, applies the requested primitive and writes back
//! only what the engine marked dirty. Nothing is written if any step fails;
//! dropping the transaction rolls it back.
//!
//! Workflows that must update their own records in the same transaction use
//! [`LockedLedgers`] directly instead of the one-shot methods on
//! [`Coordinator`].

use std::time::Duration;

use serde::Serialize;
use stockroom_core::activity::ActivityChange;
use stockroom_core::assets;
use stockroom_core::error::CoreError;
use stockroom_core::ledger::{
    lock_order, HoldKind, HoldSlot, HoldState, LedgerBatch, LedgerError, LedgerState,
    ReservationLine,
};
use stockroom_core::types::{DbId, Quantity};

use crate::error::{StoreError, StoreResult};
use crate::models::asset::{AssetLedgerRow, CreateAsset, LedgerFigures, SetBorrowing};
use crate::models::hold::HoldRow;
use crate::repositories::{AssetRepo, BorrowingRepo, HoldRepo};
use crate::{DbPool, DbTx};

/// Result of a committed operation plus the ledger fields it changed.
///
/// `changes` is handed to the activity notifier once the caller is done.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub changes: Vec<ActivityChange>,
}

impl<T> Committed<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Committed<U> {
        Committed {
            value: f(self.value),
            changes: self.changes,
        }
    }
}

/// Outcome of a single-hold primitive.
#[derive(Debug, Clone, Serialize)]
pub struct HoldOutcome {
    pub hold_id: DbId,
    /// Units returned to their source (free or pool capacity).
    pub released: Quantity,
    pub ledger: LedgerFigures,
}

// ---------------------------------------------------------------------------
// LockedLedgers
// ---------------------------------------------------------------------------

/// Asset snapshots locked inside one transaction.
pub struct LockedLedgers {
    batch: LedgerBatch,
}

impl LockedLedgers {
    /// Lock the given assets in ascending id order and load their active holds.
    pub async fn acquire<I>(tx: &mut DbTx<'_>, asset_ids: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = DbId>,
    {
        Self::load(tx, lock_order(asset_ids), &[]).await
    }

    /// Lock the assets backing `hold_ids` and load them.
    ///
    /// Target holds that are no longer Active are loaded too, so releasing
    /// them again is a no-op and adjusting them reports `HoldNotActive`.
    pub async fn acquire_for_holds(tx: &mut DbTx<'_>, hold_ids: &[DbId]) -> StoreResult<Self> {
        let mut targets = Vec::with_capacity(hold_ids.len());
        for &hold_id in hold_ids {
            // asset_id never changes, so reading it before the lock is safe.
            let row = HoldRepo::find_in_tx(tx, hold_id)
                .await?
                .ok_or_else(|| StoreError::not_found("Hold", hold_id))?;
            targets.push((row.asset_id, hold_id));
        }
        Self::load(tx, lock_order(targets.iter().map(|(a, _)| *a)), &targets).await
    }

    async fn load(
        tx: &mut DbTx<'_>,
        ordered_ids: Vec<DbId>,
        targets: &[(DbId, DbId)],
    ) -> StoreResult<Self> {
        let mut batch = LedgerBatch::new();
        for asset_id in ordered_ids {
            let row = AssetRepo::lock(tx, asset_id)
                .await?
                .ok_or_else(|| StoreError::not_found("Asset", asset_id))?;
            let mut rows = HoldRepo::list_active_in_tx(tx, asset_id).await?;
            for &(_, hold_id) in targets.iter().filter(|(a, _)| *a == asset_id) {
                if rows.iter().any(|h| h.id == hold_id) {
                    continue;
                }
                if let Some(settled) = HoldRepo::find_in_tx(tx, hold_id).await? {
                    rows.push(settled);
                }
            }
            let holds = rows
                .iter()
                .map(HoldRow::to_state)
                .collect::<Result<Vec<_>, _>>()?;
            batch.insert(LedgerState::load(
                row.id,
                row.total_owned,
                row.free_quantity,
                row.borrowing_enabled,
                holds,
            ));
        }
        Ok(Self { batch })
    }

    pub fn state(&self, asset_id: DbId) -> StoreResult<&LedgerState> {
        self.batch
            .get(asset_id)
            .ok_or_else(|| StoreError::not_found("Asset", asset_id))
    }

    pub fn state_mut(&mut self, asset_id: DbId) -> StoreResult<&mut LedgerState> {
        Ok(self.batch.get_mut(asset_id)?)
    }

    pub fn figures(&self, asset_id: DbId) -> StoreResult<LedgerFigures> {
        self.state(asset_id).map(LedgerFigures::from)
    }

    pub fn reserve(&mut self, line: &ReservationLine) -> StoreResult<HoldSlot> {
        let state = self.batch.get_mut(line.asset_id)?;
        state
            .reserve(line.kind, line.quantity, line.owner_ref)
            .map_err(rejected)
    }

    /// All-or-nothing reservation of several lines. Slots come back in input order.
    pub fn reserve_all(&mut self, lines: &[ReservationLine]) -> StoreResult<Vec<(DbId, HoldSlot)>> {
        self.batch.reserve_all(lines).map_err(rejected)
    }

    pub fn release(&mut self, hold_id: DbId) -> StoreResult<bool> {
        let (asset_id, slot) = self.locate(hold_id)?;
        self.batch.get_mut(asset_id)?.release(slot).map_err(rejected)
    }

    pub fn adjust(&mut self, hold_id: DbId, new_quantity: Quantity) -> StoreResult<()> {
        let (asset_id, slot) = self.locate(hold_id)?;
        self.batch
            .get_mut(asset_id)?
            .adjust(slot, new_quantity)
            .map_err(rejected)
    }

    pub fn consume(&mut self, hold_id: DbId, consumed: Quantity) -> StoreResult<Quantity> {
        let (asset_id, slot) = self.locate(hold_id)?;
        self.consume_slot(asset_id, slot, consumed)
    }

    /// Consume a hold created earlier in this session and not yet persisted.
    pub fn consume_slot(
        &mut self,
        asset_id: DbId,
        slot: HoldSlot,
        consumed: Quantity,
    ) -> StoreResult<Quantity> {
        self.batch
            .get_mut(asset_id)?
            .consume(slot, consumed)
            .map_err(rejected)
    }

    /// A loaded hold, active or settled.
    pub fn hold(&self, hold_id: DbId) -> StoreResult<&HoldState> {
        let (asset_id, slot) = self.locate(hold_id)?;
        Ok(self.state(asset_id)?.hold(slot))
    }

    /// Quantity currently recorded on a loaded hold.
    pub fn hold_quantity(&self, hold_id: DbId) -> StoreResult<Quantity> {
        Ok(self.hold(hold_id)?.quantity)
    }

    /// Database id of a hold; only available after [`LockedLedgers::persist`].
    pub fn hold_id(&self, asset_id: DbId, slot: HoldSlot) -> StoreResult<DbId> {
        self.state(asset_id)?.hold(slot).id.ok_or_else(|| {
            CoreError::Internal(format!("hold in slot {} was never persisted", slot.index())).into()
        })
    }

    /// Verify invariants on every snapshot, then write dirty rows.
    pub async fn persist(&mut self, tx: &mut DbTx<'_>) -> StoreResult<()> {
        if let Err(msg) = self.batch.check_invariants() {
            tracing::error!(error = %msg, "Ledger invariant violated, rolling back");
            return Err(CoreError::Internal(msg).into());
        }
        for state in self.batch.states_mut() {
            if state.is_row_dirty() {
                AssetRepo::write_ledger(tx, state).await?;
            }
            let dirty: Vec<(HoldSlot, HoldState)> = state
                .dirty_holds()
                .map(|(slot, hold)| (slot, hold.clone()))
                .collect();
            for (slot, hold) in dirty {
                match hold.id {
                    Some(id) => HoldRepo::update(tx, id, &hold).await?,
                    None => {
                        let id = HoldRepo::insert(tx, state.asset_id(), &hold).await?;
                        state.assign_id(slot, id);
                    }
                }
            }
            state.mark_clean();
        }
        Ok(())
    }

    /// Drain the activity records. Call after commit.
    pub fn into_changes(mut self) -> Vec<ActivityChange> {
        self.batch.take_changes()
    }

    fn locate(&self, hold_id: DbId) -> StoreResult<(DbId, HoldSlot)> {
        self.batch
            .states()
            .find_map(|state| {
                state
                    .slot_of(hold_id)
                    .ok()
                    .map(|slot| (state.asset_id(), slot))
            })
            .ok_or_else(|| StoreError::not_found("Hold", hold_id))
    }
}

/// Refuse the one-shot primitives on holds whose lifecycle belongs elsewhere.
///
/// The borrowing pool changes only through the asset's borrowing settings, and
/// a hold backing a workflow record changes only through that record.
async fn ensure_unowned(
    tx: &mut DbTx<'_>,
    ledgers: &LockedLedgers,
    hold_id: DbId,
) -> StoreResult<()> {
    let owner = if ledgers.hold(hold_id)?.kind == HoldKind::BorrowingPool {
        Some("the borrowing pool settings of its asset".to_string())
    } else {
        HoldRepo::find_owner(tx, hold_id)
            .await?
            .map(|(record, id)| format!("{record} {id}"))
    };
    match owner {
        Some(owner) => {
            tracing::warn!(hold_id, owner = %owner, "Direct change to an owned hold rejected");
            Err(CoreError::Conflict(format!(
                "Hold {hold_id} is managed by {owner} and cannot be changed directly"
            ))
            .into())
        }
        None => Ok(()),
    }
}

/// Log a rule violation and lift it into a [`StoreError`].
fn rejected(err: LedgerError) -> StoreError {
    tracing::warn!(code = err.code(), error = %err, "Ledger operation rejected");
    err.into()
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Entry point for ledger mutations. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Coordinator {
    pool: DbPool,
    lock_timeout: Duration,
}

impl Coordinator {
    pub fn new(pool: DbPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Begin a transaction whose row-lock waits are bounded by `lock_timeout`.
    ///
    /// A timed-out wait fails with SQLSTATE `55P03` and the whole transaction
    /// rolls back.
    pub async fn begin(&self) -> Result<DbTx<'static>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let millis = self.lock_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL lock_timeout = '{millis}ms'"))
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }

    // -- asset lifecycle ------------------------------------------------------

    /// Create a ledger with every owned unit free.
    pub async fn register(&self, input: &CreateAsset) -> StoreResult<Committed<AssetLedgerRow>> {
        assets::validate_registration(&input.name, input.total_owned)?;
        let mut tx = self.pool.begin().await?;
        let row = AssetRepo::insert(&mut tx, input.name.trim(), input.total_owned).await?;
        let mut state = LedgerState::register(row.id, row.total_owned)?;
        tx.commit().await?;

        tracing::info!(asset_id = row.id, total_owned = row.total_owned, "Asset registered");
        Ok(Committed {
            value: row,
            changes: state.take_changes(),
        })
    }

    /// Intake: `total_owned` and `free_quantity` both grow by `delta`.
    pub async fn intake(&self, asset_id: DbId, delta: Quantity) -> StoreResult<Committed<LedgerFigures>> {
        let mut tx = self.begin().await?;
        let mut ledgers = LockedLedgers::acquire(&mut tx, [asset_id]).await?;
        ledgers
            .state_mut(asset_id)?
            .increase_total_owned(delta)
            .map_err(rejected)?;
        ledgers.persist(&mut tx).await?;
        let figures = ledgers.figures(asset_id)?;
        tx.commit().await?;

        tracing::info!(asset_id, delta, total_owned = figures.total_owned, "Intake recorded");
        Ok(Committed {
            value: figures,
            changes: ledgers.into_changes(),
        })
    }

    /// Delete an asset. Fails with `HasActiveHolds` while anything is held.
    pub async fn delete(&self, asset_id: DbId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let ledgers = LockedLedgers::acquire(&mut tx, [asset_id]).await?;
        ledgers
            .state(asset_id)?
            .ensure_deletable()
            .map_err(rejected)?;
        AssetRepo::soft_delete(&mut tx, asset_id).await?;
        tx.commit().await?;

        tracing::info!(asset_id, "Asset deleted");
        Ok(())
    }

    /// Enable, resize or disable the borrowing pool.
    ///
    /// Disabling fails with `RequestsStillPending` while approved loans are out
    /// or pending requests still list the asset.
    pub async fn set_borrowing(
        &self,
        asset_id: DbId,
        input: &SetBorrowing,
    ) -> StoreResult<Committed<LedgerFigures>> {
        let mut tx = self.begin().await?;
        let mut ledgers = LockedLedgers::acquire(&mut tx, [asset_id]).await?;
        let state = ledgers.state_mut(asset_id)?;

        match (input.enabled, state.pool_slot()) {
            (true, None) => {
                let size = input.pool_size.ok_or_else(|| {
                    CoreError::Validation("pool_size is required to enable borrowing".into())
                })?;
                state
                    .reserve(HoldKind::BorrowingPool, size, None)
                    .map_err(rejected)?;
            }
            (true, Some(slot)) => {
                if let Some(size) = input.pool_size {
                    state.adjust(slot, size).map_err(rejected)?;
                }
            }
            (false, Some(slot)) => {
                let mut blockers = state.pool_blockers();
                blockers.extend(BorrowingRepo::pending_blockers(&mut tx, asset_id).await?);
                if !blockers.is_empty() {
                    return Err(rejected(LedgerError::RequestsStillPending {
                        asset_id,
                        blockers,
                    }));
                }
                state.release(slot).map_err(rejected)?;
            }
            (false, None) => {}
        }

        ledgers.persist(&mut tx).await?;
        let figures = ledgers.figures(asset_id)?;
        tx.commit().await?;

        tracing::info!(
            asset_id,
            enabled = figures.borrowing_enabled,
            available_to_borrow = figures.available_to_borrow,
            "Borrowing pool updated"
        );
        Ok(Committed {
            value: figures,
            changes: ledgers.into_changes(),
        })
    }

    // -- primitives -------------------------------------------------------------

    /// Claim units for a consumer. Returns the new hold.
    pub async fn reserve(&self, line: &ReservationLine) -> StoreResult<Committed<HoldOutcome>> {
        let mut tx = self.begin().await?;
        let mut ledgers = LockedLedgers::acquire(&mut tx, [line.asset_id]).await?;
        let slot = ledgers.reserve(line)?;
        ledgers.persist(&mut tx).await?;
        let hold_id = ledgers.hold_id(line.asset_id, slot)?;
        let figures = ledgers.figures(line.asset_id)?;
        tx.commit().await?;

        tracing::info!(
            asset_id = line.asset_id,
            hold_id,
            kind = %line.kind,
            quantity = line.quantity,
            free_quantity = figures.free_quantity,
            "Hold reserved"
        );
        Ok(Committed {
            value: HoldOutcome {
                hold_id,
                released: 0,
                ledger: figures,
            },
            changes: ledgers.into_changes(),
        })
    }

    /// Reserve several lines across assets, all or nothing.
    pub async fn reserve_batch(&self, lines: &[ReservationLine]) -> StoreResult<Committed<Vec<DbId>>> {
        let mut tx = self.begin().await?;
        let mut ledgers =
            LockedLedgers::acquire(&mut tx, lines.iter().map(|l| l.asset_id)).await?;
        let slots = ledgers.reserve_all(lines)?;
        ledgers.persist(&mut tx).await?;
        let hold_ids = slots
            .iter()
            .map(|&(asset_id, slot)| ledgers.hold_id(asset_id, slot))
            .collect::<StoreResult<Vec<_>>>()?;
        tx.commit().await?;

        tracing::info!(lines = lines.len(), "Batch reserved");
        Ok(Committed {
            value: hold_ids,
            changes: ledgers.into_changes(),
        })
    }

    /// Return a hold's units. Releasing an already released hold is a no-op.
    pub async fn release(&self, hold_id: DbId) -> StoreResult<Committed<HoldOutcome>> {
        let mut tx = self.begin().await?;
        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[hold_id]).await?;
        ensure_unowned(&mut tx, &ledgers, hold_id).await?;
        let quantity = ledgers.hold_quantity(hold_id)?;
        let changed = ledgers.release(hold_id)?;
        self.finish_hold(tx, ledgers, hold_id, if changed { quantity } else { 0 }, "Hold released")
            .await
    }

    /// Change an active hold's quantity in place.
    pub async fn adjust(
        &self,
        hold_id: DbId,
        new_quantity: Quantity,
    ) -> StoreResult<Committed<HoldOutcome>> {
        let mut tx = self.begin().await?;
        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[hold_id]).await?;
        ensure_unowned(&mut tx, &ledgers, hold_id).await?;
        ledgers.adjust(hold_id, new_quantity)?;
        self.finish_hold(tx, ledgers, hold_id, 0, "Hold adjusted").await
    }

    /// Permanently remove `consumed` units and release the rest.
    pub async fn consume(
        &self,
        hold_id: DbId,
        consumed: Quantity,
    ) -> StoreResult<Committed<HoldOutcome>> {
        let mut tx = self.begin().await?;
        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[hold_id]).await?;
        ensure_unowned(&mut tx, &ledgers, hold_id).await?;
        let remainder = ledgers.consume(hold_id, consumed)?;
        self.finish_hold(tx, ledgers, hold_id, remainder, "Hold consumed")
            .await
    }

    async fn finish_hold(
        &self,
        mut tx: DbTx<'static>,
        mut ledgers: LockedLedgers,
        hold_id: DbId,
        released: Quantity,
        message: &'static str,
    ) -> StoreResult<Committed<HoldOutcome>> {
        ledgers.persist(&mut tx).await?;
        let (asset_id, _) = ledgers.locate(hold_id)?;
        let figures = ledgers.figures(asset_id)?;
        tx.commit().await?;

        tracing::info!(
            asset_id,
            hold_id,
            released,
            free_quantity = figures.free_quantity,
            "{message}"
        );
        Ok(Committed {
            value: HoldOutcome {
                hold_id,
                released,
                ledger: figures,
            },
            changes: ledgers.into_changes(),
        })
    }
}
