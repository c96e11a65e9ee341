//! Borrowing requests: submit, approve, reject, edit, return.

use std::collections::HashMap;

use sqlx::PgPool;
use stockroom_core::borrowing::{self, BorrowingStatus};
use stockroom_core::error::CoreError;
use stockroom_core::ledger::{lock_order, HoldKind, LedgerError, ReservationLine};
use stockroom_core::types::{DbId, Quantity};

use crate::coordinator::{Committed, Coordinator, LockedLedgers};
use crate::error::{StoreError, StoreResult};
use crate::models::borrowing::{
    BorrowingLineRow, BorrowingRequestDetail, BorrowingRequestRow, ReturnBorrowingRequest,
    SubmitBorrowingRequest,
};
use crate::repositories::{AssetRepo, BorrowingRepo};

pub struct BorrowingWorkflow;

impl BorrowingWorkflow {
    /// Record a Pending request. No ledger effect until approval.
    ///
    /// Every listed asset must exist and have borrowing enabled. The rows are
    /// share-locked so a concurrent pool disable sees this request.
    pub async fn submit(
        ledger: &Coordinator,
        input: &SubmitBorrowingRequest,
    ) -> StoreResult<BorrowingRequestDetail> {
        if input.requester_name.trim().is_empty() {
            return Err(CoreError::Validation("requester_name is required".into()).into());
        }
        borrowing::validate_lines(&input.lines)?;
        borrowing::validate_schedule(input.collect_at, input.expected_return_at)?;

        let mut tx = ledger.begin().await?;
        for asset_id in lock_order(input.lines.iter().map(|l| l.asset_id)) {
            let asset = AssetRepo::lock_shared(&mut tx, asset_id)
                .await?
                .ok_or_else(|| StoreError::not_found("Asset", asset_id))?;
            if !asset.borrowing_enabled {
                return Err(LedgerError::BorrowingDisabled { asset_id }.into());
            }
        }
        let request = BorrowingRepo::insert(&mut tx, input).await?;
        let mut lines = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            lines.push(BorrowingRepo::insert_line(&mut tx, request.id, line).await?);
        }
        tx.commit().await?;

        tracing::info!(request_id = request.id, lines = lines.len(), "Borrowing request submitted");
        Ok(BorrowingRequestDetail { request, lines })
    }

    pub async fn get(pool: &PgPool, id: DbId) -> StoreResult<BorrowingRequestDetail> {
        let request = BorrowingRepo::find_by_id(pool, id)
            .await?
            .ok_or_else(|| StoreError::not_found("BorrowingRequest", id))?;
        let lines = BorrowingRepo::list_lines(pool, id).await?;
        Ok(BorrowingRequestDetail { request, lines })
    }

    /// Pending -> Approved. Creates one borrowing-request hold per line, all
    /// or nothing.
    pub async fn approve(
        ledger: &Coordinator,
        id: DbId,
        decided_by: Option<DbId>,
    ) -> StoreResult<Committed<BorrowingRequestDetail>> {
        let mut tx = ledger.begin().await?;
        let request = lock_request(&mut tx, id).await?;
        borrowing::validate_transition(status_of(&request)?, BorrowingStatus::Approved)?;

        let lines = BorrowingRepo::list_lines_in_tx(&mut tx, id).await?;
        let reservations: Vec<ReservationLine> = lines
            .iter()
            .map(|line| ReservationLine {
                asset_id: line.asset_id,
                kind: HoldKind::BorrowingRequest,
                quantity: line.quantity,
                owner_ref: Some(id),
            })
            .collect();

        let mut ledgers =
            LockedLedgers::acquire(&mut tx, reservations.iter().map(|r| r.asset_id)).await?;
        let slots = ledgers.reserve_all(&reservations)?;
        ledgers.persist(&mut tx).await?;
        for (line, &(asset_id, slot)) in lines.iter().zip(&slots) {
            let hold_id = ledgers.hold_id(asset_id, slot)?;
            BorrowingRepo::set_line_hold(&mut tx, line.id, hold_id).await?;
        }
        BorrowingRepo::record_decision(&mut tx, id, BorrowingStatus::Approved, decided_by, None)
            .await?;
        tx.commit().await?;

        tracing::info!(request_id = id, lines = lines.len(), "Borrowing request approved");
        let detail = Self::get(ledger.pool(), id).await?;
        Ok(Committed {
            value: detail,
            changes: ledgers.into_changes(),
        })
    }

    /// Pending -> Rejected. No ledger effect.
    pub async fn reject(
        ledger: &Coordinator,
        id: DbId,
        reason: Option<&str>,
        decided_by: Option<DbId>,
    ) -> StoreResult<BorrowingRequestDetail> {
        borrowing::validate_rejection_reason(reason)?;
        let mut tx = ledger.begin().await?;
        let request = lock_request(&mut tx, id).await?;
        borrowing::validate_transition(status_of(&request)?, BorrowingStatus::Rejected)?;
        BorrowingRepo::record_decision(
            &mut tx,
            id,
            BorrowingStatus::Rejected,
            decided_by,
            reason.map(str::trim),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(request_id = id, "Borrowing request rejected");
        Self::get(ledger.pool(), id).await
    }

    /// Change one line's quantity.
    ///
    /// A pending line is simply rewritten. An approved line adjusts its hold,
    /// so growth is bounded by the pool's remaining capacity.
    pub async fn edit_line_quantity(
        ledger: &Coordinator,
        id: DbId,
        line_id: DbId,
        quantity: Quantity,
    ) -> StoreResult<Committed<BorrowingLineRow>> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity {
                quantity,
                reason: "line quantity must be positive",
            }
            .into());
        }
        let mut tx = ledger.begin().await?;
        let request = lock_request(&mut tx, id).await?;
        let line = BorrowingRepo::list_lines_in_tx(&mut tx, id)
            .await?
            .into_iter()
            .find(|l| l.id == line_id)
            .ok_or_else(|| StoreError::not_found("BorrowingRequestLine", line_id))?;

        let changes = match status_of(&request)? {
            BorrowingStatus::Pending => Vec::new(),
            BorrowingStatus::Approved => {
                let hold_id = line_hold(&line)?;
                let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[hold_id]).await?;
                ledgers.adjust(hold_id, quantity)?;
                ledgers.persist(&mut tx).await?;
                ledgers.into_changes()
            }
            other => {
                return Err(CoreError::Conflict(format!(
                    "Borrowing request is {} and its lines can no longer change",
                    other.label()
                ))
                .into())
            }
        };
        let line = BorrowingRepo::set_line_quantity(&mut tx, line_id, quantity).await?;
        tx.commit().await?;

        tracing::info!(request_id = id, line_id, quantity, "Borrowing line updated");
        Ok(Committed {
            value: line,
            changes,
        })
    }

    /// Approved -> Returned. Releases every hold; units reported lost on a
    /// line are consumed instead and leave the borrowing pool.
    pub async fn return_request(
        ledger: &Coordinator,
        id: DbId,
        input: &ReturnBorrowingRequest,
    ) -> StoreResult<Committed<BorrowingRequestDetail>> {
        let mut tx = ledger.begin().await?;
        let request = lock_request(&mut tx, id).await?;
        borrowing::validate_transition(status_of(&request)?, BorrowingStatus::Returned)?;

        let lines = BorrowingRepo::list_lines_in_tx(&mut tx, id).await?;
        let mut lost: HashMap<DbId, Quantity> = HashMap::new();
        for entry in &input.lost {
            if !lines.iter().any(|l| l.id == entry.line_id) {
                return Err(CoreError::Validation(format!(
                    "Line {} does not belong to borrowing request {id}",
                    entry.line_id
                ))
                .into());
            }
            *lost.entry(entry.line_id).or_default() += entry.lost_quantity;
        }
        for line in &lines {
            borrowing::validate_lost(line.quantity, lost.get(&line.id).copied().unwrap_or(0))?;
        }

        let hold_ids = lines.iter().map(line_hold).collect::<StoreResult<Vec<_>>>()?;
        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &hold_ids).await?;
        for (line, &hold_id) in lines.iter().zip(&hold_ids) {
            match lost.get(&line.id).copied().unwrap_or(0) {
                0 => {
                    ledgers.release(hold_id)?;
                }
                missing => {
                    ledgers.consume(hold_id, missing)?;
                    BorrowingRepo::set_line_lost(&mut tx, line.id, missing).await?;
                }
            }
        }
        ledgers.persist(&mut tx).await?;
        BorrowingRepo::set_status(&mut tx, id, BorrowingStatus::Returned).await?;
        tx.commit().await?;

        tracing::info!(
            request_id = id,
            lost = lost.values().sum::<Quantity>(),
            "Borrowing request returned"
        );
        let detail = Self::get(ledger.pool(), id).await?;
        Ok(Committed {
            value: detail,
            changes: ledgers.into_changes(),
        })
    }
}

async fn lock_request(tx: &mut crate::DbTx<'_>, id: DbId) -> StoreResult<BorrowingRequestRow> {
    BorrowingRepo::lock(tx, id)
        .await?
        .ok_or_else(|| StoreError::not_found("BorrowingRequest", id))
}

fn status_of(request: &BorrowingRequestRow) -> Result<BorrowingStatus, CoreError> {
    BorrowingStatus::from_id(request.status_id).ok_or_else(|| {
        CoreError::Internal(format!(
            "borrowing request {} has unknown status_id {}",
            request.id, request.status_id
        ))
    })
}

fn line_hold(line: &BorrowingLineRow) -> StoreResult<DbId> {
    line.hold_id.ok_or_else(|| {
        CoreError::Internal(format!("approved borrowing line {} has no hold", line.id)).into()
    })
}
