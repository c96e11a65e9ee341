//! Repository for `borrowing_requests` and `borrowing_request_lines`.

use sqlx::PgPool;
use stockroom_core::borrowing::{BorrowLine, BorrowingStatus};
use stockroom_core::ledger::Blocker;
use stockroom_core::ledger::HoldKind;
use stockroom_core::types::{DbId, Quantity};

use crate::models::borrowing::{BorrowingLineRow, BorrowingRequestRow, SubmitBorrowingRequest};
use crate::DbTx;

const COLUMNS: &str = "\
    id, requester_name, requester_contact, purpose, status_id, requested_at, \
    collect_at, expected_return_at, returned_at, decided_at, decided_by, \
    rejection_reason, created_at, updated_at";

const LINE_COLUMNS: &str =
    "id, request_id, asset_id, quantity, lost_quantity, hold_id, created_at, updated_at";

pub struct BorrowingRepo;

impl BorrowingRepo {
    pub async fn insert(
        tx: &mut DbTx<'_>,
        input: &SubmitBorrowingRequest,
    ) -> Result<BorrowingRequestRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO borrowing_requests \
                (requester_name, requester_contact, purpose, status_id, collect_at, expected_return_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BorrowingRequestRow>(&query)
            .bind(input.requester_name.trim())
            .bind(&input.requester_contact)
            .bind(&input.purpose)
            .bind(BorrowingStatus::Pending.id())
            .bind(input.collect_at)
            .bind(input.expected_return_at)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn insert_line(
        tx: &mut DbTx<'_>,
        request_id: DbId,
        line: &BorrowLine,
    ) -> Result<BorrowingLineRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO borrowing_request_lines (request_id, asset_id, quantity) \
             VALUES ($1, $2, $3) \
             RETURNING {LINE_COLUMNS}"
        );
        sqlx::query_as::<_, BorrowingLineRow>(&query)
            .bind(request_id)
            .bind(line.asset_id)
            .bind(line.quantity)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BorrowingRequestRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM borrowing_requests WHERE id = $1");
        sqlx::query_as::<_, BorrowingRequestRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lock a request so concurrent status changes serialize.
    pub async fn lock(
        tx: &mut DbTx<'_>,
        id: DbId,
    ) -> Result<Option<BorrowingRequestRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM borrowing_requests WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, BorrowingRequestRow>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn list_lines(
        pool: &PgPool,
        request_id: DbId,
    ) -> Result<Vec<BorrowingLineRow>, sqlx::Error> {
        let query = format!(
            "SELECT {LINE_COLUMNS} FROM borrowing_request_lines WHERE request_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, BorrowingLineRow>(&query)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_lines_in_tx(
        tx: &mut DbTx<'_>,
        request_id: DbId,
    ) -> Result<Vec<BorrowingLineRow>, sqlx::Error> {
        let query = format!(
            "SELECT {LINE_COLUMNS} FROM borrowing_request_lines WHERE request_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, BorrowingLineRow>(&query)
            .bind(request_id)
            .fetch_all(&mut **tx)
            .await
    }

    /// Pending requests that still list an asset, as pool blockers.
    pub async fn pending_blockers(
        tx: &mut DbTx<'_>,
        asset_id: DbId,
    ) -> Result<Vec<Blocker>, sqlx::Error> {
        let rows: Vec<(DbId, Quantity)> = sqlx::query_as(
            "SELECT r.id, l.quantity \
             FROM borrowing_request_lines l \
             JOIN borrowing_requests r ON r.id = l.request_id \
             WHERE l.asset_id = $1 AND r.status_id = $2 \
             ORDER BY r.id",
        )
        .bind(asset_id)
        .bind(BorrowingStatus::Pending.id())
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(request_id, quantity)| Blocker {
                kind: HoldKind::BorrowingRequest,
                owner_ref: Some(request_id),
                quantity,
            })
            .collect())
    }

    pub async fn set_status(
        tx: &mut DbTx<'_>,
        id: DbId,
        status: BorrowingStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE borrowing_requests \
             SET status_id = $2, \
                 returned_at = CASE WHEN $2 = $3 THEN NOW() ELSE returned_at END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.id())
        .bind(BorrowingStatus::Returned.id())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Record an approve/reject decision.
    pub async fn record_decision(
        tx: &mut DbTx<'_>,
        id: DbId,
        status: BorrowingStatus,
        decided_by: Option<DbId>,
        rejection_reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE borrowing_requests \
             SET status_id = $2, decided_at = NOW(), decided_by = $3, rejection_reason = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.id())
        .bind(decided_by)
        .bind(rejection_reason)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn set_line_hold(
        tx: &mut DbTx<'_>,
        line_id: DbId,
        hold_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE borrowing_request_lines SET hold_id = $2 WHERE id = $1")
            .bind(line_id)
            .bind(hold_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn set_line_quantity(
        tx: &mut DbTx<'_>,
        line_id: DbId,
        quantity: Quantity,
    ) -> Result<BorrowingLineRow, sqlx::Error> {
        let query = format!(
            "UPDATE borrowing_request_lines SET quantity = $2 WHERE id = $1 RETURNING {LINE_COLUMNS}"
        );
        sqlx::query_as::<_, BorrowingLineRow>(&query)
            .bind(line_id)
            .bind(quantity)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn set_line_lost(
        tx: &mut DbTx<'_>,
        line_id: DbId,
        lost_quantity: Quantity,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE borrowing_request_lines SET lost_quantity = $2 WHERE id = $1")
            .bind(line_id)
            .bind(lost_quantity)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
