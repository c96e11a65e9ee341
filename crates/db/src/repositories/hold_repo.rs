//! Repository for the `holds` table (the Hold Registry).
//!
//! Reads are open to everyone; inserts and updates happen only through the
//! coordinator, under the owning asset's row lock.

use sqlx::PgPool;
use stockroom_core::ledger::{HoldKind, HoldState, HoldStatus};
use stockroom_core::types::{DbId, Quantity};

use crate::models::hold::HoldRow;
use crate::DbTx;

/// Column list for `holds` queries.
const COLUMNS: &str = "\
    id, asset_id, kind_id, status_id, quantity, consumed_quantity, owner_ref, \
    settled_at, created_at, updated_at";

pub struct HoldRepo;

impl HoldRepo {
    pub async fn find(pool: &PgPool, id: DbId) -> Result<Option<HoldRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM holds WHERE id = $1");
        sqlx::query_as::<_, HoldRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_in_tx(tx: &mut DbTx<'_>, id: DbId) -> Result<Option<HoldRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM holds WHERE id = $1");
        sqlx::query_as::<_, HoldRow>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Active holds of an asset, optionally of one kind.
    pub async fn list_active(
        pool: &PgPool,
        asset_id: DbId,
        kind: Option<HoldKind>,
    ) -> Result<Vec<HoldRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM holds \
             WHERE asset_id = $1 AND status_id = $2 \
               AND ($3::SMALLINT IS NULL OR kind_id = $3) \
             ORDER BY id"
        );
        sqlx::query_as::<_, HoldRow>(&query)
            .bind(asset_id)
            .bind(HoldStatus::Active.id())
            .bind(kind.map(|k| k.id()))
            .fetch_all(pool)
            .await
    }

    /// Active holds of an asset, read inside the transaction that locked it.
    pub async fn list_active_in_tx(
        tx: &mut DbTx<'_>,
        asset_id: DbId,
    ) -> Result<Vec<HoldRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM holds \
             WHERE asset_id = $1 AND status_id = $2 \
             ORDER BY id"
        );
        sqlx::query_as::<_, HoldRow>(&query)
            .bind(asset_id)
            .bind(HoldStatus::Active.id())
            .fetch_all(&mut **tx)
            .await
    }

    pub async fn sum_active(
        pool: &PgPool,
        asset_id: DbId,
        kind: Option<HoldKind>,
    ) -> Result<Quantity, sqlx::Error> {
        let total: Option<Quantity> = sqlx::query_scalar(
            "SELECT SUM(quantity)::BIGINT FROM holds \
             WHERE asset_id = $1 AND status_id = $2 \
               AND ($3::SMALLINT IS NULL OR kind_id = $3)",
        )
        .bind(asset_id)
        .bind(HoldStatus::Active.id())
        .bind(kind.map(|k| k.id()))
        .fetch_one(pool)
        .await?;
        Ok(total.unwrap_or(0))
    }

    /// Every hold ever placed on an asset, newest first.
    pub async fn list_for_asset(pool: &PgPool, asset_id: DbId) -> Result<Vec<HoldRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM holds WHERE asset_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, HoldRow>(&query)
            .bind(asset_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_owner(
        pool: &PgPool,
        kind: HoldKind,
        owner_ref: DbId,
    ) -> Result<Vec<HoldRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM holds WHERE kind_id = $1 AND owner_ref = $2 ORDER BY id"
        );
        sqlx::query_as::<_, HoldRow>(&query)
            .bind(kind.id())
            .bind(owner_ref)
            .fetch_all(pool)
            .await
    }

    /// The workflow record backing a hold, as `(record, id)`.
    ///
    /// Holds reserved directly through the coordinator have no backing record.
    pub async fn find_owner(
        tx: &mut DbTx<'_>,
        hold_id: DbId,
    ) -> Result<Option<(String, DbId)>, sqlx::Error> {
        sqlx::query_as::<_, (String, DbId)>(
            "SELECT 'ticket'::TEXT, id FROM tickets WHERE hold_id = $1 \
             UNION ALL SELECT 'event', event_id FROM event_allocations WHERE hold_id = $1 \
             UNION ALL SELECT 'borrowing request', request_id FROM borrowing_request_lines WHERE hold_id = $1 \
             UNION ALL SELECT 'outgoing record', id FROM outgoing_records WHERE hold_id = $1 \
             LIMIT 1",
        )
        .bind(hold_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Insert a hold created by the engine. Returns the new id.
    pub async fn insert(
        tx: &mut DbTx<'_>,
        asset_id: DbId,
        hold: &HoldState,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO holds (asset_id, kind_id, status_id, quantity, consumed_quantity, owner_ref, settled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, CASE WHEN $3 = 1 THEN NULL ELSE NOW() END) \
             RETURNING id",
        )
        .bind(asset_id)
        .bind(hold.kind.id())
        .bind(hold.status.id())
        .bind(hold.quantity)
        .bind(hold.consumed_quantity)
        .bind(hold.owner_ref)
        .fetch_one(&mut **tx)
        .await
    }

    /// Write back quantity and status. `settled_at` is stamped on the first
    /// transition out of Active.
    pub async fn update(tx: &mut DbTx<'_>, id: DbId, hold: &HoldState) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE holds \
             SET quantity = $2, consumed_quantity = $3, status_id = $4, \
                 settled_at = CASE WHEN $4 = 1 THEN NULL ELSE COALESCE(settled_at, NOW()) END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(hold.quantity)
        .bind(hold.consumed_quantity)
        .bind(hold.status.id())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
