//! Repository for the `asset_ledgers` table.
//!
//! `free_quantity`, `total_owned` and `borrowing_enabled` are only written by
//! [`AssetRepo::write_ledger`], which the coordinator calls while it holds the
//! row lock.

use sqlx::PgPool;
use stockroom_core::ledger::LedgerState;
use stockroom_core::types::{DbId, Quantity};

use crate::models::asset::AssetLedgerRow;
use crate::DbTx;

/// Column list for `asset_ledgers` queries.
const COLUMNS: &str =
    "id, name, total_owned, free_quantity, borrowing_enabled, created_at, updated_at";

/// Provides queries for asset ledger rows. Deleted rows are never returned.
pub struct AssetRepo;

impl AssetRepo {
    pub async fn list(pool: &PgPool) -> Result<Vec<AssetLedgerRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM asset_ledgers WHERE deleted_at IS NULL ORDER BY name, id"
        );
        sqlx::query_as::<_, AssetLedgerRow>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AssetLedgerRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM asset_ledgers WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, AssetLedgerRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new ledger with every owned unit free.
    pub async fn insert(
        tx: &mut DbTx<'_>,
        name: &str,
        total_owned: Quantity,
    ) -> Result<AssetLedgerRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO asset_ledgers (name, total_owned, free_quantity) \
             VALUES ($1, $2, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AssetLedgerRow>(&query)
            .bind(name)
            .bind(total_owned)
            .fetch_one(&mut **tx)
            .await
    }

    /// Lock one ledger row for the rest of the transaction.
    ///
    /// Callers locking several rows must go through `lock_order`.
    pub async fn lock(tx: &mut DbTx<'_>, id: DbId) -> Result<Option<AssetLedgerRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM asset_ledgers \
             WHERE id = $1 AND deleted_at IS NULL \
             FOR UPDATE"
        );
        sqlx::query_as::<_, AssetLedgerRow>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Share-lock a ledger row. Conflicts with [`AssetRepo::lock`] but not
    /// with other share locks, so submissions never block each other.
    pub async fn lock_shared(
        tx: &mut DbTx<'_>,
        id: DbId,
    ) -> Result<Option<AssetLedgerRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM asset_ledgers \
             WHERE id = $1 AND deleted_at IS NULL \
             FOR SHARE"
        );
        sqlx::query_as::<_, AssetLedgerRow>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Write the engine's figures back to the locked row.
    pub async fn write_ledger(tx: &mut DbTx<'_>, state: &LedgerState) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE asset_ledgers \
             SET total_owned = $2, free_quantity = $3, borrowing_enabled = $4 \
             WHERE id = $1",
        )
        .bind(state.asset_id())
        .bind(state.total_owned())
        .bind(state.free_quantity())
        .bind(state.borrowing_enabled())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Soft-delete so holds and activity history keep their asset reference.
    pub async fn soft_delete(tx: &mut DbTx<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE asset_ledgers SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
