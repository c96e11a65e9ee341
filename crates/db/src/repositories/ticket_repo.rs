//! Repository for the `tickets` table.

use sqlx::PgPool;
use stockroom_core::tickets::{TicketKind, TicketStatus};
use stockroom_core::types::{DbId, Quantity};

use crate::models::ticket::TicketRow;
use crate::DbTx;

const COLUMNS: &str = "\
    id, kind_id, status_id, asset_id, quantity, description, hold_id, \
    scrapped_quantity, opened_by, resolved_at, created_at, updated_at";

pub struct TicketRepo;

impl TicketRepo {
    pub async fn insert(
        tx: &mut DbTx<'_>,
        kind: TicketKind,
        asset_id: DbId,
        quantity: Quantity,
        description: Option<&str>,
        opened_by: Option<DbId>,
    ) -> Result<TicketRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tickets (kind_id, status_id, asset_id, quantity, description, opened_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TicketRow>(&query)
            .bind(kind.id())
            .bind(TicketStatus::Scheduled.id())
            .bind(asset_id)
            .bind(quantity)
            .bind(description)
            .bind(opened_by)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TicketRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tickets WHERE id = $1");
        sqlx::query_as::<_, TicketRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn lock(tx: &mut DbTx<'_>, id: DbId) -> Result<Option<TicketRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tickets WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, TicketRow>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn set_hold(tx: &mut DbTx<'_>, id: DbId, hold_id: DbId) -> Result<TicketRow, sqlx::Error> {
        let query = format!("UPDATE tickets SET hold_id = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, TicketRow>(&query)
            .bind(id)
            .bind(hold_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn set_quantity(
        tx: &mut DbTx<'_>,
        id: DbId,
        quantity: Quantity,
    ) -> Result<TicketRow, sqlx::Error> {
        let query = format!("UPDATE tickets SET quantity = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, TicketRow>(&query)
            .bind(id)
            .bind(quantity)
            .fetch_one(&mut **tx)
            .await
    }

    /// Move to `status`. Closing statuses stamp `resolved_at`.
    pub async fn set_status(
        tx: &mut DbTx<'_>,
        id: DbId,
        status: TicketStatus,
        scrapped_quantity: Quantity,
    ) -> Result<TicketRow, sqlx::Error> {
        let query = format!(
            "UPDATE tickets \
             SET status_id = $2, scrapped_quantity = $3, \
                 resolved_at = CASE WHEN $4 THEN NOW() ELSE resolved_at END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TicketRow>(&query)
            .bind(id)
            .bind(status.id())
            .bind(scrapped_quantity)
            .bind(!status.is_open())
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn delete(tx: &mut DbTx<'_>, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
