//! Repository for `events` and `event_allocations`.

use sqlx::PgPool;
use stockroom_core::event_allocation::{AllocationLine, EventStatus};
use stockroom_core::types::{DbId, Quantity};

use crate::models::event::{CreateEvent, EventAllocationRow, EventRow};
use crate::DbTx;

const COLUMNS: &str = "id, name, status_id, starts_at, completed_at, created_at, updated_at";

const ALLOCATION_COLUMNS: &str = "\
    id, event_id, asset_id, quantity, unit_cost_cents, returned_quantity, hold_id, \
    created_at, updated_at";

pub struct EventRepo;

impl EventRepo {
    pub async fn create(pool: &PgPool, input: &CreateEvent) -> Result<EventRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO events (name, status_id, starts_at) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(input.name.trim())
            .bind(EventStatus::Planned.id())
            .bind(input.starts_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EventRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn lock(tx: &mut DbTx<'_>, id: DbId) -> Result<Option<EventRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn set_status(
        tx: &mut DbTx<'_>,
        id: DbId,
        status: EventStatus,
    ) -> Result<EventRow, sqlx::Error> {
        let query = format!(
            "UPDATE events \
             SET status_id = $2, \
                 completed_at = CASE WHEN $2 = $3 THEN NOW() ELSE completed_at END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(id)
            .bind(status.id())
            .bind(EventStatus::Completed.id())
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn list_allocations(
        pool: &PgPool,
        event_id: DbId,
    ) -> Result<Vec<EventAllocationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ALLOCATION_COLUMNS} FROM event_allocations WHERE event_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, EventAllocationRow>(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_allocations_in_tx(
        tx: &mut DbTx<'_>,
        event_id: DbId,
    ) -> Result<Vec<EventAllocationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ALLOCATION_COLUMNS} FROM event_allocations WHERE event_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, EventAllocationRow>(&query)
            .bind(event_id)
            .fetch_all(&mut **tx)
            .await
    }

    pub async fn find_allocation(
        tx: &mut DbTx<'_>,
        event_id: DbId,
        line_id: DbId,
    ) -> Result<Option<EventAllocationRow>, sqlx::Error> {
        let query = format!(
            "SELECT {ALLOCATION_COLUMNS} FROM event_allocations WHERE id = $1 AND event_id = $2"
        );
        sqlx::query_as::<_, EventAllocationRow>(&query)
            .bind(line_id)
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await
    }

    pub async fn insert_allocation(
        tx: &mut DbTx<'_>,
        event_id: DbId,
        line: &AllocationLine,
        hold_id: DbId,
    ) -> Result<EventAllocationRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO event_allocations (event_id, asset_id, quantity, unit_cost_cents, hold_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ALLOCATION_COLUMNS}"
        );
        sqlx::query_as::<_, EventAllocationRow>(&query)
            .bind(event_id)
            .bind(line.asset_id)
            .bind(line.quantity)
            .bind(line.unit_cost_cents)
            .bind(hold_id)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn set_allocation_quantity(
        tx: &mut DbTx<'_>,
        line_id: DbId,
        quantity: Quantity,
    ) -> Result<EventAllocationRow, sqlx::Error> {
        let query = format!(
            "UPDATE event_allocations SET quantity = $2 WHERE id = $1 RETURNING {ALLOCATION_COLUMNS}"
        );
        sqlx::query_as::<_, EventAllocationRow>(&query)
            .bind(line_id)
            .bind(quantity)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn set_returned(
        tx: &mut DbTx<'_>,
        line_id: DbId,
        returned_quantity: Quantity,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE event_allocations SET returned_quantity = $2 WHERE id = $1")
            .bind(line_id)
            .bind(returned_quantity)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn delete_allocation(tx: &mut DbTx<'_>, line_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM event_allocations WHERE id = $1")
            .bind(line_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
