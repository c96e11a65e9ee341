//! Repository for the append-only `activity_logs` table.

use sqlx::PgPool;
use stockroom_core::types::DbId;

use crate::models::activity::{ActivityListQuery, ActivityLogRow, NewActivityLog};

const COLUMNS: &str = "\
    id, asset_id, action, hold_kind_id, owner_ref, field, old_value, new_value, \
    actor_id, created_at";

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

pub struct ActivityRepo;

impl ActivityRepo {
    pub async fn insert(pool: &PgPool, entry: &NewActivityLog) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO activity_logs \
                (asset_id, action, hold_kind_id, owner_ref, field, old_value, new_value, actor_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id",
        )
        .bind(entry.asset_id)
        .bind(&entry.action)
        .bind(entry.hold_kind_id)
        .bind(entry.owner_ref)
        .bind(&entry.field)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(entry.actor_id)
        .fetch_one(pool)
        .await
    }

    /// Newest first.
    pub async fn list_for_asset(
        pool: &PgPool,
        asset_id: DbId,
        params: &ActivityListQuery,
    ) -> Result<Vec<ActivityLogRow>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM activity_logs \
             WHERE asset_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ActivityLogRow>(&query)
            .bind(asset_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
