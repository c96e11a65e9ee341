//! Repository for the `outgoing_records` table.

use stockroom_core::types::DbId;

use crate::models::outgoing::{CreateOutgoing, OutgoingRow};
use crate::DbTx;

const COLUMNS: &str = "id, asset_id, quantity, reason, recipient, hold_id, created_by, created_at";

pub struct OutgoingRepo;

impl OutgoingRepo {
    pub async fn insert(
        tx: &mut DbTx<'_>,
        input: &CreateOutgoing,
        created_by: Option<DbId>,
    ) -> Result<OutgoingRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO outgoing_records (asset_id, quantity, reason, recipient, created_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutgoingRow>(&query)
            .bind(input.asset_id)
            .bind(input.quantity)
            .bind(input.reason.trim())
            .bind(&input.recipient)
            .bind(created_by)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn set_hold(
        tx: &mut DbTx<'_>,
        id: DbId,
        hold_id: DbId,
    ) -> Result<OutgoingRow, sqlx::Error> {
        let query = format!(
            "UPDATE outgoing_records SET hold_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OutgoingRow>(&query)
            .bind(id)
            .bind(hold_id)
            .fetch_one(&mut **tx)
            .await
    }
}
