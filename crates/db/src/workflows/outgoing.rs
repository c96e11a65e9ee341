//! Permanent withdrawals.

use stockroom_core::ledger::{HoldKind, ReservationLine};
use stockroom_core::outgoing;
use stockroom_core::types::DbId;

use crate::coordinator::{Committed, Coordinator, LockedLedgers};
use crate::error::StoreResult;
use crate::models::outgoing::{CreateOutgoing, OutgoingRow};
use crate::repositories::OutgoingRepo;

pub struct OutgoingWorkflow;

impl OutgoingWorkflow {
    /// Reserve an outgoing hold and consume it in full, in one transaction.
    pub async fn withdraw(
        ledger: &Coordinator,
        input: &CreateOutgoing,
        created_by: Option<DbId>,
    ) -> StoreResult<Committed<OutgoingRow>> {
        outgoing::validate_withdrawal(input.quantity, &input.reason)?;

        let mut tx = ledger.begin().await?;
        let mut ledgers = LockedLedgers::acquire(&mut tx, [input.asset_id]).await?;
        let record = OutgoingRepo::insert(&mut tx, input, created_by).await?;
        let slot = ledgers.reserve(&ReservationLine {
            asset_id: input.asset_id,
            kind: HoldKind::Outgoing,
            quantity: input.quantity,
            owner_ref: Some(record.id),
        })?;
        ledgers.consume_slot(input.asset_id, slot, input.quantity)?;
        ledgers.persist(&mut tx).await?;
        let hold_id = ledgers.hold_id(input.asset_id, slot)?;
        let record = OutgoingRepo::set_hold(&mut tx, record.id, hold_id).await?;
        tx.commit().await?;

        tracing::info!(
            outgoing_id = record.id,
            asset_id = record.asset_id,
            quantity = record.quantity,
            "Units withdrawn"
        );
        Ok(Committed {
            value: record,
            changes: ledgers.into_changes(),
        })
    }
}
