//! Maintenance, repair and issue tickets.
//!
//! ```text
//! open -> Scheduled -> InProgress -> Completed (release)
//!                   \-------------> Scrapped  (consume)
//! ```

use sqlx::PgPool;
use stockroom_core::error::CoreError;
use stockroom_core::ledger::{LedgerError, ReservationLine};
use stockroom_core::tickets::{self, TicketStatus};
use stockroom_core::types::{DbId, Quantity};

use crate::coordinator::{Committed, Coordinator, LockedLedgers};
use crate::error::{StoreError, StoreResult};
use crate::models::ticket::{OpenTicket, TicketRow};
use crate::repositories::TicketRepo;
use crate::DbTx;

pub struct TicketWorkflow;

impl TicketWorkflow {
    /// Open a ticket and reserve its units from free.
    pub async fn open(
        ledger: &Coordinator,
        input: &OpenTicket,
        opened_by: Option<DbId>,
    ) -> StoreResult<Committed<TicketRow>> {
        if input.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity {
                quantity: input.quantity,
                reason: "ticket quantity must be positive",
            }
            .into());
        }
        let mut tx = ledger.begin().await?;
        let mut ledgers = LockedLedgers::acquire(&mut tx, [input.asset_id]).await?;
        let ticket = TicketRepo::insert(
            &mut tx,
            input.kind,
            input.asset_id,
            input.quantity,
            input.description.as_deref(),
            opened_by,
        )
        .await?;
        let slot = ledgers.reserve(&ReservationLine {
            asset_id: input.asset_id,
            kind: input.kind.hold_kind(),
            quantity: input.quantity,
            owner_ref: Some(ticket.id),
        })?;
        ledgers.persist(&mut tx).await?;
        let hold_id = ledgers.hold_id(input.asset_id, slot)?;
        let ticket = TicketRepo::set_hold(&mut tx, ticket.id, hold_id).await?;
        tx.commit().await?;

        tracing::info!(
            ticket_id = ticket.id,
            asset_id = ticket.asset_id,
            kind = ?input.kind,
            quantity = ticket.quantity,
            "Ticket opened"
        );
        Ok(Committed {
            value: ticket,
            changes: ledgers.into_changes(),
        })
    }

    pub async fn get(pool: &PgPool, id: DbId) -> StoreResult<TicketRow> {
        TicketRepo::find_by_id(pool, id)
            .await?
            .ok_or_else(|| StoreError::not_found("Ticket", id))
    }

    /// Change the held quantity of an open ticket.
    pub async fn edit_quantity(
        ledger: &Coordinator,
        id: DbId,
        quantity: Quantity,
    ) -> StoreResult<Committed<TicketRow>> {
        let mut tx = ledger.begin().await?;
        let (ticket, status) = lock_ticket(&mut tx, id).await?;
        tickets::ensure_open(status)?;
        let hold_id = ticket_hold(&ticket)?;

        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[hold_id]).await?;
        ledgers.adjust(hold_id, quantity)?;
        ledgers.persist(&mut tx).await?;
        let ticket = TicketRepo::set_quantity(&mut tx, id, quantity).await?;
        tx.commit().await?;

        tracing::info!(ticket_id = id, quantity, "Ticket quantity adjusted");
        Ok(Committed {
            value: ticket,
            changes: ledgers.into_changes(),
        })
    }

    /// Scheduled -> InProgress. No ledger effect.
    pub async fn start(ledger: &Coordinator, id: DbId) -> StoreResult<TicketRow> {
        let mut tx = ledger.begin().await?;
        let (ticket, status) = lock_ticket(&mut tx, id).await?;
        tickets::validate_transition(status, TicketStatus::InProgress)?;
        let ticket =
            TicketRepo::set_status(&mut tx, id, TicketStatus::InProgress, ticket.scrapped_quantity)
                .await?;
        tx.commit().await?;

        tracing::info!(ticket_id = id, "Ticket started");
        Ok(ticket)
    }

    /// Close the ticket and return every held unit to free.
    pub async fn resolve(ledger: &Coordinator, id: DbId) -> StoreResult<Committed<TicketRow>> {
        let mut tx = ledger.begin().await?;
        let (ticket, status) = lock_ticket(&mut tx, id).await?;
        tickets::validate_transition(status, TicketStatus::Completed)?;
        let hold_id = ticket_hold(&ticket)?;

        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[hold_id]).await?;
        ledgers.release(hold_id)?;
        ledgers.persist(&mut tx).await?;
        let ticket = TicketRepo::set_status(&mut tx, id, TicketStatus::Completed, 0).await?;
        tx.commit().await?;

        tracing::info!(ticket_id = id, "Ticket resolved");
        Ok(Committed {
            value: ticket,
            changes: ledgers.into_changes(),
        })
    }

    /// Write off `scrapped` units permanently; the rest return to free.
    pub async fn scrap(
        ledger: &Coordinator,
        id: DbId,
        scrapped: Quantity,
    ) -> StoreResult<Committed<TicketRow>> {
        let mut tx = ledger.begin().await?;
        let (ticket, status) = lock_ticket(&mut tx, id).await?;
        tickets::validate_transition(status, TicketStatus::Scrapped)?;
        tickets::validate_scrap(ticket.quantity, scrapped)?;
        let hold_id = ticket_hold(&ticket)?;

        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[hold_id]).await?;
        ledgers.consume(hold_id, scrapped)?;
        ledgers.persist(&mut tx).await?;
        let ticket = TicketRepo::set_status(&mut tx, id, TicketStatus::Scrapped, scrapped).await?;
        tx.commit().await?;

        tracing::info!(ticket_id = id, scrapped, "Ticket scrapped");
        Ok(Committed {
            value: ticket,
            changes: ledgers.into_changes(),
        })
    }

    /// Remove an open ticket, releasing its hold first.
    pub async fn delete(ledger: &Coordinator, id: DbId) -> StoreResult<Committed<()>> {
        let mut tx = ledger.begin().await?;
        let (ticket, status) = lock_ticket(&mut tx, id).await?;
        tickets::ensure_open(status)?;

        let changes = match ticket.hold_id {
            Some(hold_id) => {
                let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[hold_id]).await?;
                ledgers.release(hold_id)?;
                ledgers.persist(&mut tx).await?;
                ledgers.into_changes()
            }
            None => Vec::new(),
        };
        TicketRepo::delete(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(ticket_id = id, "Ticket deleted");
        Ok(Committed { value: (), changes })
    }
}

async fn lock_ticket(tx: &mut DbTx<'_>, id: DbId) -> StoreResult<(TicketRow, TicketStatus)> {
    let ticket = TicketRepo::lock(tx, id)
        .await?
        .ok_or_else(|| StoreError::not_found("Ticket", id))?;
    let status = TicketStatus::from_id(ticket.status_id).ok_or_else(|| {
        CoreError::Internal(format!(
            "ticket {} has unknown status_id {}",
            ticket.id, ticket.status_id
        ))
    })?;
    Ok((ticket, status))
}

fn ticket_hold(ticket: &TicketRow) -> StoreResult<DbId> {
    ticket.hold_id.ok_or_else(|| {
        CoreError::Internal(format!("open ticket {} has no hold", ticket.id)).into()
    })
}
