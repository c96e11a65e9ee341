//! Event allocations: allocate, edit, remove, complete, cancel.

use std::collections::HashMap;

use sqlx::PgPool;
use stockroom_core::error::CoreError;
use stockroom_core::event_allocation::{self, AllocationLine, EventStatus};
use stockroom_core::ledger::{HoldKind, ReservationLine};
use stockroom_core::types::{DbId, Quantity};

use crate::coordinator::{Committed, Coordinator, LockedLedgers};
use crate::error::{StoreError, StoreResult};
use crate::models::event::{CompleteEvent, CreateEvent, EventAllocationRow, EventDetail, EventRow};
use crate::repositories::EventRepo;
use crate::DbTx;

pub struct EventWorkflow;

impl EventWorkflow {
    pub async fn create(pool: &PgPool, input: &CreateEvent) -> StoreResult<EventRow> {
        if input.name.trim().is_empty() {
            return Err(CoreError::Validation("Event name is required".into()).into());
        }
        let event = EventRepo::create(pool, input).await?;
        tracing::info!(event_id = event.id, "Event created");
        Ok(event)
    }

    pub async fn get(pool: &PgPool, id: DbId) -> StoreResult<EventDetail> {
        let event = EventRepo::find_by_id(pool, id)
            .await?
            .ok_or_else(|| StoreError::not_found("Event", id))?;
        let allocations = EventRepo::list_allocations(pool, id).await?;
        Ok(EventDetail { event, allocations })
    }

    /// Reserve every line for the event or none of them.
    pub async fn allocate(
        ledger: &Coordinator,
        event_id: DbId,
        lines: &[AllocationLine],
    ) -> StoreResult<Committed<EventDetail>> {
        event_allocation::validate_lines(lines)?;
        let mut tx = ledger.begin().await?;
        lock_planned(&mut tx, event_id).await?;

        let reservations: Vec<ReservationLine> = lines
            .iter()
            .map(|line| ReservationLine {
                asset_id: line.asset_id,
                kind: HoldKind::EventAllocation,
                quantity: line.quantity,
                owner_ref: Some(event_id),
            })
            .collect();
        let mut ledgers =
            LockedLedgers::acquire(&mut tx, reservations.iter().map(|r| r.asset_id)).await?;
        let slots = ledgers.reserve_all(&reservations)?;
        ledgers.persist(&mut tx).await?;
        for (line, &(asset_id, slot)) in lines.iter().zip(&slots) {
            let hold_id = ledgers.hold_id(asset_id, slot)?;
            EventRepo::insert_allocation(&mut tx, event_id, line, hold_id).await?;
        }
        tx.commit().await?;

        tracing::info!(event_id, lines = lines.len(), "Event allocation reserved");
        let detail = Self::get(ledger.pool(), event_id).await?;
        Ok(Committed {
            value: detail,
            changes: ledgers.into_changes(),
        })
    }

    /// Change one allocation's quantity by adjusting its hold.
    pub async fn edit_line(
        ledger: &Coordinator,
        event_id: DbId,
        line_id: DbId,
        quantity: Quantity,
    ) -> StoreResult<Committed<EventAllocationRow>> {
        let mut tx = ledger.begin().await?;
        lock_planned(&mut tx, event_id).await?;
        let line = find_line(&mut tx, event_id, line_id).await?;

        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[line.hold_id]).await?;
        ledgers.adjust(line.hold_id, quantity)?;
        ledgers.persist(&mut tx).await?;
        let line = EventRepo::set_allocation_quantity(&mut tx, line_id, quantity).await?;
        tx.commit().await?;

        tracing::info!(event_id, line_id, quantity, "Event allocation adjusted");
        Ok(Committed {
            value: line,
            changes: ledgers.into_changes(),
        })
    }

    /// Release one allocation and drop the line. The hold stays as history.
    pub async fn remove_line(
        ledger: &Coordinator,
        event_id: DbId,
        line_id: DbId,
    ) -> StoreResult<Committed<()>> {
        let mut tx = ledger.begin().await?;
        lock_planned(&mut tx, event_id).await?;
        let line = find_line(&mut tx, event_id, line_id).await?;

        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &[line.hold_id]).await?;
        ledgers.release(line.hold_id)?;
        ledgers.persist(&mut tx).await?;
        EventRepo::delete_allocation(&mut tx, line_id).await?;
        tx.commit().await?;

        tracing::info!(event_id, line_id, "Event allocation removed");
        Ok(Committed {
            value: (),
            changes: ledgers.into_changes(),
        })
    }

    /// Planned -> Completed. Each line consumes what did not come back.
    ///
    /// `returns` must name every allocation line exactly once.
    pub async fn complete(
        ledger: &Coordinator,
        event_id: DbId,
        input: &CompleteEvent,
    ) -> StoreResult<Committed<EventDetail>> {
        let mut tx = ledger.begin().await?;
        lock_planned(&mut tx, event_id).await?;
        let lines = EventRepo::list_allocations_in_tx(&mut tx, event_id).await?;

        let mut returned: HashMap<DbId, Quantity> = HashMap::new();
        for entry in &input.returns {
            if !lines.iter().any(|l| l.id == entry.line_id) {
                return Err(CoreError::Validation(format!(
                    "Line {} does not belong to event {event_id}",
                    entry.line_id
                ))
                .into());
            }
            if returned.insert(entry.line_id, entry.returned_quantity).is_some() {
                return Err(CoreError::Validation(format!(
                    "Line {} is listed more than once",
                    entry.line_id
                ))
                .into());
            }
        }

        let mut plan = Vec::with_capacity(lines.len());
        let mut missing = Vec::new();
        for line in &lines {
            match returned.get(&line.id) {
                Some(&back) => {
                    let used = event_allocation::consumed_on_completion(line.quantity, back)?;
                    plan.push((line, back, used));
                }
                None => missing.push(line.id.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(CoreError::Validation(format!(
                "A returned quantity is required for every line; missing lines {}",
                missing.join(", ")
            ))
            .into());
        }

        let hold_ids: Vec<DbId> = lines.iter().map(|l| l.hold_id).collect();
        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &hold_ids).await?;
        for &(line, _, used) in &plan {
            ledgers.consume(line.hold_id, used)?;
        }
        ledgers.persist(&mut tx).await?;
        for &(line, back, _) in &plan {
            EventRepo::set_returned(&mut tx, line.id, back).await?;
        }
        EventRepo::set_status(&mut tx, event_id, EventStatus::Completed).await?;
        tx.commit().await?;

        let consumed: Quantity = plan.iter().map(|&(_, _, used)| used).sum();
        tracing::info!(event_id, consumed, "Event completed");
        let detail = Self::get(ledger.pool(), event_id).await?;
        Ok(Committed {
            value: detail,
            changes: ledgers.into_changes(),
        })
    }

    /// Planned -> Cancelled. Every allocation is released.
    pub async fn cancel(ledger: &Coordinator, event_id: DbId) -> StoreResult<Committed<EventDetail>> {
        let mut tx = ledger.begin().await?;
        lock_planned(&mut tx, event_id).await?;
        let lines = EventRepo::list_allocations_in_tx(&mut tx, event_id).await?;

        let hold_ids: Vec<DbId> = lines.iter().map(|l| l.hold_id).collect();
        let mut ledgers = LockedLedgers::acquire_for_holds(&mut tx, &hold_ids).await?;
        for &hold_id in &hold_ids {
            ledgers.release(hold_id)?;
        }
        ledgers.persist(&mut tx).await?;
        EventRepo::set_status(&mut tx, event_id, EventStatus::Cancelled).await?;
        tx.commit().await?;

        tracing::info!(event_id, lines = lines.len(), "Event cancelled");
        let detail = Self::get(ledger.pool(), event_id).await?;
        Ok(Committed {
            value: detail,
            changes: ledgers.into_changes(),
        })
    }
}

/// Lock the event row and require it to still be Planned.
async fn lock_planned(tx: &mut DbTx<'_>, event_id: DbId) -> StoreResult<EventRow> {
    let event = EventRepo::lock(tx, event_id)
        .await?
        .ok_or_else(|| StoreError::not_found("Event", event_id))?;
    let status = EventStatus::from_id(event.status_id).ok_or_else(|| {
        CoreError::Internal(format!(
            "event {} has unknown status_id {}",
            event.id, event.status_id
        ))
    })?;
    event_allocation::ensure_planned(status)?;
    Ok(event)
}

async fn find_line(
    tx: &mut DbTx<'_>,
    event_id: DbId,
    line_id: DbId,
) -> StoreResult<EventAllocationRow> {
    EventRepo::find_allocation(tx, event_id, line_id)
        .await?
        .ok_or_else(|| StoreError::not_found("EventAllocation", line_id))
}
