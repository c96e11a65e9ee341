//! Integration tests for the consumer workflows.

use std::time::Duration;

use assert_matches::assert_matches;
use sqlx::PgPool;
use stockroom_core::borrowing::{BorrowLine, BorrowingStatus};
use stockroom_core::error::CoreError;
use stockroom_core::event_allocation::{AllocationLine, EventStatus};
use stockroom_core::ledger::{HoldKind, HoldStatus, LedgerError, ReservationLine};
use stockroom_core::tickets::{TicketKind, TicketStatus};
use stockroom_core::types::{DbId, Quantity};
use stockroom_db::coordinator::Coordinator;
use stockroom_db::error::StoreError;
use stockroom_db::models::asset::{CreateAsset, SetBorrowing};
use stockroom_db::models::borrowing::{LostLine, ReturnBorrowingRequest, SubmitBorrowingRequest};
use stockroom_db::models::event::{CompleteEvent, CreateEvent, LineReturn};
use stockroom_db::models::outgoing::CreateOutgoing;
use stockroom_db::models::ticket::OpenTicket;
use stockroom_db::repositories::{AssetRepo, HoldRepo};
use stockroom_db::workflows::{BorrowingWorkflow, EventWorkflow, OutgoingWorkflow, TicketWorkflow};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn coordinator(pool: &PgPool) -> Coordinator {
    Coordinator::new(pool.clone(), Duration::from_secs(5))
}

async fn asset(ledger: &Coordinator, name: &str, total: Quantity) -> DbId {
    ledger
        .register(&CreateAsset {
            name: name.to_string(),
            total_owned: total,
        })
        .await
        .unwrap()
        .value
        .id
}

async fn enable_pool(ledger: &Coordinator, asset_id: DbId, size: Quantity) {
    ledger
        .set_borrowing(
            asset_id,
            &SetBorrowing {
                enabled: true,
                pool_size: Some(size),
            },
        )
        .await
        .unwrap();
}

async fn figures(pool: &PgPool, asset_id: DbId) -> (Quantity, Quantity) {
    let row = AssetRepo::find_by_id(pool, asset_id).await.unwrap().unwrap();
    (row.total_owned, row.free_quantity)
}

async fn allocate_one(ledger: &Coordinator, event_id: DbId, asset_id: DbId, quantity: Quantity) -> DbId {
    EventWorkflow::allocate(
        ledger,
        event_id,
        &[AllocationLine {
            asset_id,
            quantity,
            unit_cost_cents: None,
        }],
    )
    .await
    .unwrap()
    .value
    .allocations
    .last()
    .unwrap()
    .id
}

fn borrow_request(lines: Vec<BorrowLine>) -> SubmitBorrowingRequest {
    SubmitBorrowingRequest {
        requester_name: "Scout troop 12".to_string(),
        requester_contact: Some("leader@example.com".to_string()),
        purpose: Some("Weekend camp".to_string()),
        collect_at: None,
        expected_return_at: None,
        lines,
    }
}

// ---------------------------------------------------------------------------
// Borrowing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_borrowing_lifecycle_with_loss(pool: PgPool) {
    let ledger = coordinator(&pool);
    let tents = asset(&ledger, "Tent", 10).await;
    enable_pool(&ledger, tents, 6).await;

    let submitted = BorrowingWorkflow::submit(
        &ledger,
        &borrow_request(vec![BorrowLine {
            asset_id: tents,
            quantity: 4,
        }]),
    )
    .await
    .unwrap();
    assert_eq!(submitted.request.status_id, BorrowingStatus::Pending.id());
    assert!(HoldRepo::list_active(&pool, tents, Some(HoldKind::BorrowingRequest))
        .await
        .unwrap()
        .is_empty());

    let approved = BorrowingWorkflow::approve(&ledger, submitted.request.id, Some(9))
        .await
        .unwrap();
    assert_eq!(approved.value.request.status_id, BorrowingStatus::Approved.id());
    assert_eq!(approved.value.request.decided_by, Some(9));
    let line = &approved.value.lines[0];
    assert!(line.hold_id.is_some());
    assert_eq!(
        HoldRepo::sum_active(&pool, tents, Some(HoldKind::BorrowingRequest))
            .await
            .unwrap(),
        4
    );
    assert_eq!(figures(&pool, tents).await, (10, 4));

    let returned = BorrowingWorkflow::return_request(
        &ledger,
        submitted.request.id,
        &ReturnBorrowingRequest {
            lost: vec![LostLine {
                line_id: line.id,
                lost_quantity: 1,
            }],
        },
    )
    .await
    .unwrap();
    assert_eq!(returned.value.request.status_id, BorrowingStatus::Returned.id());
    assert!(returned.value.request.returned_at.is_some());
    assert_eq!(returned.value.lines[0].lost_quantity, 1);

    // One tent lost: total shrinks, the pool shrinks with it, free is unchanged.
    assert_eq!(figures(&pool, tents).await, (9, 4));
    let pool_hold = HoldRepo::list_active(&pool, tents, Some(HoldKind::BorrowingPool))
        .await
        .unwrap();
    assert_eq!(pool_hold[0].quantity, 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_approval_is_all_or_nothing(pool: PgPool) {
    let ledger = coordinator(&pool);
    let a = asset(&ledger, "Lantern", 10).await;
    let b = asset(&ledger, "Sleeping bag", 10).await;
    enable_pool(&ledger, a, 5).await;
    enable_pool(&ledger, b, 2).await;

    let request = BorrowingWorkflow::submit(
        &ledger,
        &borrow_request(vec![
            BorrowLine {
                asset_id: a,
                quantity: 3,
            },
            BorrowLine {
                asset_id: b,
                quantity: 3,
            },
        ]),
    )
    .await
    .unwrap();

    let err = BorrowingWorkflow::approve(&ledger, request.request.id, None)
        .await
        .unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::InsufficientFree { asset_id, available: 2, requested: 3 }) if *asset_id == b
    );

    let detail = BorrowingWorkflow::get(&pool, request.request.id).await.unwrap();
    assert_eq!(detail.request.status_id, BorrowingStatus::Pending.id());
    assert!(detail.lines.iter().all(|l| l.hold_id.is_none()));
    assert!(HoldRepo::list_active(&pool, a, Some(HoldKind::BorrowingRequest))
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_requires_borrowing_enabled(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Canoe", 2).await;

    let err = BorrowingWorkflow::submit(
        &ledger,
        &borrow_request(vec![BorrowLine {
            asset_id: id,
            quantity: 1,
        }]),
    )
    .await
    .unwrap_err();
    assert_matches!(err.ledger(), Some(LedgerError::BorrowingDisabled { .. }));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_request_blocks_pool_disable(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Paddle", 8).await;
    enable_pool(&ledger, id, 4).await;
    let request = BorrowingWorkflow::submit(
        &ledger,
        &borrow_request(vec![BorrowLine {
            asset_id: id,
            quantity: 2,
        }]),
    )
    .await
    .unwrap();

    let disable = SetBorrowing {
        enabled: false,
        pool_size: None,
    };
    let err = ledger.set_borrowing(id, &disable).await.unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::RequestsStillPending { blockers, .. })
            if blockers[0].owner_ref == Some(request.request.id)
    );

    BorrowingWorkflow::reject(&ledger, request.request.id, Some("No stock"), Some(3))
        .await
        .unwrap();
    let disabled = ledger.set_borrowing(id, &disable).await.unwrap();
    assert!(!disabled.value.borrowing_enabled);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_edit_line_pending_and_approved(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Cooler", 10).await;
    enable_pool(&ledger, id, 5).await;
    let request = BorrowingWorkflow::submit(
        &ledger,
        &borrow_request(vec![BorrowLine {
            asset_id: id,
            quantity: 2,
        }]),
    )
    .await
    .unwrap();
    let request_id = request.request.id;
    let line_id = request.lines[0].id;

    // Pending lines are rewritten without touching the ledger.
    let edited = BorrowingWorkflow::edit_line_quantity(&ledger, request_id, line_id, 9)
        .await
        .unwrap();
    assert_eq!(edited.value.quantity, 9);
    assert!(edited.changes.is_empty());

    BorrowingWorkflow::edit_line_quantity(&ledger, request_id, line_id, 3)
        .await
        .unwrap();
    BorrowingWorkflow::approve(&ledger, request_id, None)
        .await
        .unwrap();

    // Approved lines adjust their hold within the pool.
    let err = BorrowingWorkflow::edit_line_quantity(&ledger, request_id, line_id, 6)
        .await
        .unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::InsufficientFree {
            available: 5,
            requested: 6,
            ..
        })
    );
    BorrowingWorkflow::edit_line_quantity(&ledger, request_id, line_id, 5)
        .await
        .unwrap();
    assert_eq!(
        HoldRepo::sum_active(&pool, id, Some(HoldKind::BorrowingRequest))
            .await
            .unwrap(),
        5
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reject_after_approval_conflicts(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Kayak", 3).await;
    enable_pool(&ledger, id, 3).await;
    let request = BorrowingWorkflow::submit(
        &ledger,
        &borrow_request(vec![BorrowLine {
            asset_id: id,
            quantity: 1,
        }]),
    )
    .await
    .unwrap();
    BorrowingWorkflow::approve(&ledger, request.request.id, None)
        .await
        .unwrap();

    let err = BorrowingWorkflow::reject(&ledger, request.request.id, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Conflict(_)));
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_event_allocation_complete(pool: PgPool) {
    let ledger = coordinator(&pool);
    let plates = asset(&ledger, "Plate", 20).await;
    let chairs = asset(&ledger, "Chair", 10).await;

    let event = EventWorkflow::create(
        &pool,
        &CreateEvent {
            name: "Spring fair".to_string(),
            starts_at: None,
        },
    )
    .await
    .unwrap();

    let allocated = EventWorkflow::allocate(
        &ledger,
        event.id,
        &[
            AllocationLine {
                asset_id: plates,
                quantity: 10,
                unit_cost_cents: Some(120),
            },
            AllocationLine {
                asset_id: chairs,
                quantity: 8,
                unit_cost_cents: None,
            },
        ],
    )
    .await
    .unwrap();
    assert_eq!(allocated.value.allocations.len(), 2);
    assert_eq!(figures(&pool, plates).await, (20, 10));
    assert_eq!(figures(&pool, chairs).await, (10, 2));

    let line_for = |asset_id: DbId| {
        allocated
            .value
            .allocations
            .iter()
            .find(|l| l.asset_id == asset_id)
            .unwrap()
            .id
    };
    let plate_return = LineReturn {
        line_id: line_for(plates),
        returned_quantity: 6,
    };

    // Every line needs a returned quantity.
    let err = EventWorkflow::complete(
        &ledger,
        event.id,
        &CompleteEvent {
            returns: vec![plate_return.clone()],
        },
    )
    .await
    .unwrap_err();
    assert_matches!(
        err,
        StoreError::Core(CoreError::Validation(msg)) if msg.contains(&line_for(chairs).to_string())
    );
    assert_eq!(figures(&pool, plates).await, (20, 10));
    assert_eq!(
        EventWorkflow::get(&pool, event.id).await.unwrap().event.status_id,
        EventStatus::Planned.id()
    );

    let completed = EventWorkflow::complete(
        &ledger,
        event.id,
        &CompleteEvent {
            returns: vec![
                plate_return,
                LineReturn {
                    line_id: line_for(chairs),
                    returned_quantity: 8,
                },
            ],
        },
    )
    .await
    .unwrap();
    assert_eq!(completed.value.event.status_id, EventStatus::Completed.id());
    assert!(completed.value.event.completed_at.is_some());

    // Four plates used up; every chair came back.
    assert_eq!(figures(&pool, plates).await, (16, 16));
    assert_eq!(figures(&pool, chairs).await, (10, 10));

    let err = EventWorkflow::cancel(&ledger, event.id).await.unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Conflict(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_event_allocation_failure_leaves_no_trace(pool: PgPool) {
    let ledger = coordinator(&pool);
    let a = asset(&ledger, "Cup", 10).await;
    let b = asset(&ledger, "Urn", 1).await;
    let c = asset(&ledger, "Napkin", 10).await;
    let event = EventWorkflow::create(
        &pool,
        &CreateEvent {
            name: "Bake sale".to_string(),
            starts_at: None,
        },
    )
    .await
    .unwrap();

    let lines: Vec<AllocationLine> = [(a, 5), (b, 2), (c, 5)]
        .into_iter()
        .map(|(asset_id, quantity)| AllocationLine {
            asset_id,
            quantity,
            unit_cost_cents: None,
        })
        .collect();
    let err = EventWorkflow::allocate(&ledger, event.id, &lines)
        .await
        .unwrap_err();
    assert_matches!(err.ledger(), Some(LedgerError::InsufficientFree { .. }));

    let detail = EventWorkflow::get(&pool, event.id).await.unwrap();
    assert!(detail.allocations.is_empty());
    assert_eq!(figures(&pool, a).await, (10, 10));
    assert_eq!(figures(&pool, c).await, (10, 10));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_event_edit_remove_cancel(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Bench", 10).await;
    let event = EventWorkflow::create(
        &pool,
        &CreateEvent {
            name: "Picnic".to_string(),
            starts_at: None,
        },
    )
    .await
    .unwrap();
    let first = allocate_one(&ledger, event.id, id, 3).await;
    EventWorkflow::edit_line(&ledger, event.id, first, 5)
        .await
        .unwrap();
    assert_eq!(figures(&pool, id).await, (10, 5));

    EventWorkflow::remove_line(&ledger, event.id, first)
        .await
        .unwrap();
    assert_eq!(figures(&pool, id).await, (10, 10));

    allocate_one(&ledger, event.id, id, 4).await;
    let cancelled = EventWorkflow::cancel(&ledger, event.id).await.unwrap();
    assert_eq!(cancelled.value.event.status_id, EventStatus::Cancelled.id());
    assert_eq!(figures(&pool, id).await, (10, 10));
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ticket_resolve_returns_units(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Generator", 6).await;

    let ticket = TicketWorkflow::open(
        &ledger,
        &OpenTicket {
            kind: TicketKind::Maintenance,
            asset_id: id,
            quantity: 4,
            description: Some("Oil change".to_string()),
        },
        Some(2),
    )
    .await
    .unwrap()
    .value;
    assert_eq!(ticket.status_id, TicketStatus::Scheduled.id());
    assert_eq!(figures(&pool, id).await, (6, 2));

    let hold = HoldRepo::find(&pool, ticket.hold_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hold.kind_id, HoldKind::MaintenanceHold.id());
    assert_eq!(hold.owner_ref, Some(ticket.id));

    TicketWorkflow::start(&ledger, ticket.id).await.unwrap();
    TicketWorkflow::edit_quantity(&ledger, ticket.id, 3)
        .await
        .unwrap();
    assert_eq!(figures(&pool, id).await, (6, 3));

    let resolved = TicketWorkflow::resolve(&ledger, ticket.id).await.unwrap();
    assert_eq!(resolved.value.status_id, TicketStatus::Completed.id());
    assert!(resolved.value.resolved_at.is_some());
    assert_eq!(figures(&pool, id).await, (6, 6));

    let err = TicketWorkflow::delete(&ledger, ticket.id).await.unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Conflict(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ticket_scrap_consumes(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Table leg", 8).await;
    let ticket = TicketWorkflow::open(
        &ledger,
        &OpenTicket {
            kind: TicketKind::Repair,
            asset_id: id,
            quantity: 3,
            description: None,
        },
        None,
    )
    .await
    .unwrap()
    .value;

    let scrapped = TicketWorkflow::scrap(&ledger, ticket.id, 2).await.unwrap();
    assert_eq!(scrapped.value.status_id, TicketStatus::Scrapped.id());
    assert_eq!(scrapped.value.scrapped_quantity, 2);
    assert_eq!(figures(&pool, id).await, (6, 6));

    let hold = HoldRepo::find(&pool, ticket.hold_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hold.status_id, HoldStatus::Consumed.id());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ticket_delete_and_over_reserve(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Fan", 2).await;

    let err = TicketWorkflow::open(
        &ledger,
        &OpenTicket {
            kind: TicketKind::Issue,
            asset_id: id,
            quantity: 3,
            description: None,
        },
        None,
    )
    .await
    .unwrap_err();
    assert_matches!(err.ledger(), Some(LedgerError::InsufficientFree { .. }));

    let ticket = TicketWorkflow::open(
        &ledger,
        &OpenTicket {
            kind: TicketKind::Issue,
            asset_id: id,
            quantity: 2,
            description: None,
        },
        None,
    )
    .await
    .unwrap()
    .value;
    TicketWorkflow::delete(&ledger, ticket.id).await.unwrap();
    assert_eq!(figures(&pool, id).await, (2, 2));
    let err = TicketWorkflow::get(&pool, ticket.id).await.unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Outgoing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_withdraw_consumes_in_one_step(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Marker", 12).await;

    let withdrawn = OutgoingWorkflow::withdraw(
        &ledger,
        &CreateOutgoing {
            asset_id: id,
            quantity: 5,
            reason: "Donated".to_string(),
            recipient: Some("Community centre".to_string()),
        },
        Some(1),
    )
    .await
    .unwrap();
    assert_eq!(figures(&pool, id).await, (7, 7));

    let hold = HoldRepo::find(&pool, withdrawn.value.hold_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hold.kind_id, HoldKind::Outgoing.id());
    assert_eq!(hold.status_id, HoldStatus::Consumed.id());
    assert_eq!(hold.consumed_quantity, 5);

    let err = OutgoingWorkflow::withdraw(
        &ledger,
        &CreateOutgoing {
            asset_id: id,
            quantity: 8,
            reason: "Donated".to_string(),
            recipient: None,
        },
        None,
    )
    .await
    .unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::InsufficientFree {
            available: 7,
            requested: 8,
            ..
        })
    );
}

// ---------------------------------------------------------------------------
// Holds owned by workflow records
// ---------------------------------------------------------------------------

/// Release, adjust and consume through the coordinator all refuse `hold_id`.
async fn assert_direct_changes_refused(ledger: &Coordinator, hold_id: DbId, owner: &str) {
    let refused = [
        ledger.release(hold_id).await.map(|_| ()),
        ledger.adjust(hold_id, 1).await.map(|_| ()),
        ledger.consume(hold_id, 1).await.map(|_| ()),
    ];
    for result in refused {
        assert_matches!(
            result,
            Err(StoreError::Core(CoreError::Conflict(msg))) if msg.contains(owner),
            "hold {} should be managed by {}",
            hold_id,
            owner
        );
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ticket_hold_changes_only_through_ticket(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Amplifier", 6).await;
    let ticket = TicketWorkflow::open(
        &ledger,
        &OpenTicket {
            kind: TicketKind::Repair,
            asset_id: id,
            quantity: 4,
            description: None,
        },
        None,
    )
    .await
    .unwrap()
    .value;

    assert_direct_changes_refused(&ledger, ticket.hold_id.unwrap(), &format!("ticket {}", ticket.id))
        .await;
    assert_eq!(figures(&pool, id).await, (6, 2));

    let resolved = TicketWorkflow::resolve(&ledger, ticket.id).await.unwrap();
    assert_eq!(resolved.value.status_id, TicketStatus::Completed.id());
    assert_eq!(figures(&pool, id).await, (6, 6));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_event_hold_changes_only_through_event(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Tablecloth", 10).await;
    let event = EventWorkflow::create(
        &pool,
        &CreateEvent {
            name: "Gala".to_string(),
            starts_at: None,
        },
    )
    .await
    .unwrap();
    let line_id = allocate_one(&ledger, event.id, id, 5).await;
    let line = EventWorkflow::get(&pool, event.id).await.unwrap().allocations[0].clone();

    assert_direct_changes_refused(&ledger, line.hold_id, &format!("event {}", event.id)).await;
    assert_eq!(figures(&pool, id).await, (10, 5));

    EventWorkflow::complete(
        &ledger,
        event.id,
        &CompleteEvent {
            returns: vec![LineReturn {
                line_id,
                returned_quantity: 3,
            }],
        },
    )
    .await
    .unwrap();
    assert_eq!(figures(&pool, id).await, (8, 8));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_borrowing_holds_change_only_through_request_or_settings(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Kayak", 8).await;
    enable_pool(&ledger, id, 4).await;
    let submitted = BorrowingWorkflow::submit(
        &ledger,
        &borrow_request(vec![BorrowLine {
            asset_id: id,
            quantity: 2,
        }]),
    )
    .await
    .unwrap();
    let approved = BorrowingWorkflow::approve(&ledger, submitted.request.id, None)
        .await
        .unwrap();
    let loan_hold = approved.value.lines[0].hold_id.unwrap();

    assert_direct_changes_refused(
        &ledger,
        loan_hold,
        &format!("borrowing request {}", submitted.request.id),
    )
    .await;

    let pool_hold = HoldRepo::list_active(&pool, id, Some(HoldKind::BorrowingPool))
        .await
        .unwrap()[0]
        .id;
    assert_direct_changes_refused(&ledger, pool_hold, "borrowing pool").await;
    assert_eq!(figures(&pool, id).await, (8, 4));
    assert_eq!(
        HoldRepo::sum_active(&pool, id, Some(HoldKind::BorrowingRequest))
            .await
            .unwrap(),
        2
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_outgoing_hold_is_not_directly_changeable(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Pen", 10).await;
    let record = OutgoingWorkflow::withdraw(
        &ledger,
        &CreateOutgoing {
            asset_id: id,
            quantity: 3,
            reason: "Handed out".to_string(),
            recipient: None,
        },
        None,
    )
    .await
    .unwrap()
    .value;

    assert_direct_changes_refused(
        &ledger,
        record.hold_id.unwrap(),
        &format!("outgoing record {}", record.id),
    )
    .await;
    assert_eq!(figures(&pool, id).await, (7, 7));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_consumer_hold_without_owner_rejected(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Easel", 5).await;
    let err = ledger
        .reserve(&ReservationLine {
            asset_id: id,
            kind: HoldKind::EventAllocation,
            quantity: 3,
            owner_ref: None,
        })
        .await
        .unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::OwnerRequired {
            kind: HoldKind::EventAllocation
        })
    );
    assert_eq!(figures(&pool, id).await, (5, 5));
    assert!(HoldRepo::list_for_asset(&pool, id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_allocation_quantity_must_be_positive(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Stool", 5).await;
    let event = EventWorkflow::create(
        &pool,
        &CreateEvent {
            name: "Quiz night".to_string(),
            starts_at: None,
        },
    )
    .await
    .unwrap();
    let err = EventWorkflow::allocate(
        &ledger,
        event.id,
        &[AllocationLine {
            asset_id: id,
            quantity: 0,
            unit_cost_cents: None,
        }],
    )
    .await
    .unwrap_err();
    assert_matches!(err.ledger(), Some(LedgerError::InvalidQuantity { quantity: 0, .. }));
}
