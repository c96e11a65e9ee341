//! Integration tests for the Reservation Coordinator against a real database.
//!
//! Covers the four primitives, batch atomicity, pool rules, deletion guards,
//! and concurrent reservations racing for the same units.

use std::time::Duration;

use assert_matches::assert_matches;
use sqlx::PgPool;
use stockroom_core::activity::{LedgerAction, LedgerField};
use stockroom_core::error::CoreError;
use stockroom_core::ledger::{HoldKind, HoldStatus, LedgerError, ReservationLine};
use stockroom_core::types::{DbId, Quantity};
use stockroom_db::coordinator::Coordinator;
use stockroom_db::error::StoreError;
use stockroom_db::models::asset::{CreateAsset, SetBorrowing};
use stockroom_db::repositories::{AssetRepo, HoldRepo};

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

fn line(asset_id: DbId, kind: HoldKind, quantity: Quantity, owner: DbId) -> ReservationLine {
    ReservationLine {
        asset_id,
        kind,
        quantity,
        owner_ref: Some(owner),
    }
}

async fn free(pool: &PgPool, asset_id: DbId) -> Quantity {
    AssetRepo::find_by_id(pool, asset_id)
        .await
        .unwrap()
        .unwrap()
        .free_quantity
}

/// total_owned == free_quantity + active holds drawing from free.
async fn assert_conserved(pool: &PgPool, asset_id: DbId) {
    let row = AssetRepo::find_by_id(pool, asset_id).await.unwrap().unwrap();
    let held = HoldRepo::sum_active(pool, asset_id, None).await.unwrap()
        - HoldRepo::sum_active(pool, asset_id, Some(HoldKind::BorrowingRequest))
            .await
            .unwrap();
    assert_eq!(
        row.total_owned,
        row.free_quantity + held,
        "conservation broken for asset {asset_id}"
    );
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_register_starts_fully_free(pool: PgPool) {
    let ledger = coordinator(&pool);
    let committed = ledger
        .register(&CreateAsset {
            name: "  Folding table ".to_string(),
            total_owned: 12,
        })
        .await
        .unwrap();

    assert_eq!(committed.value.name, "Folding table");
    assert_eq!(committed.value.free_quantity, 12);
    assert_eq!(committed.changes.len(), 1);
    assert_eq!(committed.changes[0].action, LedgerAction::Register);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reserve_and_release(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Projector", 10).await;

    let reserved = ledger
        .reserve(&line(id, HoldKind::MaintenanceHold, 4, 1))
        .await
        .unwrap();
    assert_eq!(reserved.value.ledger.free_quantity, 6);
    assert!(reserved
        .changes
        .iter()
        .any(|c| c.field == LedgerField::FreeQuantity && c.new_value == 6));
    assert_conserved(&pool, id).await;

    let released = ledger.release(reserved.value.hold_id).await.unwrap();
    assert_eq!(released.value.released, 4);
    assert_eq!(free(&pool, id).await, 10);

    let hold = HoldRepo::find(&pool, reserved.value.hold_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hold.status_id, HoldStatus::Released.id());
    assert!(hold.settled_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_release_is_idempotent(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Speaker", 5).await;
    let hold_id = ledger
        .reserve(&line(id, HoldKind::RepairHold, 2, 1))
        .await
        .unwrap()
        .value
        .hold_id;

    ledger.release(hold_id).await.unwrap();
    let again = ledger.release(hold_id).await.unwrap();
    assert_eq!(again.value.released, 0);
    assert!(again.changes.is_empty());
    assert_eq!(free(&pool, id).await, 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_over_reservation_rejected_without_trace(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Microphone", 3).await;

    let err = ledger
        .reserve(&line(id, HoldKind::EventAllocation, 4, 1))
        .await
        .unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::InsufficientFree {
            available: 3,
            requested: 4,
            ..
        })
    );
    assert_eq!(free(&pool, id).await, 3);
    assert!(HoldRepo::list_for_asset(&pool, id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_adjust_moves_only_the_difference(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Chair", 10).await;
    let hold_id = ledger
        .reserve(&line(id, HoldKind::EventAllocation, 4, 1))
        .await
        .unwrap()
        .value
        .hold_id;

    ledger.adjust(hold_id, 9).await.unwrap();
    assert_eq!(free(&pool, id).await, 1);

    let err = ledger.adjust(hold_id, 11).await.unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::InsufficientFree {
            available: 10,
            requested: 11,
            ..
        })
    );

    ledger.adjust(hold_id, 2).await.unwrap();
    assert_eq!(free(&pool, id).await, 8);
    assert_conserved(&pool, id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_consume_splits_hold(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Paper plates", 20).await;
    let hold_id = ledger
        .reserve(&line(id, HoldKind::EventAllocation, 10, 1))
        .await
        .unwrap()
        .value
        .hold_id;

    let consumed = ledger.consume(hold_id, 4).await.unwrap();
    assert_eq!(consumed.value.released, 6);
    assert_eq!(consumed.value.ledger.total_owned, 16);
    assert_eq!(consumed.value.ledger.free_quantity, 16);

    let hold = HoldRepo::find(&pool, hold_id).await.unwrap().unwrap();
    assert_eq!(hold.status_id, HoldStatus::Consumed.id());
    assert_eq!(hold.consumed_quantity, 4);

    let err = ledger.release(hold_id).await.unwrap_err();
    assert_matches!(err.ledger(), Some(LedgerError::HoldNotActive { .. }));
    assert_conserved(&pool, id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_hold_is_not_found(pool: PgPool) {
    let ledger = coordinator(&pool);
    let err = ledger.release(999_999).await.unwrap_err();
    assert_matches!(
        err,
        StoreError::Core(CoreError::NotFound { entity: "Hold", .. })
    );
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_batch_failure_leaves_no_trace(pool: PgPool) {
    let ledger = coordinator(&pool);
    let a = asset(&ledger, "Table", 10).await;
    let b = asset(&ledger, "Tablecloth", 2).await;
    let c = asset(&ledger, "Candle", 10).await;

    let err = ledger
        .reserve_batch(&[
            line(a, HoldKind::EventAllocation, 3, 7),
            line(b, HoldKind::EventAllocation, 3, 7),
            line(c, HoldKind::EventAllocation, 3, 7),
        ])
        .await
        .unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::InsufficientFree { asset_id, .. }) if *asset_id == b
    );

    for id in [a, b, c] {
        assert!(HoldRepo::list_active(&pool, id, None).await.unwrap().is_empty());
        assert_conserved(&pool, id).await;
    }
    assert_eq!(free(&pool, a).await, 10);
    assert_eq!(free(&pool, c).await, 10);

    let ok = ledger
        .reserve_batch(&[
            line(c, HoldKind::EventAllocation, 3, 7),
            line(a, HoldKind::EventAllocation, 3, 7),
        ])
        .await
        .unwrap();
    assert_eq!(ok.value.len(), 2);
    let owned = HoldRepo::list_by_owner(&pool, HoldKind::EventAllocation, 7)
        .await
        .unwrap();
    assert_eq!(owned.len(), 2);
}

// ---------------------------------------------------------------------------
// Borrowing pool and deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pool_lifecycle(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Camping chair", 20).await;

    let enabled = ledger
        .set_borrowing(
            id,
            &SetBorrowing {
                enabled: true,
                pool_size: Some(5),
            },
        )
        .await
        .unwrap();
    assert!(enabled.value.borrowing_enabled);
    assert_eq!(enabled.value.free_quantity, 15);
    assert_eq!(enabled.value.available_to_borrow, 5);

    let loan = ledger
        .reserve(&line(id, HoldKind::BorrowingRequest, 3, 40))
        .await
        .unwrap();
    assert_eq!(loan.value.ledger.free_quantity, 15);
    assert_eq!(loan.value.ledger.available_to_borrow, 2);

    let shrink = ledger
        .set_borrowing(
            id,
            &SetBorrowing {
                enabled: true,
                pool_size: Some(2),
            },
        )
        .await
        .unwrap_err();
    assert_matches!(shrink.ledger(), Some(LedgerError::BelowOutstanding { .. }));

    let disable = SetBorrowing {
        enabled: false,
        pool_size: None,
    };
    let blocked = ledger.set_borrowing(id, &disable).await.unwrap_err();
    assert_matches!(
        blocked.ledger(),
        Some(LedgerError::RequestsStillPending { blockers, .. })
            if blockers.len() == 1 && blockers[0].owner_ref == Some(40)
    );

    ledger.release(loan.value.hold_id).await.unwrap();
    let disabled = ledger.set_borrowing(id, &disable).await.unwrap();
    assert!(!disabled.value.borrowing_enabled);
    assert_eq!(disabled.value.free_quantity, 20);
    assert_conserved(&pool, id).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_blocked_by_active_holds(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Ladder", 4).await;
    let hold_id = ledger
        .reserve(&line(id, HoldKind::IssueHold, 1, 12))
        .await
        .unwrap()
        .value
        .hold_id;

    let err = ledger.delete(id).await.unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::HasActiveHolds { blockers, .. }) if blockers[0].owner_ref == Some(12)
    );

    ledger.release(hold_id).await.unwrap();
    ledger.delete(id).await.unwrap();
    assert!(AssetRepo::find_by_id(&pool, id).await.unwrap().is_none());
    assert_eq!(HoldRepo::list_for_asset(&pool, id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_intake_grows_total_and_free(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Extension cord", 2).await;
    ledger
        .reserve(&line(id, HoldKind::MaintenanceHold, 2, 1))
        .await
        .unwrap();

    let intake = ledger.intake(id, 3).await.unwrap();
    assert_eq!(intake.value.total_owned, 5);
    assert_eq!(intake.value.free_quantity, 3);

    let err = ledger.intake(id, 0).await.unwrap_err();
    assert_matches!(err.ledger(), Some(LedgerError::InvalidQuantity { .. }));
    assert_conserved(&pool, id).await;
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

/// Twelve concurrent single-unit reservations against ten free units: exactly
/// ten succeed and the ledger never goes negative.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_reservations_never_overdraw(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Glow stick", 10).await;

    let attempts = (0..12).map(|owner| {
        let ledger = ledger.clone();
        async move {
            ledger
                .reserve(&line(id, HoldKind::EventAllocation, 1, owner))
                .await
        }
    });
    let results = futures::future::join_all(attempts).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 10);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_matches!(err.ledger(), Some(LedgerError::InsufficientFree { .. }));
    }
    assert_eq!(free(&pool, id).await, 0);
    assert_conserved(&pool, id).await;
}

/// Batches over the same assets listed in opposite orders serialize instead
/// of deadlocking.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_opposite_order_batches_do_not_deadlock(pool: PgPool) {
    let ledger = coordinator(&pool);
    let a = asset(&ledger, "Rope", 50).await;
    let b = asset(&ledger, "Tarp", 50).await;

    let batches = (0..8).map(|i| {
        let ledger = ledger.clone();
        let lines = if i % 2 == 0 {
            vec![
                line(a, HoldKind::EventAllocation, 2, i),
                line(b, HoldKind::EventAllocation, 2, i),
            ]
        } else {
            vec![
                line(b, HoldKind::EventAllocation, 2, i),
                line(a, HoldKind::EventAllocation, 2, i),
            ]
        };
        async move { ledger.reserve_batch(&lines).await }
    });
    let results = futures::future::join_all(batches).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(free(&pool, a).await, 34);
    assert_eq!(free(&pool, b).await, 34);
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// total 20 -> pool 5 -> borrow 3 -> maintenance 4 -> event 12 fails -> resolve.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_worked_example(pool: PgPool) {
    let ledger = coordinator(&pool);
    let id = asset(&ledger, "Banquet chair", 20).await;

    let pool_on = ledger
        .set_borrowing(
            id,
            &SetBorrowing {
                enabled: true,
                pool_size: Some(5),
            },
        )
        .await
        .unwrap();
    assert_eq!(pool_on.value.free_quantity, 15);

    let loan = ledger
        .reserve(&line(id, HoldKind::BorrowingRequest, 3, 1))
        .await
        .unwrap();
    assert_eq!(loan.value.ledger.free_quantity, 15);
    assert_eq!(loan.value.ledger.available_to_borrow, 2);

    let maintenance = ledger
        .reserve(&line(id, HoldKind::MaintenanceHold, 4, 2))
        .await
        .unwrap();
    assert_eq!(maintenance.value.ledger.free_quantity, 11);

    let err = ledger
        .reserve(&line(id, HoldKind::EventAllocation, 12, 3))
        .await
        .unwrap_err();
    assert_matches!(
        err.ledger(),
        Some(LedgerError::InsufficientFree {
            available: 11,
            requested: 12,
            ..
        })
    );

    let resolved = ledger.release(maintenance.value.hold_id).await.unwrap();
    assert_eq!(resolved.value.ledger.free_quantity, 15);
    assert_conserved(&pool, id).await;
}
