//! Durable activity log.
//!
//! [`ActivityPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every `asset.quantity_changed` event to `activity_logs`. Other
//! event types are ignored. The loop ends once the bus is dropped.

use serde::Deserialize;
use stockroom_core::activity::EVENT_QUANTITY_CHANGED;
use stockroom_core::ledger::HoldKind;
use stockroom_core::types::DbId;
use stockroom_db::models::activity::NewActivityLog;
use stockroom_db::repositories::ActivityRepo;
use stockroom_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

/// Payload shape produced by `ActivityChange::to_payload`.
#[derive(Debug, Deserialize)]
struct QuantityChanged {
    asset_id: DbId,
    action: String,
    hold_kind: Option<HoldKind>,
    owner_ref: Option<DbId>,
    field: String,
    old_value: serde_json::Value,
    new_value: serde_json::Value,
}

pub struct ActivityPersistence;

impl ActivityPersistence {
    /// Persist events until the channel closes. Failures are logged and
    /// skipped.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let entry = match Self::to_log_entry(&event) {
                        Some(Ok(entry)) => entry,
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "Malformed activity payload");
                            continue;
                        }
                        None => continue,
                    };
                    if let Err(e) = ActivityRepo::insert(&pool, &entry).await {
                        tracing::error!(
                            error = %e,
                            asset_id = entry.asset_id,
                            field = %entry.field,
                            "Failed to persist activity"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Activity persistence lagged, entries were lost");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, activity persistence shutting down");
                    break;
                }
            }
        }
    }

    /// `None` for events that are not ledger changes.
    pub fn to_log_entry(
        event: &PlatformEvent,
    ) -> Option<Result<NewActivityLog, serde_json::Error>> {
        if event.event_type != EVENT_QUANTITY_CHANGED {
            return None;
        }
        let parsed = serde_json::from_value::<QuantityChanged>(event.payload.clone()).map(
            |change| NewActivityLog {
                asset_id: change.asset_id,
                action: change.action,
                hold_kind_id: change.hold_kind.map(|k| k.id()),
                owner_ref: change.owner_ref,
                field: change.field,
                old_value: change.old_value,
                new_value: change.new_value,
                actor_id: event.actor_id,
            },
        );
        Some(parsed)
    }
}
