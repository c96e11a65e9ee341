//! Publishes committed ledger changes on the event bus.

use std::sync::Arc;

use stockroom_core::activity::{ActivityChange, EVENT_QUANTITY_CHANGED};
use stockroom_core::types::DbId;

use crate::bus::{EventBus, PlatformEvent};

/// Hands [`ActivityChange`]s to the bus after the transaction committed.
///
/// Best effort: nothing here can fail the operation that produced the
/// changes.
#[derive(Clone)]
pub struct ActivityNotifier {
    bus: Arc<EventBus>,
}

impl ActivityNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Publish one `asset.quantity_changed` event per change.
    pub fn notify(&self, actor_id: Option<DbId>, changes: &[ActivityChange]) {
        if changes.is_empty() {
            return;
        }
        for change in changes {
            self.bus.publish(quantity_changed(actor_id, change));
        }
        tracing::debug!(count = changes.len(), ?actor_id, "Ledger changes published");
    }
}

pub fn quantity_changed(actor_id: Option<DbId>, change: &ActivityChange) -> PlatformEvent {
    PlatformEvent::new(EVENT_QUANTITY_CHANGED)
        .with_asset(change.asset_id)
        .with_actor(actor_id)
        .with_payload(change.to_payload())
}
