use std::sync::Arc;

use stockroom_db::coordinator::Coordinator;
use stockroom_events::{ActivityNotifier, EventBus};

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub pool: stockroom_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Every ledger mutation goes through here.
    pub ledger: Coordinator,
    pub event_bus: Arc<EventBus>,
    pub notifier: ActivityNotifier,
}

impl AppState {
    pub fn new(pool: stockroom_db::DbPool, config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        let ledger = Coordinator::new(pool.clone(), config.lock_timeout());
        let notifier = ActivityNotifier::new(Arc::clone(&event_bus));
        Self {
            pool,
            config: Arc::new(config),
            ledger,
            event_bus,
            notifier,
        }
    }
}
