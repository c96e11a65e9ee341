//! Stockroom activity events.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope carried on the bus.
//! - [`ActivityNotifier`]: turns committed ledger changes into
//!   `asset.quantity_changed` events.
//! - [`ActivityPersistence`]: background task writing those events to
//!   `activity_logs`.

pub mod bus;
pub mod notifier;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use notifier::ActivityNotifier;
pub use persistence::ActivityPersistence;
