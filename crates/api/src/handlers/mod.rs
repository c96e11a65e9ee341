pub mod assets;
pub mod borrowing;
pub mod events;
pub mod holds;
pub mod outgoing;
pub mod tickets;

use stockroom_db::coordinator::Committed;

use crate::extract::Actor;
use crate::state::AppState;

/// Publish a committed result's ledger changes and hand back its value.
///
/// Runs only after the transaction committed, so a rolled-back operation
/// never reaches the activity log.
pub(crate) fn publish<T>(state: &AppState, actor: Actor, committed: Committed<T>) -> T {
    state.notifier.notify(actor.0, &committed.changes);
    committed.value
}
