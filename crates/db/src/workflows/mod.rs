//! Consumer workflows.
//!
//! Each workflow locks its own record, drives the ledger through
//! [`LockedLedgers`](crate::coordinator::LockedLedgers), and updates the
//! record in the same transaction. Ledger changes are returned with the
//! committed value for the activity notifier.

pub mod borrowing;
pub mod events;
pub mod outgoing;
pub mod tickets;

pub use borrowing::BorrowingWorkflow;
pub use events::EventWorkflow;
pub use outgoing::OutgoingWorkflow;
pub use tickets::TicketWorkflow;
