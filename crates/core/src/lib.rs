//! Stockroom domain rules.
//!
//! Pure logic shared by the db and api crates: the quantity ledger engine,
//! consumer workflow state machines, and the error taxonomy. Nothing in this
//! crate touches the database.

pub mod activity;
pub mod assets;
pub mod borrowing;
pub mod error;
pub mod event_allocation;
pub mod ledger;
pub mod outgoing;
pub mod tickets;
pub mod types;
