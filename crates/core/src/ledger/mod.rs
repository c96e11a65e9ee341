//! Asset quantity ledger engine.
//!
//! Pure logic with no database dependencies. The db crate loads locked rows
//! into these types, applies one of the primitives and writes back whatever
//! the engine marked dirty.
//!
//! - [`LedgerState`]: one asset plus its holds; `reserve`, `release`, `adjust`,
//!   `consume`, intake and the borrowing pool rules.
//! - [`LedgerBatch`]: all-or-nothing reservations across several assets.
//! - [`LedgerError`]: the validation taxonomy shared by every workflow.

pub mod batch;
pub mod error;
pub mod hold;
pub mod state;

pub use batch::{lock_order, LedgerBatch, ReservationLine};
pub use error::{Blocker, LedgerError};
pub use hold::{HoldKind, HoldState, HoldStatus};
pub use state::{HoldSlot, LedgerState};
