//! Repository layer.
//!
//! Each repository is a zero-sized struct. Read-only queries accept `&PgPool`;
//! anything that must run under the coordinator's row locks takes the open
//! transaction instead.

pub mod activity_repo;
pub mod asset_repo;
pub mod borrowing_repo;
pub mod event_repo;
pub mod hold_repo;
pub mod outgoing_repo;
pub mod ticket_repo;

pub use activity_repo::ActivityRepo;
pub use asset_repo::AssetRepo;
pub use borrowing_repo::BorrowingRepo;
pub use event_repo::EventRepo;
pub use hold_repo::HoldRepo;
pub use outgoing_repo::OutgoingRepo;
pub use ticket_repo::TicketRepo;
