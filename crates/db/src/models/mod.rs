//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - `FromRow` + `Serialize` structs matching database rows
//! - `Deserialize` DTOs for the request bodies that create or change them

pub mod activity;
pub mod asset;
pub mod borrowing;
pub mod event;
pub mod hold;
pub mod outgoing;
pub mod ticket;
