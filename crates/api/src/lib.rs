//! Stockroom HTTP API.
//!
//! Library half of the server so integration tests and the binary share the
//! same router, state and error mapping.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
