//! Postgres persistence for the stockroom ledger.
//!
//! - [`models`]: row structs and request DTOs.
//! - [`repositories`]: zero-sized repos with one async fn per query.
//! - [`coordinator`]: the Reservation Coordinator. Locks asset rows, applies
//!   ledger primitives through `stockroom_core::ledger` and writes back.
//! - [`workflows`]: borrowing, event, ticket and outgoing flows built on the
//!   coordinator, each committing its own record in the same transaction.

pub mod coordinator;
pub mod error;
pub mod models;
pub mod repositories;
pub mod workflows;

use sqlx::postgres::PgPoolOptions;

pub type DbPool = sqlx::PgPool;

/// A Postgres transaction borrowed from the pool.
pub type DbTx<'c> = sqlx::Transaction<'c, sqlx::Postgres>;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
