/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Unit counts. Stored as BIGINT so intermediate sums never overflow.
pub type Quantity = i64;
