//! Error type for the persistence layer.

use stockroom_core::error::CoreError;
use stockroom_core::ledger::LedgerError;
use stockroom_core::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        Self::Core(CoreError::NotFound { entity, id })
    }

    /// The ledger rule violation behind this error, if there is one.
    pub fn ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Core(CoreError::Ledger(err)) => Some(err),
            _ => None,
        }
    }
}

impl From<LedgerError> for StoreError {
    fn from(err: LedgerError) -> Self {
        Self::Core(CoreError::Ledger(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn ledger_errors_stay_reachable() {
        let err: StoreError = LedgerError::BorrowingDisabled { asset_id: 3 }.into();
        assert_matches!(err.ledger(), Some(LedgerError::BorrowingDisabled { asset_id: 3 }));
        assert!(StoreError::not_found("Asset", 3).ledger().is_none());
    }
}
