//! Outgoing (permanent consumption) validation.

use crate::error::CoreError;
use crate::ledger::LedgerError;
use crate::types::Quantity;

/// Longest accepted withdrawal reason.
pub const MAX_REASON_LEN: usize = 500;

/// A withdrawal needs a positive quantity and a non-blank reason.
pub fn validate_withdrawal(quantity: Quantity, reason: &str) -> Result<(), CoreError> {
    if quantity <= 0 {
        return Err(LedgerError::InvalidQuantity {
            quantity,
            reason: "withdrawn quantity must be positive",
        }
        .into());
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(CoreError::Validation("A withdrawal reason is required".into()));
    }
    if reason.len() > MAX_REASON_LEN {
        return Err(CoreError::Validation(format!(
            "Withdrawal reason must be at most {MAX_REASON_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_withdrawal() {
        assert!(validate_withdrawal(3, "donated to school").is_ok());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            validate_withdrawal(0, "x"),
            Err(CoreError::Ledger(LedgerError::InvalidQuantity { quantity: 0, .. }))
        ));
        assert!(validate_withdrawal(2, "   ").is_err());
        assert!(validate_withdrawal(2, &"y".repeat(MAX_REASON_LEN + 1)).is_err());
    }
}
