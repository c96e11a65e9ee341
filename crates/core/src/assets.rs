//! Asset registration validation.

use crate::error::CoreError;
use crate::types::Quantity;

/// Longest accepted asset name.
pub const MAX_NAME_LEN: usize = 200;

pub fn validate_registration(name: &str, total_owned: Quantity) -> Result<(), CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation("Asset name is required".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Asset name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    if total_owned < 0 {
        return Err(CoreError::Validation(format!(
            "Initial quantity cannot be negative, got {total_owned}"
        )));
    }
    Ok(())
}
