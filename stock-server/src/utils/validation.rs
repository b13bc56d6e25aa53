//! Input validation helpers

use crate::inventory::{InventoryError, InventoryResult};

/// Names: products, staff, price tiers
pub const MAX_NAME_LEN: usize = 200;

/// Stock location identifiers
pub const MAX_LOCATION_LEN: usize = 100;

/// Adjustment and transfer reasons
pub const MAX_NOTE_LEN: usize = 500;

/// Largest quantity a single cart line may carry
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> InventoryResult<()> {
    if value.trim().is_empty() {
        return Err(InventoryError::Validation(format!(
            "{field} must not be empty"
        )));
    }
    if value.len() > max_len {
        return Err(InventoryError::Validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> InventoryResult<()> {
    if let Some(v) = value {
        if v.len() > max_len {
            return Err(InventoryError::Validation(format!(
                "{field} is too long ({} chars, max {max_len})",
                v.len()
            )));
        }
    }
    Ok(())
}

pub fn validate_location(location: &str) -> InventoryResult<()> {
    validate_required_text(location, "location", MAX_LOCATION_LEN)
}

/// Line quantities are strictly positive
pub fn validate_quantity(quantity: i64) -> InventoryResult<()> {
    if quantity <= 0 {
        return Err(InventoryError::Validation(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(InventoryError::Validation(format!(
            "quantity {quantity} exceeds the maximum of {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_and_long_text() {
        assert!(validate_required_text("  ", "name", 10).is_err());
        assert!(validate_required_text("abcdefghijk", "name", 10).is_err());
        assert!(validate_required_text("deposito", "name", 10).is_ok());
        assert!(validate_optional_text(&None, "reason", 1).is_ok());
        assert!(validate_optional_text(&Some("ab".into()), "reason", 1).is_err());
    }

    #[test]
    fn quantities_must_be_positive() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }
}
