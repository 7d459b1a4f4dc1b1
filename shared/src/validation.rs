//! Validation utilities for the Opportunity Pipeline

use rust_decimal::Decimal;

use crate::models::RequirementItem;

// ============================================================================
// Intake Validations
// ============================================================================

/// A requirement needs at least one item naming a product
pub fn validate_requirement_items(items: &[RequirementItem]) -> Result<(), &'static str> {
    if items.iter().any(|i| !i.requested_product.trim().is_empty()) {
        Ok(())
    } else {
        Err("At least one item must name a requested product")
    }
}

/// Reject empty or whitespace-only names
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name must not be empty");
    }
    Ok(())
}

// ============================================================================
// Money and Quantity Validations
// ============================================================================

pub fn validate_quantity(quantity: u32) -> Result<(), &'static str> {
    if quantity == 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Largest accepted money amount. Keeps every total, conversion and margin
/// computed from stored amounts inside `Decimal`'s range.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Largest accepted USD→PEN rate
pub const MAX_EXCHANGE_RATE: i64 = 10_000;

pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if price > Decimal::from(MAX_AMOUNT) {
        return Err("Amount exceeds the maximum of 1,000,000,000,000");
    }
    Ok(())
}

/// Exchange rates must be strictly positive and plausible
pub fn validate_exchange_rate(rate: Decimal) -> Result<(), &'static str> {
    if rate <= Decimal::ZERO {
        return Err("Exchange rate must be positive");
    }
    if rate > Decimal::from(MAX_EXCHANGE_RATE) {
        return Err("Exchange rate exceeds the maximum of 10,000");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn requirement_needs_a_named_item() {
        assert!(validate_requirement_items(&[]).is_err());
        assert!(validate_requirement_items(&[RequirementItem::new("  ")]).is_err());
        assert!(
            validate_requirement_items(&[RequirementItem::new(""), RequirementItem::new("Zinc")])
                .is_ok()
        );
    }

    #[test]
    fn names_must_have_content() {
        assert!(validate_name("Vitaminas").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn quantities_and_prices() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::from_str("-0.01").unwrap()).is_err());
        assert!(validate_exchange_rate(Decimal::from_str("3.75").unwrap()).is_ok());
        assert!(validate_exchange_rate(Decimal::ZERO).is_err());
    }

    #[test]
    fn amounts_are_bounded() {
        assert!(validate_price(Decimal::from(MAX_AMOUNT)).is_ok());
        assert!(validate_price(Decimal::from(MAX_AMOUNT) + Decimal::ONE).is_err());
        assert!(validate_price(Decimal::MAX).is_err());
        assert!(validate_exchange_rate(Decimal::from(MAX_EXCHANGE_RATE)).is_ok());
        assert!(validate_exchange_rate(Decimal::MAX).is_err());
    }
}
