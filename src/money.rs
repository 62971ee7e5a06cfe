//! Money calculation utilities using rust_decimal for precision
//!
//! All pricing arithmetic goes through `Decimal` internally, then converts to
//! `f64` at the storage/serialization boundary. Rounding is 2 decimal places,
//! half-up.

use crate::utils::AppError;
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per cart line
const MAX_QUANTITY: i32 = 9999;

/// Round a monetary value to 2 decimal places (half-up)
pub fn round2(value: f64) -> f64 {
    Decimal::from_f64(value)
        .unwrap_or_default()
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(value)
}

/// unit_price × quantity, rounded to 2 decimal places
pub fn line_total(unit_price: f64, quantity: i32) -> f64 {
    let total = Decimal::from_f64(unit_price).unwrap_or_default() * Decimal::from(quantity);
    total
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// value × rate, rounded to 2 decimal places
pub fn apply_rate(value: f64, rate: f64) -> f64 {
    let result =
        Decimal::from_f64(value).unwrap_or_default() * Decimal::from_f64(rate).unwrap_or_default();
    result
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Sum of monetary values, rounded once at the end
pub fn sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let total: Decimal = values
        .into_iter()
        .map(|v| Decimal::from_f64(v).unwrap_or_default())
        .sum();
    total
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or(0.0)
}

/// Convert a major-unit amount to integer minor units (e.g. dollars → cents)
///
/// Payment providers take amounts in the smallest currency unit.
pub fn to_minor_units(amount: f64) -> Result<i64, AppError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::validation(format!(
            "amount must be a non-negative finite number, got {amount}"
        )));
    }
    let minor = Decimal::from_f64(amount).unwrap_or_default() * Decimal::from(100);
    minor
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| AppError::validation(format!("amount out of range: {amount}")))
}

/// Validate a catalog unit price before it is snapshotted into a cart
pub fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation(format!(
            "price must be a non-negative finite number, got {price}"
        )));
    }
    if price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "price exceeds maximum allowed ({MAX_PRICE}), got {price}"
        )));
    }
    Ok(())
}

/// Validate a cart line quantity
pub fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::validation(format!(
            "quantity must be at least 1, got {quantity}"
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {quantity}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_half_up() {
        assert_eq!(round2(6.005), 6.01);
        assert_eq!(round2(6.004), 6.0);
        assert_eq!(round2(10.0), 10.0);
    }

    #[test]
    fn line_total_is_exact() {
        // 0.1 + 0.2 style float drift must not leak into line totals
        assert_eq!(line_total(0.1, 3), 0.3);
        assert_eq!(line_total(29.99, 3), 89.97);
    }

    #[test]
    fn tax_rate_applies_with_two_decimals() {
        assert_eq!(apply_rate(60.0, 0.10), 6.0);
        assert_eq!(apply_rate(40.55, 0.10), 4.06);
    }

    #[test]
    fn minor_units_conversion() {
        assert_eq!(to_minor_units(76.0).unwrap(), 7600);
        assert_eq!(to_minor_units(29.99).unwrap(), 2999);
        assert!(to_minor_units(-1.0).is_err());
        assert!(to_minor_units(f64::NAN).is_err());
    }

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(10_000).is_err());
    }
}
