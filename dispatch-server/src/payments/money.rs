//! Amount parsing and minor-unit conversion

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::{DispatchError, DispatchResult};

/// Upper bound for a single payment, in major units
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

fn invalid(msg: impl Into<String>) -> DispatchError {
    DispatchError::InvalidAmount(msg.into())
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Parse a caller-supplied amount (JSON number or numeric string)
///
/// The result is rounded to cents (half away from zero) and carries scale 2,
/// so `12.5` is stored as `12.50`.
pub fn parse_amount(value: &serde_json::Value) -> DispatchResult<Decimal> {
    let parsed = match value {
        serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
        serde_json::Value::String(s) => parse_decimal(s),
        _ => None,
    }
    .ok_or_else(|| invalid(format!("not a number: {value}")))?;

    let mut amount = parsed.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(2);

    if amount <= Decimal::ZERO {
        return Err(invalid(format!("must be positive, got {parsed}")));
    }
    if amount > MAX_AMOUNT {
        return Err(invalid(format!("exceeds maximum of {MAX_AMOUNT}")));
    }
    Ok(amount)
}

/// Major units to integer minor units (cents)
pub fn to_minor_units(amount: Decimal) -> DispatchResult<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .filter(|minor| *minor > 0)
        .ok_or_else(|| invalid(format!("{amount} has no positive minor-unit value")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_and_numeric_strings() {
        assert_eq!(parse_amount(&json!(12.5)).unwrap().to_string(), "12.50");
        assert_eq!(parse_amount(&json!("12.50")).unwrap().to_string(), "12.50");
        assert_eq!(parse_amount(&json!(" 7 ")).unwrap().to_string(), "7.00");
        assert_eq!(parse_amount(&json!(3)).unwrap().to_string(), "3.00");
    }

    #[test]
    fn test_non_positive_rejected() {
        for v in [json!(0), json!(-5), json!("0.00"), json!("-5"), json!(0.001)] {
            assert!(
                matches!(parse_amount(&v), Err(DispatchError::InvalidAmount(_))),
                "{v} should be rejected"
            );
        }
    }

    #[test]
    fn test_non_numeric_rejected() {
        for v in [json!("abc"), json!(null), json!(true), json!([1]), json!({"v": 1}), json!("")] {
            assert!(matches!(parse_amount(&v), Err(DispatchError::InvalidAmount(_))));
        }
    }

    #[test]
    fn test_maximum() {
        assert!(parse_amount(&json!(1_000_000)).is_ok());
        assert!(parse_amount(&json!(1_000_000.01)).is_err());
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(parse_amount(&json!("0.005")).unwrap().to_string(), "0.01");
        assert_eq!(parse_amount(&json!("1.234")).unwrap().to_string(), "1.23");
    }

    #[test]
    fn test_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(1250, 2)).unwrap(), 1250);
        assert_eq!(to_minor_units(Decimal::new(1, 0)).unwrap(), 100);
        assert_eq!(to_minor_units(Decimal::new(1005, 3)).unwrap(), 101);
        assert!(to_minor_units(Decimal::ZERO).is_err());
    }
}
