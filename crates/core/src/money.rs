//! Money helpers: exact decimal arithmetic and the rounding policy.
//!
//! Amounts are `rust_decimal::Decimal` everywhere. Rated usage keeps full
//! precision; amounts are rounded to the currency scale when they become
//! invoice lines and when a tax amount is derived from a percentage.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Number of fractional digits kept for currency amounts.
pub const CURRENCY_SCALE: u32 = 2;

/// Round to the currency scale, half away from zero.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Upper bound for quantities, prices and rates accepted from callers.
///
/// Products and per-document sums of bounded inputs stay far inside the
/// `Decimal` range.
pub const MAX_INPUT_MAGNITUDE: i64 = 1_000_000_000_000;

/// Reject `value` when its magnitude exceeds [`MAX_INPUT_MAGNITUDE`].
pub fn ensure_within_limit(value: Decimal, what: &str) -> DomainResult<()> {
    if value.abs() > Decimal::from(MAX_INPUT_MAGNITUDE) {
        return Err(DomainError::validation(format!(
            "{what} {value} exceeds the limit of {MAX_INPUT_MAGNITUDE}"
        )));
    }
    Ok(())
}

/// `a * b`, or InvariantViolation when the product leaves the `Decimal` range.
pub fn checked_mul(a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| DomainError::invariant(format!("amount overflow computing {a} * {b}")))
}

pub fn checked_add(a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| DomainError::invariant(format!("amount overflow computing {a} + {b}")))
}

pub fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> DomainResult<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| checked_add(acc, amount))
}

/// `amount * rate_percent / 100`, rounded to the currency scale.
pub fn percent_of(amount: Decimal, rate_percent: Decimal) -> DomainResult<Decimal> {
    Ok(round_currency(
        checked_mul(amount, rate_percent)? / Decimal::ONE_HUNDRED,
    ))
}

/// Validate and normalise an ISO-4217 style currency code.
pub fn currency_code(code: &str) -> DomainResult<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(DomainError::validation(format!(
            "currency must be a three-letter code, got '{code}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_currency(dec!(1.005)), dec!(1.01));
        assert_eq!(round_currency(dec!(1.004)), dec!(1.00));
        assert_eq!(round_currency(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn percent_of_vat() {
        assert_eq!(percent_of(dec!(100.00), dec!(23)).unwrap(), dec!(23.00));
        assert_eq!(percent_of(dec!(2.50), dec!(23)).unwrap(), dec!(0.58));
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        let err = checked_mul(Decimal::MAX, dec!(2)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(checked_sum([Decimal::MAX, dec!(1)]).is_err());
        assert!(percent_of(Decimal::MAX, dec!(23)).is_err());
        assert_eq!(checked_sum([dec!(1.10), dec!(2.25)]).unwrap(), dec!(3.35));
    }

    #[test]
    fn inputs_beyond_the_limit_are_rejected() {
        let limit = Decimal::from(MAX_INPUT_MAGNITUDE);
        assert!(ensure_within_limit(limit, "quantity").is_ok());
        assert!(ensure_within_limit(-limit, "quantity").is_ok());
        let err = ensure_within_limit(limit + dec!(0.01), "quantity").unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("quantity")));
    }

    #[test]
    fn currency_code_is_normalised() {
        assert_eq!(currency_code(" eur ").unwrap(), "EUR");
        assert!(currency_code("EURO").is_err());
        assert!(currency_code("E1R").is_err());
    }
}
