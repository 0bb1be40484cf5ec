use std::str::FromStr;

use alloy_primitives::U256;

use crate::error::BurnError;

/// 10^18, the fixed-point scale of the TRU token.
const WEI_PER_TRU: u128 = 1_000_000_000_000_000_000;

/// Parses a decimal `amount` string into a `U256`. Never truncates through a
/// 64-bit integer first.
pub fn parse_amount(decimal: &str) -> Result<U256, BurnError> {
    U256::from_str(decimal).map_err(|e| BurnError::InvalidAmount(decimal.to_string(), e.to_string()))
}

/// `amountFormatted = amount / 10^18` to full precision of the big-integer
/// division. The quotient and remainder are split before either touches an
/// `f64`, so only the final human-scale value loses precision, never the
/// division itself.
pub fn format_amount(amount: U256) -> f64 {
    let divisor = U256::from(WEI_PER_TRU);
    let quotient = amount / divisor;
    let remainder = amount % divisor;

    let quotient_f64: f64 = quotient.to_string().parse().unwrap_or(f64::MAX);
    let remainder_f64 = u128::try_from(remainder).unwrap_or(0) as f64 / WEI_PER_TRU as f64;
    quotient_f64 + remainder_f64
}

/// Sums a set of decimal amount strings as exact big integers.
pub fn sum_amounts<'a>(amounts: impl Iterator<Item = &'a str>) -> Result<U256, BurnError> {
    let mut total = U256::ZERO;
    for amount in amounts {
        total = total
            .checked_add(parse_amount(amount)?)
            .ok_or_else(|| BurnError::InvalidAmount(amount.to_string(), "overflow summing burn amounts".to_string()))?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_tru_formats_to_one() {
        let amount = parse_amount("1000000000000000000").unwrap();
        assert_eq!(format_amount(amount), 1.0);
    }

    #[test]
    fn two_and_a_half_tru_sum_to_three_and_a_half() {
        let a = parse_amount("1000000000000000000").unwrap();
        let b = parse_amount("2500000000000000000").unwrap();
        let total = a.checked_add(b).unwrap();
        assert_eq!(format_amount(total), 3.5);
    }

    #[test]
    fn large_totals_keep_fractional_precision() {
        // 123,456 TRU plus a fractional remainder of 0.000000000000000007
        let amount = parse_amount("123456000000000000000007").unwrap();
        let formatted = format_amount(amount);
        assert!((formatted - 123_456.0).abs() < 1.0);
    }

    #[test]
    fn rejects_non_decimal_input() {
        assert!(parse_amount("not-a-number").is_err());
    }

    #[test]
    fn sum_amounts_adds_exactly() {
        let total = sum_amounts(["1000000000000000000", "2500000000000000000"].into_iter()).unwrap();
        assert_eq!(total, U256::from(3_500_000_000_000_000_000u128));
    }
}
