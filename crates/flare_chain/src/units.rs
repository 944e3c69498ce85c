//! Conversion between ledger fixed-point integers and display units.
//!
//! Funding totals and token amounts live on-chain as integers scaled by
//! 10^18. Users type decimal strings; views show floating-point numbers.

use ethers_core::types::U256;
use thiserror::Error;

/// Decimal scale used by every campaign and token contract on the platform.
pub const PLATFORM_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("amount is required")]
    Empty,

    #[error("amount must not be negative")]
    Negative,

    #[error("amount must be greater than zero")]
    Zero,

    #[error("invalid amount: {0}")]
    Invalid(String),

    #[error("too many decimal places (max {max})")]
    TooManyDecimals { max: u32 },

    #[error("amount is too large")]
    Overflow,
}

/// Parse a human-entered decimal string into its fixed-point representation.
///
/// Accepts `"12"`, `"0.5"`, `".5"`, `"3."`; rejects signs, exponents,
/// separators, and more fractional digits than `decimals`.
pub fn parse_amount(input: &str, decimals: u32) -> Result<U256, UnitsError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }
    if s.starts_with('-') {
        return Err(UnitsError::Negative);
    }

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(frac) || (whole.is_empty() && frac.is_empty()) {
        return Err(UnitsError::Invalid(s.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooManyDecimals { max: decimals });
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(frac);
    digits.extend(std::iter::repeat_n('0', decimals as usize - frac.len()));

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_dec_str(trimmed).map_err(|_| UnitsError::Overflow)
}

/// Like [`parse_amount`] but enforces the form-level minimum (> 0).
pub fn parse_positive_amount(input: &str, decimals: u32) -> Result<U256, UnitsError> {
    let value = parse_amount(input, decimals)?;
    if value.is_zero() {
        return Err(UnitsError::Zero);
    }
    Ok(value)
}

/// Scale a whole number of display units (e.g. a USD goal) to fixed point.
pub fn whole_units(value: u64, decimals: u32) -> U256 {
    U256::from(value) * U256::exp10(decimals as usize)
}

/// Exact decimal rendering of a fixed-point value, trailing zeros trimmed.
pub fn format_units(value: U256, decimals: u32) -> String {
    let raw = value.to_string();
    let decimals = decimals as usize;
    let padded = if raw.len() <= decimals {
        format!("{}{raw}", "0".repeat(decimals + 1 - raw.len()))
    } else {
        raw
    };
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

/// Convert a fixed-point value into floating display units.
pub fn to_display(value: U256, decimals: u32) -> f64 {
    // The decimal rendering is always a valid float literal.
    format_units(value, decimals).parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const D: u32 = PLATFORM_DECIMALS;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(parse_amount("1", D).unwrap(), U256::exp10(18));
        assert_eq!(parse_amount("0.5", D).unwrap(), U256::exp10(17) * 5u64);
        assert_eq!(parse_amount(".5", D).unwrap(), U256::exp10(17) * 5u64);
        assert_eq!(parse_amount("3.", D).unwrap(), U256::exp10(18) * 3u64);
        assert_eq!(parse_amount(" 0.000000000000000001 ", D).unwrap(), U256::one());
        assert_eq!(parse_amount("0", D).unwrap(), U256::zero());
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_amount("", D), Err(UnitsError::Empty));
        assert_eq!(parse_amount("   ", D), Err(UnitsError::Empty));
        assert_eq!(parse_amount("-1", D), Err(UnitsError::Negative));
        assert!(matches!(parse_amount("1e5", D), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_amount("1,000", D), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_amount(".", D), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_amount("1.2.3", D), Err(UnitsError::Invalid(_))));
        assert_eq!(
            parse_amount("0.0000000000000000001", D),
            Err(UnitsError::TooManyDecimals { max: 18 })
        );
    }

    #[test]
    fn rejects_overflow() {
        let huge = "9".repeat(80);
        assert_eq!(parse_amount(&huge, D), Err(UnitsError::Overflow));
    }

    #[test]
    fn positive_amount_rejects_zero() {
        assert_eq!(parse_positive_amount("0.0", D), Err(UnitsError::Zero));
        assert!(parse_positive_amount("0.01", D).is_ok());
    }

    #[test]
    fn formats_exact_decimals() {
        assert_eq!(format_units(U256::zero(), D), "0");
        assert_eq!(format_units(U256::one(), D), "0.000000000000000001");
        assert_eq!(format_units(U256::exp10(18) * 1234u64, D), "1234");
        assert_eq!(format_units(U256::exp10(16) * 150u64, D), "1.5");
    }

    #[test]
    fn whole_units_scales_goal() {
        assert_eq!(whole_units(50_000, D), U256::exp10(18) * 50_000u64);
        assert_eq!(to_display(whole_units(50_000, D), D), 50_000.0);
    }

    #[test]
    fn display_round_trips_within_tolerance() {
        for input in ["0.01", "1", "2.5", "68000.50", "0.123456789", "1000000.000001"] {
            let fixed = parse_amount(input, D).unwrap();
            let shown = to_display(fixed, D);
            let expected: f64 = input.parse().unwrap();
            assert!(
                (shown - expected).abs() <= expected.abs() * 1e-12,
                "{input} became {shown}"
            );
        }
    }
}
