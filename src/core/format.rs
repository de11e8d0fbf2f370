//! Display precision rules for prices, amounts and percentages.
//!
//! Values of at least one unit are shown with 2 decimals, smaller values with 6.

use rust_decimal::prelude::*;

fn decimal_places(value: f64) -> u32 {
    if value.abs() >= 1.0 { 2 } else { 6 }
}

fn to_decimal(value: f64, dp: u32) -> Option<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
}

/// Rounds a monetary value to its display precision.
pub fn round_monetary(value: f64) -> f64 {
    to_decimal(value, decimal_places(value))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `1234.5` -> `1,234.50`, `0.0123` -> `0.012300`.
pub fn format_price(value: f64) -> String {
    let dp = decimal_places(value);
    match to_decimal(value, dp) {
        Some(d) if dp == 2 => group_thousands(&format!("{d:.2}")),
        Some(d) => format!("{d:.6}"),
        None => format!("{value}"),
    }
}

/// Amounts keep up to 8 decimals; amounts below one always show all 8.
pub fn format_amount(value: f64) -> String {
    if value.abs() < 1.0 {
        return format!("{value:.8}");
    }
    match to_decimal(value, 8) {
        Some(d) => group_thousands(&d.normalize().to_string()),
        None => format!("{value}"),
    }
}

/// `1.234` -> `+1.23%`, `-0.5` -> `-0.50%`. Values that print as zero get `+`.
pub fn format_signed_percent(value: f64) -> String {
    let digits = format!("{:.2}", value.abs());
    let is_zero = digits.bytes().all(|b| b == b'0' || b == b'.');
    if value >= 0.0 || is_zero {
        format!("+{digits}%")
    } else {
        format!("-{digits}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_monetary() {
        assert_eq!(round_monetary(11000.004), 11000.0);
        assert_eq!(round_monetary(1.256), 1.26);
        assert_eq!(round_monetary(0.12345678), 0.123457);
        assert_eq!(round_monetary(-250.126), -250.13);
        assert_eq!(round_monetary(0.0), 0.0);
        assert!(round_monetary(-0.0000004) >= 0.0);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(64250.5), "64,250.50");
        assert_eq!(format_price(1.0), "1.00");
        assert_eq!(format_price(1234567.891), "1,234,567.89");
        assert_eq!(format_price(0.0812), "0.081200");
        assert_eq!(format_price(0.0), "0.000000");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.5), "0.50000000");
        assert_eq!(format_amount(2.0), "2");
        assert_eq!(format_amount(1500.123456789), "1,500.12345679");
    }

    #[test]
    fn test_format_signed_percent() {
        assert_eq!(format_signed_percent(12.346), "+12.35%");
        assert_eq!(format_signed_percent(0.0), "+0.00%");
        assert_eq!(format_signed_percent(-3.5), "-3.50%");
        assert_eq!(format_signed_percent(-0.001), "+0.00%");
    }
}
