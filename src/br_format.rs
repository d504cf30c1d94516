use anyhow::{anyhow, Result};
use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Parses a decimal cell.
///
/// With a comma present the value is read as pt-BR ("1.234,56"): dots are
/// thousand separators and the comma is the decimal mark. Without a comma a
/// single dot followed by one or two digits is a decimal mark ("1234.5");
/// any other dots group thousands ("1.500", "2.500.000").
/// A leading "R$" and surrounding whitespace are ignored.
pub fn parse_decimal(s: &str) -> Result<BigDecimal> {
    let trimmed = s.trim().trim_start_matches("R$").trim();

    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else if is_decimal_dot(trimmed) {
        trimmed.to_string()
    } else {
        trimmed.replace('.', "")
    };

    BigDecimal::from_str(&normalized).map_err(|e| anyhow!("Failed to parse decimal '{}': {}", s, e))
}

/// True for exactly one dot with one or two digits after it.
fn is_decimal_dot(s: &str) -> bool {
    match s.split_once('.') {
        Some((_, frac)) => {
            !frac.contains('.')
                && (1..=2).contains(&frac.len())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Parses an integer cell, treating dots as thousand separators ("24.228").
pub fn parse_integer<T: FromStr>(s: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    s.trim()
        .replace('.', "")
        .parse::<T>()
        .map_err(|e| anyhow!("Failed to parse integer '{}': {}", s, e))
}

/// Plain pt-BR decimal without grouping: 1234.5 -> "1234,50".
pub fn format_decimal(value: &BigDecimal, places: i64) -> String {
    value
        .round(places)
        .with_scale(places)
        .to_string()
        .replace('.', ",")
}

/// Grouped pt-BR decimal: 1234567.8 -> "1.234.567,80".
pub fn format_grouped(value: &BigDecimal, places: i64) -> String {
    let plain = value.round(places).with_scale(places).to_string();

    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{}{},{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Currency for display: "R$ 6.000,00".
pub fn format_brl(value: &BigDecimal) -> String {
    format!("R$ {}", format_grouped(value, 2))
}

/// Percentage for display: "83,33%".
pub fn format_pct(value: &BigDecimal) -> String {
    format!("{}%", format_grouped(value, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_decimal_simple() {
        assert_eq!(parse_decimal("123,45").unwrap(), dec("123.45"));
    }

    #[test]
    fn test_parse_decimal_with_thousands() {
        assert_eq!(parse_decimal("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_decimal("600.822.115,84").unwrap(), dec("600822115.84"));
    }

    #[test]
    fn test_parse_decimal_plain_and_currency_prefix() {
        assert_eq!(parse_decimal("1000").unwrap(), dec("1000"));
        assert_eq!(parse_decimal("1234.5").unwrap(), dec("1234.5"));
        assert_eq!(parse_decimal("R$ 2.500,00").unwrap(), dec("2500"));
        assert_eq!(parse_decimal("37.5").unwrap(), dec("37.5"));
        assert_eq!(parse_decimal("0.05").unwrap(), dec("0.05"));
    }

    #[test]
    fn test_parse_decimal_dot_grouping_without_comma() {
        assert_eq!(parse_decimal("1.500").unwrap(), dec("1500"));
        assert_eq!(parse_decimal("R$ 2.500").unwrap(), dec("2500"));
        assert_eq!(parse_decimal("2.500.000").unwrap(), dec("2500000"));
        assert_eq!(parse_decimal("1.5000").unwrap(), dec("15000"));
    }

    #[test]
    fn test_parse_decimal_invalid() {
        let err = parse_decimal("abc").unwrap_err();
        assert!(err.to_string().contains("Failed to parse decimal 'abc'"));
    }

    #[test]
    fn test_parse_integer_with_thousands() {
        assert_eq!(parse_integer::<u32>("24.228").unwrap(), 24228);
        assert_eq!(parse_integer::<u16>(" 720 ").unwrap(), 720);
        assert!(parse_integer::<u32>("-1").is_err());
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(&dec("1234.5"), 2), "1234,50");
        assert_eq!(format_decimal(&dec("0"), 2), "0,00");
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(&dec("1234567.8"), 2), "1.234.567,80");
        assert_eq!(format_grouped(&dec("999"), 2), "999,00");
        assert_eq!(format_grouped(&dec("-1000"), 2), "-1.000,00");
        assert_eq!(format_grouped(&dec("100000"), 0), "100.000");
    }

    #[test]
    fn test_format_brl_and_pct() {
        assert_eq!(format_brl(&dec("6000")), "R$ 6.000,00");
        assert_eq!(format_pct(&dec("83.333333")), "83,33%");
        assert_eq!(format_pct(&dec("50")), "50,00%");
    }
}
