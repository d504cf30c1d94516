/// Unit tests for the CNPJ validator
/// Tests normalization, length and repeated-digit rejection, and check digits
use rust_credit_monitor::tax_id::{format_tax_id, normalize_tax_id, validate_tax_id};

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_known_valid_cnpjs() {
        assert!(validate_tax_id("11.222.333/0001-81"));
        assert!(validate_tax_id("11222333000181"));
        assert!(validate_tax_id("12345678000195"));
        assert!(validate_tax_id("12.345.678/0001-95"));
    }

    #[test]
    fn test_known_invalid_cnpjs() {
        assert!(!validate_tax_id("00.000.000/0000-00"));
        assert!(!validate_tax_id("123"));
        assert!(!validate_tax_id(""));
        assert!(!validate_tax_id("11.222.333/0001-82"));
        assert!(!validate_tax_id("11.222.333/0001-91"));
    }

    #[test]
    fn test_repeated_digits_rejected() {
        for d in 0..=9 {
            let raw = d.to_string().repeat(14);
            assert!(!validate_tax_id(&raw), "{} should be rejected", raw);
        }
    }

    #[test]
    fn test_length_must_be_fourteen_digits() {
        assert!(!validate_tax_id("1122233300018"));
        assert!(!validate_tax_id("112223330001811"));
        // Letters are stripped, leaving 14 digits
        assert!(validate_tax_id("CNPJ 11.222.333/0001-81"));
    }

    #[test]
    fn test_no_panic_on_unicode() {
        assert!(!validate_tax_id("١١٢٢٢٣٣٣٠٠٠١٨١"));
        assert!(!validate_tax_id("💳💳💳"));
    }
}

#[cfg(test)]
mod formatting_tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize_tax_id(" 11.222.333/0001-81 "), "11222333000181");
    }

    #[test]
    fn test_format_display_form() {
        assert_eq!(
            format_tax_id("11222333000181").as_deref(),
            Some("11.222.333/0001-81")
        );
        assert_eq!(format_tax_id("123"), None);
    }
}
