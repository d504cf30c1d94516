/// Property-based tests using proptest
/// Tests invariants of the CNPJ validator and the metrics aggregator over arbitrary inputs
use bigdecimal::{BigDecimal, Zero};
use proptest::prelude::*;
use rust_credit_monitor::fixtures::DemoPortfolio;
use rust_credit_monitor::metrics::compute_metrics;
use rust_credit_monitor::tax_id::{check_digits, format_tax_id, normalize_tax_id, validate_tax_id};

/// Builds a valid 14-digit CNPJ from a 12-digit base.
fn with_check_digits(base: &[u32]) -> String {
    let (first, second) = check_digits(base);
    base.iter()
        .chain([first, second].iter())
        .map(|d| char::from_digit(*d, 10).unwrap())
        .collect()
}

fn not_all_equal(digits: &[u32]) -> bool {
    digits.iter().any(|&d| d != digits[0])
}

// Property: CNPJ validation should never panic
proptest! {
    #[test]
    fn validation_never_panics(raw in "\\PC*") {
        let _ = validate_tax_id(&raw);
    }

    #[test]
    fn wrong_length_is_always_invalid(digits in "[0-9]{0,30}") {
        prop_assume!(digits.len() != 14);
        prop_assert!(!validate_tax_id(&digits));
    }

    #[test]
    fn repeated_digits_are_always_invalid(d in 0u32..10) {
        let raw: String = std::iter::repeat(char::from_digit(d, 10).unwrap()).take(14).collect();
        prop_assert!(!validate_tax_id(&raw));
    }
}

// Property: computed check digits always validate, with or without punctuation
proptest! {
    #[test]
    fn computed_check_digits_validate(base in proptest::collection::vec(0u32..10, 12)) {
        let cnpj = with_check_digits(&base);
        let digits: Vec<u32> = cnpj.chars().filter_map(|c| c.to_digit(10)).collect();
        prop_assume!(not_all_equal(&digits));

        prop_assert!(validate_tax_id(&cnpj));
        let formatted = format_tax_id(&cnpj).unwrap();
        prop_assert!(validate_tax_id(&formatted));
        prop_assert_eq!(normalize_tax_id(&formatted), cnpj);
    }

    #[test]
    fn single_digit_corruption_is_rejected(
        base in proptest::collection::vec(0u32..10, 12),
        position in 0usize..14,
        delta in 1u32..10
    ) {
        let cnpj = with_check_digits(&base);
        let mut digits: Vec<u32> = cnpj.chars().filter_map(|c| c.to_digit(10)).collect();
        prop_assume!(not_all_equal(&digits));
        // A first check digit of 0 covers two remainders (0 and 1), so a base
        // change can keep it; check digits 1-9 map to a single remainder.
        prop_assume!(position >= 12 || digits[12] != 0);

        digits[position] = (digits[position] + delta) % 10;
        let corrupted: String = digits.iter().map(|d| char::from_digit(*d, 10).unwrap()).collect();
        prop_assert!(!validate_tax_id(&corrupted), "corrupted {} still valid", corrupted);
    }

    #[test]
    fn noise_characters_do_not_change_the_verdict(
        base in proptest::collection::vec(0u32..10, 12),
        noise in "[ ./-]{0,3}"
    ) {
        let cnpj = with_check_digits(&base);
        let noisy: String = cnpj.chars().flat_map(|c| std::iter::once(c).chain(noise.chars())).collect();
        prop_assert_eq!(validate_tax_id(&noisy), validate_tax_id(&cnpj));
    }
}

// Property: metrics stay in range for any generated portfolio
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn demo_portfolio_metrics_are_bounded(seed in any::<u64>(), rows in 0usize..80) {
        let table = DemoPortfolio::generate(seed, rows);
        prop_assert!(table.iter().all(|r| validate_tax_id(&r.tax_id)));

        let m = compute_metrics(&table);
        let hundred = BigDecimal::from(100);
        prop_assert!(m.total_volume >= BigDecimal::zero());
        prop_assert!(m.delinquency_pct >= BigDecimal::zero() && m.delinquency_pct <= hundred);
        prop_assert!(m.concentration_pct >= BigDecimal::zero() && m.concentration_pct <= hundred);
        prop_assert_eq!(compute_metrics(&table), m);
    }
}
