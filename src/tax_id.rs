/// Digits in a CNPJ: 12-digit base (root + branch) and two check digits.
pub const CNPJ_LEN: usize = 14;
const BASE_LEN: usize = 12;

const FIRST_DIGIT_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_DIGIT_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Strips every non-digit character, keeping digit order.
pub fn normalize_tax_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validates a CNPJ, with or without punctuation.
///
/// Returns false for anything that is not 14 digits after normalization,
/// for repeated-digit sequences (`00.000.000/0000-00`, `11111111111111`, ...)
/// and for a checksum mismatch. Never panics.
///
/// # Example
///
/// ```rust
/// use rust_credit_monitor::tax_id::validate_tax_id;
///
/// assert!(validate_tax_id("11.222.333/0001-81"));
/// assert!(!validate_tax_id("00.000.000/0000-00"));
/// ```
pub fn validate_tax_id(raw: &str) -> bool {
    let digits = to_digits(&normalize_tax_id(raw));

    if digits.len() != CNPJ_LEN {
        return false;
    }

    // Repeated digits are arithmetically consistent but never issued
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let (first, second) = check_digits(&digits[..BASE_LEN]);
    digits[12] == first && digits[13] == second
}

/// Computes both verification digits for a 12-digit base.
///
/// # Panics
///
/// Panics if `base` is not exactly 12 digits long.
pub fn check_digits(base: &[u32]) -> (u32, u32) {
    assert_eq!(base.len(), BASE_LEN, "CNPJ base must have 12 digits");

    let first = verification_digit(base, &FIRST_DIGIT_WEIGHTS);

    let mut extended = base.to_vec();
    extended.push(first);
    let second = verification_digit(&extended, &SECOND_DIGIT_WEIGHTS);

    (first, second)
}

/// Weighted mod-11 digit: remainder below 2 maps to 0, otherwise 11 - remainder.
fn verification_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}

/// Formats a CNPJ for display as `XX.XXX.XXX/XXXX-XX`.
///
/// Returns None unless the input has exactly 14 digits after normalization.
/// Does not check the verification digits.
pub fn format_tax_id(raw: &str) -> Option<String> {
    let d = normalize_tax_id(raw);
    if d.len() != CNPJ_LEN {
        return None;
    }

    Some(format!(
        "{}.{}.{}/{}-{}",
        &d[0..2],
        &d[2..5],
        &d[5..8],
        &d[8..12],
        &d[12..14]
    ))
}

fn to_digits(normalized: &str) -> Vec<u32> {
    normalized.chars().filter_map(|c| c.to_digit(10)).collect()
}
