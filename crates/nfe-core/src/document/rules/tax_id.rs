//! CNPJ and CPF (Brazilian tax ids) validation and formatting.

use super::patterns::TAX_ID_SEPARATORS;

/// Keep only the digits of a tax id, dropping the usual separators.
fn digits(tax_id: &str) -> Option<Vec<u32>> {
    let cleaned = TAX_ID_SEPARATORS.replace_all(tax_id.trim(), "");
    cleaned.chars().map(|c| c.to_digit(10)).collect()
}

/// Mod-11 check digit shared by CNPJ and CPF.
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

/// Validate a CNPJ (14 digits, two check digits).
///
/// First weights: 5,4,3,2,9,8,7,6,5,4,3,2; second: 6 followed by the first.
pub fn validate_cnpj(cnpj: &str) -> bool {
    let Some(digits) = digits(cnpj) else {
        return false;
    };
    if digits.len() != 14 || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let first = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let second = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    check_digit(&digits[..12], &first) == digits[12]
        && check_digit(&digits[..13], &second) == digits[13]
}

/// Validate a CPF (11 digits, two check digits).
pub fn validate_cpf(cpf: &str) -> bool {
    let Some(digits) = digits(cpf) else {
        return false;
    };
    if digits.len() != 11 || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let first = [10, 9, 8, 7, 6, 5, 4, 3, 2];
    let second = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2];

    check_digit(&digits[..9], &first) == digits[9]
        && check_digit(&digits[..10], &second) == digits[10]
}

/// Validate either kind of tax id, chosen by length.
pub fn validate_tax_id(tax_id: &str) -> bool {
    match digits(tax_id).map(|d| d.len()) {
        Some(14) => validate_cnpj(tax_id),
        Some(11) => validate_cpf(tax_id),
        _ => false,
    }
}

/// Format a tax id with its usual punctuation (12.345.678/0001-95 or
/// 123.456.789-09). Anything else is returned unchanged.
pub fn format_tax_id(tax_id: &str) -> String {
    let cleaned = TAX_ID_SEPARATORS.replace_all(tax_id.trim(), "");
    if !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return tax_id.to_string();
    }

    match cleaned.len() {
        14 => format!(
            "{}.{}.{}/{}-{}",
            &cleaned[0..2],
            &cleaned[2..5],
            &cleaned[5..8],
            &cleaned[8..12],
            &cleaned[12..14]
        ),
        11 => format!(
            "{}.{}.{}-{}",
            &cleaned[0..3],
            &cleaned[3..6],
            &cleaned[6..9],
            &cleaned[9..11]
        ),
        _ => tax_id.to_string(),
    }
}
