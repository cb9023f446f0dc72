//! CPF (Brazilian individual taxpayer id) checksum validation.

use super::{ValidationError, ValidationResult};

pub const CPF_LEN: usize = 11;

/// Returns only the ASCII digits of `value`, dropping dots, dashes and spaces.
pub fn normalize_cpf(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Checks length, uniform digits and both check digits.
pub fn is_valid_cpf(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|ch| ch.to_digit(10)).collect();

    if digits.len() != CPF_LEN {
        return false;
    }

    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

pub fn validate_cpf(value: &str) -> ValidationResult {
    let digits = normalize_cpf(value);

    if digits.len() != CPF_LEN {
        return Err(ValidationError::new(
            "cpf",
            format!("must have exactly {} digits", CPF_LEN),
        ));
    }

    if !is_valid_cpf(&digits) {
        return Err(ValidationError::new("cpf", "is not a valid CPF"));
    }

    Ok(())
}

// Weights run from len + 1 down to 2.
fn check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();

    match (sum * 10) % 11 {
        10 | 11 => 0,
        d => d,
    }
}
