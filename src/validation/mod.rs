use std::fmt;

pub mod cpf;

pub use cpf::{is_valid_cpf, normalize_cpf, validate_cpf, CPF_LEN};

pub const FULL_NAME_MIN_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

/// Heuristic full-name check: at least three characters and one space once trimmed.
pub fn validate_full_name(name: &str) -> ValidationResult {
    let name = name.trim();
    validate_required("name", name)?;

    if name.chars().count() < FULL_NAME_MIN_LEN || !name.contains(' ') {
        return Err(ValidationError::new(
            "name",
            "must contain first and last name",
        ));
    }

    Ok(())
}
