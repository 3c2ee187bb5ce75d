//! Field validation and normalisation for user records.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Trim and lowercase an email address, rejecting obviously malformed ones.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError("Please enter a valid email address".into()));
    }
    Ok(email)
}

/// Mobile numbers are ten digits starting with 6, 7, 8 or 9.
pub fn validate_mobile(mobile: &str) -> Result<String, ValidationError> {
    let mobile = mobile.trim();
    let bytes = mobile.as_bytes();
    let valid = bytes.len() == 10
        && matches!(bytes[0], b'6'..=b'9')
        && bytes.iter().all(u8::is_ascii_digit);
    if !valid {
        return Err(ValidationError(
            "Mobile number must be 10 digits and start with 6-9".into(),
        ));
    }
    Ok(mobile.to_string())
}

pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError("Name is required".into()));
    }
    Ok(name.to_string())
}
