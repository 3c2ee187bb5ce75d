//! Authentication and authorization logic.
//!
//! Provides password hashing, JWT issuance/verification and the role-based
//! access policy shared by the HTTP layer.

pub mod access;
pub mod jwt;
pub mod password;

use thiserror::Error;

pub use jwt::TokenError;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
