//! # ums_core
//!
//! Core domain logic for UMS: the user model, credential storage, password
//! hashing, token issuance/verification and the role-based access policy.

pub mod auth;
pub mod clock;
pub mod images;
pub mod migrate;
pub mod models;
pub mod store;
pub mod validation;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
