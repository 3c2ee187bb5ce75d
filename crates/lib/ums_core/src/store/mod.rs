//! Credential store adapter.
//!
//! The service only talks to users through [`UserStore`]. Two adapters ship:
//! [`memory::MemoryUserStore`] for tests and single-process deployments and
//! [`postgres::PgUserStore`] on sqlx.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::{NewUser, User, UserPage, UserQuery};

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field (email or mobile) collides with another record.
    #[error("{0}")]
    Conflict(String),

    #[error("User not found")]
    NotFound,

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),
}

pub const EMAIL_CONFLICT: &str = "Email already exists";
pub const MOBILE_CONFLICT: &str = "Mobile number already exists";

/// Find/create/update/delete user records.
///
/// Lookups return soft-deleted records too; callers decide what "active"
/// means. Email arguments are expected to be normalised already.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Whether any record other than `except` uses `email`.
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, StoreError>;

    /// Whether any record other than `except` uses `mobile`.
    async fn mobile_taken(&self, mobile: &str, except: Option<Uuid>) -> Result<bool, StoreError>;

    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Persist every mutable field of `user`. Last write wins.
    async fn update(&self, user: &User) -> Result<User, StoreError>;

    /// Remove the record. Returns `false` if it did not exist.
    async fn hard_delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Mark the record deleted at `at`. Returns `false` if it did not exist.
    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Page through records that are not soft-deleted.
    async fn list(&self, query: &UserQuery) -> Result<UserPage, StoreError>;
}
