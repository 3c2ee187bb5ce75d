//! User domain models.
//!
//! `User` is the stored record and carries the password hash; anything that
//! leaves the service goes through [`PublicUser`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Account role. The super-admin is not a role: it is the account whose email
/// matches the configured super-admin address.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Stored user record.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Always lowercase.
    pub email: String,
    pub mobile: String,
    pub password_hash: String,
    pub profile_pic: Option<String>,
    pub role: Role,
    pub is_blocked: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Soft-deleted accounts are treated as absent by every auth flow.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password_hash: String,
    pub profile_pic: Option<String>,
    pub role: Role,
}

/// Password-free projection of a user, as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    #[serde(default)]
    pub profile_pic: Option<String>,
    #[serde(default)]
    pub is_blocked: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            role: user.role,
            profile_pic: user.profile_pic.clone(),
            is_blocked: user.is_blocked,
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser::from(&user)
    }
}

/// Admin listing filter.
#[derive(Debug, Clone)]
pub struct UserQuery {
    /// Case-insensitive substring matched against name, email and mobile.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl UserQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            search: None,
            page: 1,
            limit: 10,
        }
    }
}

/// One page of users plus the total number of matches.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
}
