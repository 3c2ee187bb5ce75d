//! JWT token issuance and verification.
//!
//! Access and refresh tokens share a claim shape (`sub`, `iat`, `exp`) but are
//! signed with different secrets, so one class can never be replayed as the
//! other.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenClass};

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Default refresh token lifetime: 6 hours.
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 6 * 60 * 60;

/// Token verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Bad signature, wrong secret or malformed payload.
    #[error("token is invalid")]
    Invalid,

    /// Correctly signed but past its `exp` claim.
    #[error("token has expired")]
    Expired,
}

/// Sign a `{sub, iat, exp}` claim set with HS256.
pub fn sign_token(
    user_id: Uuid,
    secret: &[u8],
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

/// Verify a token against `secret` at instant `now`.
///
/// The signature is checked first, so a token signed with another secret is
/// `Invalid` even when it is also past expiry. Expiry has no leeway: a token
/// is expired from the second named by its `exp` claim onwards.
pub fn verify_token(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<TokenClaims, TokenError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let claims = decode::<TokenClaims>(token, &key, &validation)
        .map_err(|_| TokenError::Invalid)?
        .claims;

    if now.timestamp() >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// Issues and verifies both token classes.
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        access_secret: impl Into<Vec<u8>>,
        refresh_secret: impl Into<Vec<u8>>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    fn secret(&self, class: TokenClass) -> &[u8] {
        match class {
            TokenClass::Access => &self.access_secret,
            TokenClass::Refresh => &self.refresh_secret,
        }
    }

    fn ttl(&self, class: TokenClass) -> Duration {
        match class {
            TokenClass::Access => self.access_ttl,
            TokenClass::Refresh => self.refresh_ttl,
        }
    }

    /// Issue a token of the given class for `user_id`.
    pub fn issue(
        &self,
        class: TokenClass,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        sign_token(user_id, self.secret(class), self.ttl(class), now)
    }

    pub fn issue_access(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.issue(TokenClass::Access, user_id, now)
    }

    pub fn issue_refresh(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.issue(TokenClass::Refresh, user_id, now)
    }

    /// Verify a token of the given class.
    pub fn verify(
        &self,
        class: TokenClass,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, TokenError> {
        verify_token(token, self.secret(class), now)
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

/// Resolve the signing secret for a token class.
///
/// `JWT_ACCESS_SECRET` / `JWT_REFRESH_SECRET` → persisted file → freshly
/// generated (and persisted) random secret.
pub fn resolve_jwt_secret(class: TokenClass) -> String {
    let var = match class {
        TokenClass::Access => "JWT_ACCESS_SECRET",
        TokenClass::Refresh => "JWT_REFRESH_SECRET",
    };
    if let Ok(secret) = std::env::var(var)
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path(class);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(class = class.as_str(), path = %secret_path.display(), "generated new JWT secret");
    secret
}

/// Path to the persisted secret file for a token class.
fn jwt_secret_path(class: TokenClass) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ums")
        .join(format!("jwt-{}-secret", class.as_str()))
}
