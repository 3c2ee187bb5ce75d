//! API server configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use ums_core::auth::jwt::{
    DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS, resolve_jwt_secret,
};
use ums_core::models::auth::TokenClass;

/// Default lifetime of the refresh cookie: 30 minutes.
pub const DEFAULT_REFRESH_COOKIE_MAX_AGE_SECS: i64 = 30 * 60;

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:5000").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Access token signing secret.
    pub access_secret: String,
    /// Refresh token signing secret. Must differ from the access secret.
    pub refresh_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    /// `Max-Age` of the refresh cookie, independent of the token's own expiry.
    pub refresh_cookie_max_age_secs: i64,
    /// The account with this email is the super-admin.
    pub super_admin_email: String,
    /// Production mode: secure, cross-site refresh cookie.
    pub production: bool,
    /// Allowed CORS origin (credentials enabled).
    pub frontend_url: String,
    /// Directory uploaded images are written to and served from.
    pub upload_dir: PathBuf,
    /// Externally visible origin used to build image URLs.
    pub public_base_url: String,
    /// Initial password of accounts created from the admin panel.
    pub default_user_password: String,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                      | Default                           |
    /// |-------------------------------|-----------------------------------|
    /// | `BIND_ADDR`                   | `127.0.0.1:5000`                  |
    /// | `DATABASE_URL`                | unset (in-memory store)           |
    /// | `JWT_ACCESS_SECRET`           | generated & persisted to file     |
    /// | `JWT_REFRESH_SECRET`          | generated & persisted to file     |
    /// | `ACCESS_TOKEN_TTL_SECS`       | `900`                             |
    /// | `REFRESH_TOKEN_TTL_SECS`      | `21600`                           |
    /// | `REFRESH_COOKIE_MAX_AGE_SECS` | `1800`                            |
    /// | `SUPER_ADMIN_EMAIL`           | `superadmin@example.com`          |
    /// | `APP_ENV`                     | `development`                     |
    /// | `FRONTEND_URL`                | `http://localhost:5173`           |
    /// | `UPLOAD_DIR`                  | `./uploads`                       |
    /// | `PUBLIC_BASE_URL`             | `http://{BIND_ADDR}`              |
    /// | `DEFAULT_USER_PASSWORD`       | `HelloWorld@123`                  |
    pub fn from_env() -> Self {
        let bind_addr = env_string("BIND_ADDR", "127.0.0.1:5000");
        let public_base_url = env_string("PUBLIC_BASE_URL", &format!("http://{bind_addr}"));
        Self {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            access_secret: resolve_jwt_secret(TokenClass::Access),
            refresh_secret: resolve_jwt_secret(TokenClass::Refresh),
            access_token_ttl_secs: env_or("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl_secs: env_or(
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            ),
            refresh_cookie_max_age_secs: env_or(
                "REFRESH_COOKIE_MAX_AGE_SECS",
                DEFAULT_REFRESH_COOKIE_MAX_AGE_SECS,
            ),
            super_admin_email: env_string("SUPER_ADMIN_EMAIL", "superadmin@example.com"),
            production: env_string("APP_ENV", "development").eq_ignore_ascii_case("production"),
            frontend_url: env_string("FRONTEND_URL", "http://localhost:5173"),
            upload_dir: PathBuf::from(env_string("UPLOAD_DIR", "./uploads")),
            public_base_url,
            default_user_password: env_string("DEFAULT_USER_PASSWORD", "HelloWorld@123"),
            bind_addr,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("refresh_cookie_max_age_secs", &self.refresh_cookie_max_age_secs)
            .field("super_admin_email", &self.super_admin_email)
            .field("production", &self.production)
            .field("frontend_url", &self.frontend_url)
            .field("upload_dir", &self.upload_dir)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}
