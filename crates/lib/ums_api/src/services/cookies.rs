//! Cookie service: set/clear the httpOnly refresh cookie.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::config::ApiConfig;

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Attributes shared by setting and clearing the refresh cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieSettings {
    pub secure: bool,
    pub same_site: SameSite,
    pub max_age_secs: i64,
}

impl CookieSettings {
    /// Production: `Secure; SameSite=None` for a cross-site frontend.
    /// Otherwise `SameSite=Lax` over plain HTTP.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            secure: config.production,
            same_site: if config.production {
                SameSite::None
            } else {
                SameSite::Lax
            },
            max_age_secs: config.refresh_cookie_max_age_secs,
        }
    }
}

fn base(value: String, settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE.to_string(), value))
        .http_only(true)
        .secure(settings.secure)
        .same_site(settings.same_site)
        .path("/".to_string())
        .build()
}

/// Build the httpOnly cookie carrying a refresh token.
pub fn refresh_cookie(token: &str, settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = base(token.to_string(), settings);
    cookie.set_max_age(Duration::seconds(settings.max_age_secs));
    cookie
}

/// Build an expired cookie to clear the refresh token.
pub fn clear_refresh_cookie(settings: &CookieSettings) -> Cookie<'static> {
    let mut cookie = base(String::new(), settings);
    cookie.set_max_age(Duration::ZERO);
    cookie
}
