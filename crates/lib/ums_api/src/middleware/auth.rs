//! Authentication middleware: bearer token extraction, JWT verification and
//! the admin role gate.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use ums_core::models::user::PublicUser;

use crate::AppState;
use crate::error::AppError;
use crate::services::auth::authenticate;

/// Identity attached to the request by [`require_auth`]. Carries no password
/// hash.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub PublicUser);

pub const AUTH_REQUIRED: &str = "Authentication required. No access token provided.";

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum middleware: verifies the bearer access token, loads the user it names
/// and injects [`AuthenticatedUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Owned: the request body is not `Sync`, so no borrow of the request may
    // live across the await below.
    let token = bearer_token(&request)
        .map(str::to_owned)
        .ok_or_else(|| {
            debug!("no bearer token on request");
            AppError::Unauthorized(AUTH_REQUIRED.into())
        })?;

    let user = authenticate(&state, &token).await?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser(PublicUser::from(&user)));

    Ok(next.run(request).await)
}

/// Axum middleware: lets the request through only for admins. Must run after
/// [`require_auth`].
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized(AUTH_REQUIRED.into()))?;

    state.policy.require_admin(&user.0)?;

    Ok(next.run(request).await)
}
