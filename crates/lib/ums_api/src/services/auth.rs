//! Authentication service: register/login/refresh flows and bearer token
//! authentication, delegating to `ums_core::auth`.

use tracing::{debug, info, warn};
use ums_core::auth::TokenError;
use ums_core::auth::password::{hash_password, validate_password, verify_password};
use ums_core::models::auth::TokenClass;
use ums_core::models::user::{NewUser, PublicUser, Role, User};
use ums_core::store::{EMAIL_CONFLICT, MOBILE_CONFLICT};
use ums_core::validation::{normalize_email, validate_mobile, validate_name};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::RegisterRequest;

pub const NOT_REGISTERED: &str = "You haven't registered yet. Please sign up first.";
pub const INCORRECT_PASSWORD: &str = "Incorrect password!";
pub const ACCOUNT_BLOCKED: &str = "Your account has been blocked. Please contact support.";
pub const REFRESH_MISSING: &str = "Refresh token is missing";
pub const REFRESH_EXPIRED: &str = "Refresh token expired. Please login again.";
pub const REFRESH_INVALID_USER: &str = "Invalid refresh token";
pub const ACCESS_TOKEN_FAILED: &str = "Not authorized, access token is expired or failed.";
pub const USER_NOT_FOUND: &str = "Not authorized, user not found in database.";
pub const CURRENT_PASSWORD_INCORRECT: &str = "Current password is incorrect";

/// A freshly established session: the user, a bearer access token, and the
/// refresh token destined for the cookie.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Issue both tokens for `user`.
fn issue_session(state: &AppState, user: &User) -> AppResult<IssuedSession> {
    let now = state.clock.now();
    Ok(IssuedSession {
        user: PublicUser::from(user),
        access_token: state.tokens.issue_access(user.id, now)?,
        refresh_token: state.tokens.issue_refresh(user.id, now)?,
    })
}

/// Register a new account and log it in.
pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<IssuedSession> {
    let name = validate_name(&req.name)?;
    let email = normalize_email(&req.email)?;
    let mobile = validate_mobile(&req.mobile)?;
    validate_password(&req.password)?;
    let requested_role = req
        .role
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(str::parse::<Role>)
        .transpose()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if state.store.email_taken(&email, None).await? {
        return Err(AppError::Conflict(EMAIL_CONFLICT.into()));
    }
    if state.store.mobile_taken(&mobile, None).await? {
        return Err(AppError::Conflict(MOBILE_CONFLICT.into()));
    }

    let role = state.policy.registration_role(&email, requested_role)?;
    let password_hash = hash_password(&req.password)?;

    let user = state
        .store
        .insert(NewUser {
            name,
            email,
            mobile,
            password_hash,
            profile_pic: None,
            role,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "registered new user");
    issue_session(state, &user)
}

/// Authenticate with email + password.
///
/// A blocked account is refused before the password is looked at, so the
/// outcome for a blocked account does not depend on the password.
pub async fn login(state: &AppState, email: &str, password: &str) -> AppResult<IssuedSession> {
    let email = normalize_email(email)?;

    let user = match state.store.find_by_email(&email).await? {
        Some(user) if user.is_active() => user,
        _ => return Err(AppError::Unauthorized(NOT_REGISTERED.into())),
    };

    if user.is_blocked {
        warn!(user_id = %user.id, "login refused for blocked account");
        return Err(AppError::Forbidden(ACCOUNT_BLOCKED.into()));
    }

    if !verify_password(password, &user.password_hash)? {
        debug!(user_id = %user.id, "incorrect password");
        return Err(AppError::Unauthorized(INCORRECT_PASSWORD.into()));
    }

    info!(user_id = %user.id, "user logged in");
    issue_session(state, &user)
}

/// Exchange the refresh cookie for a new access token. The refresh token is
/// not rotated.
pub async fn refresh(state: &AppState, refresh_token: Option<&str>) -> AppResult<String> {
    let token = refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized(REFRESH_MISSING.into()))?;

    let claims = state
        .tokens
        .verify(TokenClass::Refresh, token, state.clock.now())
        .map_err(|e| {
            debug!(error = %e, "refresh token rejected");
            AppError::Unauthorized(REFRESH_EXPIRED.into())
        })?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized(REFRESH_EXPIRED.into()))?;

    let user = match state.store.find_by_id(user_id).await? {
        Some(user) if user.is_active() && !user.is_blocked => user,
        _ => {
            warn!(%user_id, "refresh token for missing or disabled user");
            return Err(AppError::Forbidden(REFRESH_INVALID_USER.into()));
        }
    };

    let access_token = state.tokens.issue_access(user.id, state.clock.now())?;
    debug!(user_id = %user.id, "issued refreshed access token");
    Ok(access_token)
}

/// Verify a bearer access token and load the (active) user it names.
pub async fn authenticate(state: &AppState, token: &str) -> AppResult<User> {
    let claims = state
        .tokens
        .verify(TokenClass::Access, token, state.clock.now())
        .map_err(|e| match e {
            TokenError::Expired => AppError::TokenExpired(ACCESS_TOKEN_FAILED.into()),
            TokenError::Invalid => AppError::Unauthorized(ACCESS_TOKEN_FAILED.into()),
        })?;

    let user_id: Uuid = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized(ACCESS_TOKEN_FAILED.into()))?;

    match state.store.find_by_id(user_id).await? {
        Some(user) if user.is_active() => Ok(user),
        _ => Err(AppError::Unauthorized(USER_NOT_FOUND.into())),
    }
}

/// Change the password of `user_id` after checking the current one.
pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> AppResult<()> {
    let mut user = match state.store.find_by_id(user_id).await? {
        Some(user) if user.is_active() => user,
        _ => return Err(AppError::Unauthorized(USER_NOT_FOUND.into())),
    };

    if !verify_password(current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized(CURRENT_PASSWORD_INCORRECT.into()));
    }
    validate_password(new_password)?;

    user.password_hash = hash_password(new_password)?;
    state.store.update(&user).await?;
    info!(user_id = %user.id, "password changed");
    Ok(())
}
