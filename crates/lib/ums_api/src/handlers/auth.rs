//! Session request handlers: register, login, refresh, logout and the current
//! user.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum_extra::extract::CookieJar;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AUTH_REQUIRED, AuthenticatedUser};
use crate::models::{
    AuthResponse, LoginRequest, MeResponse, MessageResponse, RefreshResponse, RegisterRequest,
};
use crate::services::auth::{self, IssuedSession};
use crate::services::cookies::{REFRESH_COOKIE, clear_refresh_cookie, refresh_cookie};

pub const LOGGED_OUT: &str = "Logged out successfully";

/// Put the refresh token in the cookie jar and the rest in the body.
fn session_response(
    state: &AppState,
    jar: CookieJar,
    session: IssuedSession,
) -> (CookieJar, Json<AuthResponse>) {
    let jar = jar.add(refresh_cookie(&session.refresh_token, &state.cookies));
    let body = Json(AuthResponse {
        user_data: session.user,
        access_token: session.access_token,
    });
    (jar, body)
}

/// `POST /user/register`: create an account and start a session.
pub async fn register_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let Json(body) = payload?;
    let session = auth::register(&state, body).await?;
    let (jar, body) = session_response(&state, jar, session);
    Ok((StatusCode::CREATED, jar, body))
}

/// `POST /user/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let Json(body) = payload?;
    let session = auth::login(&state, &body.email, &body.password).await?;
    Ok(session_response(&state, jar, session))
}

/// `POST /user/refresh-token`: new access token from the refresh cookie.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<Json<RefreshResponse>> {
    let token = jar.get(REFRESH_COOKIE).map(|c| c.value().to_owned());
    let new_access_token = auth::refresh(&state, token.as_deref()).await?;
    Ok(Json(RefreshResponse { new_access_token }))
}

/// `POST /user/logout`: always clears the refresh cookie.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.add(clear_refresh_cookie(&state.cookies));
    (jar, Json(MessageResponse::new(LOGGED_OUT)))
}

/// `GET /user/me`: the identity attached by the auth middleware.
pub async fn me_handler(
    user: Option<Extension<AuthenticatedUser>>,
) -> AppResult<Json<MeResponse>> {
    let Extension(AuthenticatedUser(auth_user)) =
        user.ok_or_else(|| AppError::Unauthorized(AUTH_REQUIRED.into()))?;
    Ok(Json(MeResponse { auth_user }))
}
