//! Self-service profile handlers.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Multipart, State};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ChangePasswordRequest, MessageResponse, PublicUser};
use crate::services::forms::UserForm;
use crate::services::{auth, users};

/// `GET /user/profile`
pub async fn get_profile_handler(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<PublicUser> {
    Json(user)
}

/// `PUT /user/profile`: multipart name, email, mobile and optional image.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<PublicUser>> {
    let form = UserForm::parse(multipart?).await?;
    let updated = users::update_profile(&state, user.id, form).await?;
    Ok(Json(updated))
}

/// `PUT /user/password`
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(body) = payload?;
    auth::change_password(&state, user.id, &body.current_password, &body.new_password).await?;
    Ok(Json(MessageResponse::new(users::PASSWORD_UPDATED)))
}
