//! Admin panel handlers. All routes sit behind `require_auth` and
//! `require_admin`.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::StatusCode;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CreateUserResponse, ListUsersQuery, MessageResponse, UserListResponse};
use crate::services::forms::UserForm;
use crate::services::users::{self, parse_user_id};

/// `GET /admin/users?search=&page=&limit=`
pub async fn list_users_handler(
    State(state): State<AppState>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> AppResult<Json<UserListResponse>> {
    let Query(query) = query?;
    Ok(Json(users::list_users(&state, query).await?))
}

/// `POST /admin/create-user`
pub async fn create_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(requester)): Extension<AuthenticatedUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<CreateUserResponse>)> {
    let form = UserForm::parse(multipart?).await?;
    let new_user_data = users::create_user(&state, &requester, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            new_user_data,
            message: users::USER_CREATED.into(),
        }),
    ))
}

/// `PUT /admin/update-user/{user_id}`
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(requester)): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<MessageResponse>> {
    let target_id = parse_user_id(&user_id)?;
    let form = UserForm::parse(multipart?).await?;
    users::update_user(&state, &requester, target_id, form).await?;
    Ok(Json(MessageResponse::new(users::USER_UPDATED)))
}

/// `DELETE /admin/delete-user/{user_id}`: permanent.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(requester)): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let target_id = parse_user_id(&user_id)?;
    users::hard_delete_user(&state, &requester, target_id).await?;
    Ok(Json(MessageResponse::new(users::USER_HARD_DELETED)))
}

/// `DELETE /admin/soft-delete-user/{user_id}`
pub async fn soft_delete_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(requester)): Extension<AuthenticatedUser>,
    Path(user_id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let target_id = parse_user_id(&user_id)?;
    users::soft_delete_user(&state, &requester, target_id).await?;
    Ok(Json(MessageResponse::new(users::USER_SOFT_DELETED)))
}
