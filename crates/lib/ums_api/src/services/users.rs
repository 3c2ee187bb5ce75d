//! Profile and admin user services.

use tracing::{info, warn};
use ums_core::auth::access::RoleUpdate;
use ums_core::auth::password::hash_password;
use ums_core::images::{ImageUpload, USER_IMAGES_FOLDER};
use ums_core::models::user::{NewUser, PublicUser, Role, User, UserQuery};
use ums_core::store::{EMAIL_CONFLICT, MOBILE_CONFLICT};
use ums_core::validation::{normalize_email, validate_mobile, validate_name};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{ListUsersQuery, UserListResponse};
use crate::services::forms::UserForm;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

pub const USER_CREATED: &str = "New user account created successfully.";
pub const USER_UPDATED: &str = "User information updated successfully";
pub const USER_HARD_DELETED: &str = "User has been permanently deleted.";
pub const USER_SOFT_DELETED: &str = "User has been marked as deleted.";
pub const PASSWORD_UPDATED: &str = "Password updated successfully";

const UPDATE_TARGET_MISSING: &str = "User data not found to update";
const DELETE_TARGET_MISSING: &str = "User does not exist or already deleted.";

/// Wording of uniqueness conflicts, which differs between the self-service
/// profile form and the admin panel.
struct ConflictMessages {
    email: &'static str,
    mobile: &'static str,
}

const PROFILE_CONFLICTS: ConflictMessages = ConflictMessages {
    email: "Email already in use. Please use a different email or login.",
    mobile: "Mobile number already in use. Please use a different number or login.",
};

const ADMIN_CONFLICTS: ConflictMessages = ConflictMessages {
    email: "Email already in use. Please use a different email.",
    mobile: "Mobile number already in use. Please use a different number.",
};

/// Parse a user id from a path segment.
pub fn parse_user_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation("Invalid user id".into()))
}

async fn store_image(state: &AppState, image: ImageUpload) -> AppResult<String> {
    Ok(state.images.upload(image, USER_IMAGES_FOLDER).await?)
}

/// Apply the identity fields present in `form` to `user`, re-checking email
/// and mobile uniqueness against every other record.
async fn apply_identity(
    state: &AppState,
    user: &mut User,
    form: &UserForm,
    messages: &ConflictMessages,
) -> AppResult<()> {
    if let Some(name) = &form.name {
        user.name = validate_name(name)?;
    }
    if let Some(email) = &form.email {
        let email = normalize_email(email)?;
        state.policy.check_email_claim(Some(&user.email), &email)?;
        if state.store.email_taken(&email, Some(user.id)).await? {
            return Err(AppError::Conflict(messages.email.into()));
        }
        user.email = email;
    }
    if let Some(mobile) = &form.mobile {
        let mobile = validate_mobile(mobile)?;
        if state.store.mobile_taken(&mobile, Some(user.id)).await? {
            return Err(AppError::Conflict(messages.mobile.into()));
        }
        user.mobile = mobile;
    }
    Ok(())
}

/// Load a record that has not been soft deleted.
async fn find_active(state: &AppState, id: Uuid) -> AppResult<Option<User>> {
    Ok(state.store.find_by_id(id).await?.filter(User::is_active))
}

/// Self-service profile update. Role and blocked state in the form are
/// ignored.
pub async fn update_profile(
    state: &AppState,
    user_id: Uuid,
    form: UserForm,
) -> AppResult<PublicUser> {
    let mut user = find_active(state, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(super::auth::USER_NOT_FOUND.into()))?;

    apply_identity(state, &mut user, &form, &PROFILE_CONFLICTS).await?;
    if let Some(image) = form.image {
        user.profile_pic = Some(store_image(state, image).await?);
    }

    let updated = state.store.update(&user).await?;
    info!(user_id = %updated.id, "profile updated");
    Ok(PublicUser::from(updated))
}

/// One page of non-deleted users.
pub async fn list_users(state: &AppState, query: ListUsersQuery) -> AppResult<UserListResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    let search = query
        .search
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty());

    let result = state
        .store
        .list(&UserQuery {
            search,
            page,
            limit,
        })
        .await?;

    Ok(UserListResponse {
        users: result.users.iter().map(PublicUser::from).collect(),
        total: result.total,
        page,
        total_pages: result.total.div_ceil(u64::from(limit)),
    })
}

/// Admin-created account with the configured default password.
pub async fn create_user(
    state: &AppState,
    requester: &PublicUser,
    form: UserForm,
) -> AppResult<PublicUser> {
    let (name, email, mobile) = form.required_identity()?;
    let name = validate_name(name)?;
    let email = normalize_email(email)?;
    let mobile = validate_mobile(mobile)?;
    let role = form.role.unwrap_or(Role::User);

    state.policy.check_create(requester, role)?;
    state.policy.check_email_claim(None, &email)?;

    if state.store.email_taken(&email, None).await? {
        return Err(AppError::Conflict(EMAIL_CONFLICT.into()));
    }
    if state.store.mobile_taken(&mobile, None).await? {
        return Err(AppError::Conflict(MOBILE_CONFLICT.into()));
    }

    let profile_pic = match form.image {
        Some(image) => Some(store_image(state, image).await?),
        None => None,
    };
    let password_hash = hash_password(&state.config.default_user_password)?;

    let user = state
        .store
        .insert(NewUser {
            name,
            email,
            mobile,
            password_hash,
            profile_pic,
            role,
        })
        .await?;

    info!(requester = %requester.id, user_id = %user.id, role = %user.role, "admin created user");
    Ok(PublicUser::from(user))
}

/// Admin edit of another record (or their own).
pub async fn update_user(
    state: &AppState,
    requester: &PublicUser,
    target_id: Uuid,
    form: UserForm,
) -> AppResult<()> {
    let mut target = find_active(state, target_id)
        .await?
        .ok_or_else(|| AppError::NotFound(UPDATE_TARGET_MISSING.into()))?;

    let role_update = state.policy.check_update(requester, &target, form.role)?;

    apply_identity(state, &mut target, &form, &ADMIN_CONFLICTS).await?;
    if let RoleUpdate::Set(role) = role_update {
        target.role = role;
    }
    if let Some(blocked) = form.is_blocked {
        if blocked && state.policy.is_super_admin(&target) {
            warn!(requester = %requester.id, "refusing to block the super admin");
            return Err(AppError::Forbidden(
                "Access denied! You cannot block the super admin.".into(),
            ));
        }
        target.is_blocked = blocked;
    }
    if let Some(image) = form.image {
        target.profile_pic = Some(store_image(state, image).await?);
    }

    state.store.update(&target).await?;
    info!(requester = %requester.id, user_id = %target.id, "admin updated user");
    Ok(())
}

/// Load the delete target after the self-delete check. Soft-deleted records
/// are only visible to a hard delete.
async fn delete_target(
    state: &AppState,
    requester: &PublicUser,
    target_id: Uuid,
    include_soft_deleted: bool,
) -> AppResult<User> {
    state.policy.check_not_self(requester, target_id)?;

    let target = state
        .store
        .find_by_id(target_id)
        .await?
        .filter(|u| include_soft_deleted || u.is_active())
        .ok_or_else(|| AppError::NotFound(DELETE_TARGET_MISSING.into()))?;

    state.policy.check_delete(requester, &target)?;
    Ok(target)
}

/// Remove the record permanently.
pub async fn hard_delete_user(
    state: &AppState,
    requester: &PublicUser,
    target_id: Uuid,
) -> AppResult<()> {
    let target = delete_target(state, requester, target_id, true).await?;
    if !state.store.hard_delete(target.id).await? {
        return Err(AppError::NotFound(DELETE_TARGET_MISSING.into()));
    }
    info!(requester = %requester.id, user_id = %target.id, "user permanently deleted");
    Ok(())
}

/// Mark the record deleted. It stays in the store and keeps its email and
/// mobile reserved.
pub async fn soft_delete_user(
    state: &AppState,
    requester: &PublicUser,
    target_id: Uuid,
) -> AppResult<()> {
    let target = delete_target(state, requester, target_id, false).await?;
    if !state.store.soft_delete(target.id, state.clock.now()).await? {
        return Err(AppError::NotFound(DELETE_TARGET_MISSING.into()));
    }
    info!(requester = %requester.id, user_id = %target.id, "user soft deleted");
    Ok(())
}
