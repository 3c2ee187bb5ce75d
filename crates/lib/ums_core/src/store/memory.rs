//! In-memory user store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EMAIL_CONFLICT, MOBILE_CONFLICT, StoreError, UserStore};
use crate::models::user::{NewUser, User, UserPage, UserQuery};

/// User store backed by a `HashMap` behind an async `RwLock`.
///
/// Uniqueness is checked under the write lock, so concurrent inserts of the
/// same email cannot both succeed.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn conflict(
    users: &HashMap<Uuid, User>,
    email: &str,
    mobile: &str,
    except: Option<Uuid>,
) -> Option<StoreError> {
    let others = || users.values().filter(|u| Some(u.id) != except);
    if others().any(|u| u.email == email) {
        return Some(StoreError::Conflict(EMAIL_CONFLICT.into()));
    }
    if others().any(|u| u.mobile == mobile) {
        return Some(StoreError::Conflict(MOBILE_CONFLICT.into()));
    }
    None
}

fn matches_search(user: &User, needle: &str) -> bool {
    user.name.to_lowercase().contains(needle)
        || user.email.to_lowercase().contains(needle)
        || user.mobile.contains(needle)
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|u| u.email == email && Some(u.id) != except))
    }

    async fn mobile_taken(&self, mobile: &str, except: Option<Uuid>) -> Result<bool, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .any(|u| u.mobile == mobile && Some(u.id) != except))
    }

    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if let Some(err) = conflict(&users, &new.email, &new.mobile, None) {
            return Err(err);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            name: new.name,
            email: new.email,
            mobile: new.mobile,
            password_hash: new.password_hash,
            profile_pic: new.profile_pic,
            role: new.role,
            is_blocked: false,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if let Some(err) = conflict(&users, &user.email, &user.mobile, Some(user.id)) {
            return Err(err);
        }
        let mut stored = user.clone();
        stored.updated_at = Utc::now();
        users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn hard_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.get_mut(&id) {
            Some(user) => {
                user.is_deleted = true;
                user.deleted_at = Some(at);
                user.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, query: &UserQuery) -> Result<UserPage, StoreError> {
        let users = self.users.read().await;
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matching: Vec<&User> = users
            .values()
            .filter(|u| u.is_active())
            .filter(|u| needle.as_deref().is_none_or(|n| matches_search(u, n)))
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(UserPage { users: page, total })
    }
}
