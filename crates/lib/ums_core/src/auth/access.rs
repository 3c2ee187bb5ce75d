//! Role and ownership rules for mutating other users' records.
//!
//! The super-admin is identified by email against a configured address, never
//! by stored state. Rules are evaluated in a fixed order and the first one
//! that matches decides the outcome.

use thiserror::Error;
use uuid::Uuid;

use crate::models::user::{PublicUser, Role, User};

/// Anything the policy can reason about: an id, an email and a role.
pub trait Principal {
    fn id(&self) -> Uuid;
    fn email(&self) -> &str;
    fn role(&self) -> Role;

    fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

impl Principal for User {
    fn id(&self) -> Uuid {
        self.id
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn role(&self) -> Role {
        self.role
    }
}

impl Principal for PublicUser {
    fn id(&self) -> Uuid {
        self.id
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn role(&self) -> Role {
        self.role
    }
}

/// Why an actor may not perform an operation on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("You cannot delete your own account.")]
    SelfDelete,

    #[error("Access denied! You cannot delete the super admin.")]
    SuperAdminDelete,

    #[error("Access denied! Only the super admin can update their own details.")]
    SuperAdminEdit,

    #[error("Access denied! Only the super admin can delete another admin.")]
    AdminDelete,

    #[error("Access denied! Admins cannot edit other admin accounts.")]
    AdminEdit,

    #[error("Access denied! Only the super admin can change user roles.")]
    RoleChange,

    #[error("Access denied! Only the super admin can create admin accounts.")]
    AdminCreate,

    #[error("Access denied! This email address is reserved.")]
    ReservedEmail,

    #[error("Not authorized as admin")]
    NotAdmin,
}

impl AccessDenied {
    /// Self-deletion is a malformed request rather than a permission issue.
    pub fn is_bad_request(self) -> bool {
        matches!(self, AccessDenied::SelfDelete)
    }
}

/// Outcome of an update check: which role, if any, should be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleUpdate {
    /// Leave the stored role alone.
    Keep,
    /// Write this role (only ever produced for the super-admin).
    Set(Role),
}

/// Access policy bound to the configured super-admin address.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    super_admin_email: String,
}

impl AccessPolicy {
    pub fn new(super_admin_email: impl AsRef<str>) -> Self {
        Self {
            super_admin_email: super_admin_email.as_ref().trim().to_lowercase(),
        }
    }

    pub fn super_admin_email(&self) -> &str {
        &self.super_admin_email
    }

    /// Whether `email` belongs to the super-admin.
    pub fn is_super_admin_email(&self, email: &str) -> bool {
        !self.super_admin_email.is_empty()
            && email.trim().eq_ignore_ascii_case(&self.super_admin_email)
    }

    pub fn is_super_admin(&self, principal: &impl Principal) -> bool {
        self.is_super_admin_email(principal.email())
    }

    /// Gate for admin-only routes.
    pub fn require_admin(&self, requester: &impl Principal) -> Result<(), AccessDenied> {
        if requester.is_admin() {
            Ok(())
        } else {
            Err(AccessDenied::NotAdmin)
        }
    }

    /// First delete rule: nobody deletes themselves. Checked before the
    /// target is loaded.
    pub fn check_not_self(
        &self,
        requester: &impl Principal,
        target_id: Uuid,
    ) -> Result<(), AccessDenied> {
        if requester.id() == target_id {
            return Err(AccessDenied::SelfDelete);
        }
        Ok(())
    }

    /// Hard and soft delete share these rules.
    pub fn check_delete(
        &self,
        requester: &impl Principal,
        target: &impl Principal,
    ) -> Result<(), AccessDenied> {
        self.check_not_self(requester, target.id())?;
        if self.is_super_admin(target) {
            return Err(AccessDenied::SuperAdminDelete);
        }
        if target.is_admin() && !self.is_super_admin(requester) {
            return Err(AccessDenied::AdminDelete);
        }
        Ok(())
    }

    /// Rules for an admin update of `target`, including an optional role
    /// change request.
    pub fn check_update(
        &self,
        requester: &impl Principal,
        target: &impl Principal,
        requested_role: Option<Role>,
    ) -> Result<RoleUpdate, AccessDenied> {
        let requester_is_super = self.is_super_admin(requester);

        if self.is_super_admin(target) && !requester_is_super {
            return Err(AccessDenied::SuperAdminEdit);
        }
        if target.is_admin() && requester.id() != target.id() && !requester_is_super {
            return Err(AccessDenied::AdminEdit);
        }

        match requested_role {
            Some(role) if requester_is_super => Ok(RoleUpdate::Set(role)),
            Some(role) if role != target.role() => Err(AccessDenied::RoleChange),
            _ => Ok(RoleUpdate::Keep),
        }
    }

    /// Creating an admin account is reserved to the super-admin.
    pub fn check_create(&self, requester: &impl Principal, role: Role) -> Result<(), AccessDenied> {
        if role == Role::Admin && !self.is_super_admin(requester) {
            return Err(AccessDenied::AdminCreate);
        }
        Ok(())
    }

    /// The super-admin address can only be taken by registering with it.
    /// `current` is the record's present email, `None` for a new record.
    pub fn check_email_claim(
        &self,
        current: Option<&str>,
        email: &str,
    ) -> Result<(), AccessDenied> {
        let already_super = current.is_some_and(|c| self.is_super_admin_email(c));
        if self.is_super_admin_email(email) && !already_super {
            return Err(AccessDenied::ReservedEmail);
        }
        Ok(())
    }

    /// Role a self-registration ends up with. Only the super-admin address
    /// may register as admin, and it does so by default.
    pub fn registration_role(
        &self,
        email: &str,
        requested: Option<Role>,
    ) -> Result<Role, AccessDenied> {
        let is_super = self.is_super_admin_email(email);
        match requested {
            Some(Role::Admin) if !is_super => Err(AccessDenied::AdminCreate),
            Some(role) => Ok(role),
            None if is_super => Ok(Role::Admin),
            None => Ok(Role::User),
        }
    }
}
