// src/db/store.rs
//
// The persistence surface the authorization layer needs. Postgres repositories
// implement these for production, `MemoryStore` for tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{OverrideEffect, User},
        business::{Business, NewBusiness},
        rbac::{NewRole, Permission, Role, RoleChanges},
        users::{NewUser, UserChanges},
    },
    services::catalog::{PermissionSeed, SystemRoleSeed},
};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<User>, AppError>;

    /// Fails with `EmailAlreadyExists` on a duplicate e-mail.
    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError>;

    /// Sets one override in a single atomic write, replacing any earlier entry
    /// for the same permission. Fails with `NotFound` for an unknown user.
    async fn set_permission_override(
        &self,
        id: Uuid,
        permission: &str,
        effect: OverrideEffect,
    ) -> Result<(), AppError>;

    /// Users whose permissions derive from `role`: explicit `role_id` holders,
    /// plus legacy-enum holders of the same business when `role` is a system role.
    async fn list_ids_holding_role(&self, role: &Role) -> Result<Vec<Uuid>, AppError>;

    async fn count_by_role_id(&self, role_id: Uuid) -> Result<i64, AppError>;
}

#[async_trait]
pub trait BusinessStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Business>, AppError>;

    /// Opens a business, seeds its system roles and creates its owner, atomically.
    /// The owner is linked to the seeded OWNER role.
    async fn create_with_owner(
        &self,
        business: NewBusiness,
        owner: NewUser,
        system_roles: &[SystemRoleSeed],
    ) -> Result<(Business, User), AppError>;
}

#[async_trait]
pub trait RbacStore: Send + Sync {
    /// Upserts the permission catalog by name.
    async fn sync_permissions(&self, seeds: &[PermissionSeed]) -> Result<(), AppError>;

    async fn list_permissions(&self) -> Result<Vec<Permission>, AppError>;

    async fn find_permissions_by_names(&self, names: &[String]) -> Result<Vec<Permission>, AppError>;

    async fn find_role(&self, id: Uuid) -> Result<Option<Role>, AppError>;

    async fn find_role_by_name(&self, business_id: Uuid, name: &str) -> Result<Option<Role>, AppError>;

    /// Permission names bound to the role.
    async fn find_permissions_by_role(&self, role_id: Uuid) -> Result<Vec<String>, AppError>;

    async fn list_roles(&self, business_id: Uuid) -> Result<Vec<Role>, AppError>;

    /// Fails with `RoleNameAlreadyExists` on a duplicate name within the business.
    async fn create_role(&self, role: NewRole, permission_ids: &[Uuid]) -> Result<Role, AppError>;

    /// `permission_ids` replaces the role's permission set when present.
    async fn update_role(
        &self,
        id: Uuid,
        changes: RoleChanges,
        permission_ids: Option<&[Uuid]>,
    ) -> Result<Role, AppError>;

    async fn delete_role(&self, id: Uuid) -> Result<(), AppError>;
}
