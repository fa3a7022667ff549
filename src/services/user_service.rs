// src/services/user_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::{AppError, AuthzError},
    db::{RbacStore, UserStore},
    middleware::tenancy::{caller_business, ensure_can_assign_level, ensure_not_self, ensure_same_business},
    models::{
        auth::{OverrideEffect, User, UserRole},
        rbac::EffectivePermissions,
        users::{CreateUserPayload, NewUser, UpdateUserPayload, UserChanges},
    },
    services::{auth::AuthService, permission_resolver::PermissionResolver},
};

/// Role values to persist after an assignment passed every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleAssignment {
    pub role: UserRole,
    pub role_id: Uuid,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    rbac: Arc<dyn RbacStore>,
    resolver: PermissionResolver,
    auth: AuthService,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        rbac: Arc<dyn RbacStore>,
        resolver: PermissionResolver,
        auth: AuthService,
    ) -> Self {
        Self { users, rbac, resolver, auth }
    }

    pub async fn list_users(&self, caller: &User) -> Result<Vec<User>, AppError> {
        let business_id = caller_business(caller)?;
        self.users.list_by_business(business_id).await
    }

    pub async fn get_user(&self, caller: &User, id: Uuid) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthzError::NotFound("User".into()))?;
        ensure_same_business(caller, user.business_id, "User")?;
        Ok(user)
    }

    pub async fn create_user(&self, caller: &User, payload: CreateUserPayload) -> Result<User, AppError> {
        let business_id = caller_business(caller)?;

        let role = match (payload.role, payload.role_id) {
            (None, None) => Some(UserRole::Employee),
            (role, _) => role,
        };
        let assignment = self
            .check_role_assignment(caller, role, payload.role_id)
            .await?
            .ok_or_else(|| AuthzError::validation("role", "A role is required."))?;

        let password_hash = self.auth.hash_password(&payload.password).await?;

        let user = self
            .users
            .create_user(NewUser {
                email: payload.email,
                name: payload.name,
                password_hash,
                role: assignment.role,
                role_id: Some(assignment.role_id),
                business_id,
            })
            .await?;

        tracing::info!(%business_id, user_id = %user.id, role = user.role.as_str(), "User created");
        Ok(user)
    }

    pub async fn update_user(
        &self,
        caller: &User,
        id: Uuid,
        payload: UpdateUserPayload,
    ) -> Result<User, AppError> {
        let target = self.get_user(caller, id).await?;

        if payload.changes_role() {
            ensure_not_self(caller, id, "change the role of")?;
        }
        if payload.is_active == Some(false) {
            ensure_not_self(caller, id, "deactivate")?;
        }
        if target.id != caller.id {
            self.ensure_outranks(caller, &target).await?;
        }

        let assignment = self
            .check_role_assignment(caller, payload.role, payload.role_id)
            .await?;

        let changes = UserChanges {
            name: payload.name,
            role: assignment.map(|a| a.role),
            role_id: assignment.map(|a| a.role_id),
            is_active: payload.is_active,
        };

        let updated = self
            .users
            .update_user(id, changes)
            .await?
            .ok_or_else(|| AuthzError::NotFound("User".into()))?;

        if assignment.is_some() || payload.is_active.is_some() {
            self.resolver.clear_user_cache(id);
        }
        Ok(updated)
    }

    /// Soft delete. The row stays, the account can no longer authenticate.
    pub async fn deactivate_user(&self, caller: &User, id: Uuid) -> Result<User, AppError> {
        ensure_not_self(caller, id, "deactivate")?;
        let target = self.get_user(caller, id).await?;
        self.ensure_outranks(caller, &target).await?;

        let updated = self
            .users
            .update_user(id, UserChanges { is_active: Some(false), ..Default::default() })
            .await?
            .ok_or_else(|| AuthzError::NotFound("User".into()))?;
        self.resolver.clear_user_cache(id);

        tracing::info!(user_id = %id, by = %caller.id, "User deactivated");
        Ok(updated)
    }

    pub async fn set_permission_override(
        &self,
        caller: &User,
        id: Uuid,
        permission: &str,
        action: OverrideEffect,
    ) -> Result<EffectivePermissions, AppError> {
        let target = self.get_user(caller, id).await?;
        match action {
            OverrideEffect::Grant => self.resolver.grant_custom_permission(target.id, permission).await,
            OverrideEffect::Revoke => self.resolver.revoke_custom_permission(target.id, permission).await,
        }
    }

    async fn authority_level(&self, user: &User) -> Result<i32, AppError> {
        let resolved = self.resolver.get_user_permissions(user.id).await?;
        Ok(resolved.role_level.unwrap_or(0))
    }

    /// Only accounts strictly below the caller's level can be managed.
    async fn ensure_outranks(&self, caller: &User, target: &User) -> Result<(), AppError> {
        let caller_level = self.authority_level(caller).await?;
        let target_level = self.authority_level(target).await?;
        if target_level >= caller_level {
            return Err(AuthzError::Forbidden(
                "You cannot manage a user at or above your own authority level.".into(),
            )
            .into());
        }
        Ok(())
    }

    /// Checks an incoming `role` / `role_id` pair. A bare legacy role is mapped
    /// onto the business's system role of the same name. The legacy enum always
    /// follows the role row: custom roles are stored as EMPLOYEE.
    pub async fn check_role_assignment(
        &self,
        caller: &User,
        role: Option<UserRole>,
        role_id: Option<Uuid>,
    ) -> Result<Option<RoleAssignment>, AppError> {
        let business_id = caller_business(caller)?;

        let target_role = match (role_id, role) {
            (Some(role_id), _) => {
                let found = self
                    .rbac
                    .find_role(role_id)
                    .await?
                    .ok_or_else(|| AuthzError::NotFound("Role".into()))?;
                ensure_same_business(caller, Some(found.business_id), "Role")?;
                found
            }
            (None, Some(role)) => self
                .rbac
                .find_role_by_name(business_id, role.as_str())
                .await?
                .ok_or_else(|| AuthzError::NotFound("Role".into()))?,
            (None, None) => return Ok(None),
        };

        let user_role = target_role
            .is_system
            .then(|| UserRole::from_name(&target_role.name))
            .flatten()
            .unwrap_or(UserRole::Employee);

        // 1. Elevation to OWNER / MANAGER is reserved to the owner
        if matches!(user_role, UserRole::Owner | UserRole::Manager) && caller.role != UserRole::Owner {
            return Err(AuthzError::Forbidden(
                "Only the business owner can assign the OWNER or MANAGER role.".into(),
            )
            .into());
        }

        // 2. A legacy role sent alongside `roleId` must agree with it
        if let Some(sent) = role.filter(|r| *r != user_role) {
            return Err(AuthzError::validation(
                "role",
                format!("Role {} does not match the selected roleId.", sent.as_str()),
            )
            .into());
        }

        // 3. The role must be usable
        if !target_role.is_active {
            return Err(AuthzError::validation("roleId", "This role is inactive.").into());
        }

        // 4. And strictly below the caller
        let caller_level = self.authority_level(caller).await?;
        ensure_can_assign_level(caller_level, target_role.level)?;

        Ok(Some(RoleAssignment {
            role: user_role,
            role_id: target_role.id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::rbac::CreateRolePayload,
        testing::{TestApp, PASSWORD},
    };

    fn create_payload(email: &str, role: UserRole) -> CreateUserPayload {
        CreateUserPayload {
            email: email.into(),
            password: PASSWORD.into(),
            name: Some("Staff".into()),
            role: Some(role),
            role_id: None,
        }
    }

    #[tokio::test]
    async fn owner_creates_manager_with_system_role_link() {
        let app = TestApp::new().await;
        let manager = app
            .state
            .user_service
            .create_user(&app.owner, create_payload("m@example.com", UserRole::Manager))
            .await
            .unwrap();

        assert_eq!(manager.role, UserRole::Manager);
        assert_eq!(manager.business_id, Some(app.business.id));
        let role = RbacStore::find_role(&app.store, manager.role_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(role.name, "MANAGER");
    }

    #[tokio::test]
    async fn manager_cannot_elevate_to_manager_or_owner() {
        let app = TestApp::new().await;
        let manager = app.add_user(UserRole::Manager).await;
        // overrides never lift this restriction
        app.state
            .permission_resolver
            .grant_custom_permission(manager.id, "roles:manage")
            .await
            .unwrap();

        for role in [UserRole::Manager, UserRole::Owner] {
            let err = app
                .state
                .user_service
                .create_user(&manager, create_payload("x@example.com", role))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Authz(AuthzError::Forbidden(_))), "{:?}", role);
        }

        let employee = app
            .state
            .user_service
            .create_user(&manager, create_payload("e@example.com", UserRole::Employee))
            .await
            .unwrap();
        assert_eq!(employee.role, UserRole::Employee);
    }

    #[tokio::test]
    async fn owner_cannot_mint_another_owner() {
        let app = TestApp::new().await;
        let err = app
            .state
            .user_service
            .create_user(&app.owner, create_payload("o2@example.com", UserRole::Owner))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::Validation { .. })));
    }

    #[tokio::test]
    async fn foreign_user_is_not_found() {
        let app = TestApp::new().await;
        let other = app.other_business().await;

        let err = app.state.user_service.get_user(&app.owner, other.owner.id).await.unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::NotFound(_))));

        let err = app
            .state
            .user_service
            .deactivate_user(&app.owner, other.owner.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::NotFound(_))));
    }

    #[tokio::test]
    async fn self_deactivation_is_rejected() {
        let app = TestApp::new().await;
        let err = app
            .state
            .user_service
            .deactivate_user(&app.owner, app.owner.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::Validation { .. })));

        let err = app
            .state
            .user_service
            .update_user(
                &app.owner,
                app.owner.id,
                UpdateUserPayload { is_active: Some(false), ..Default::default() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::Validation { .. })));
    }

    #[tokio::test]
    async fn manager_cannot_deactivate_owner() {
        let app = TestApp::new().await;
        let manager = app.add_user(UserRole::Manager).await;
        let err = app
            .state
            .user_service
            .deactivate_user(&manager, app.owner.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::Forbidden(_))));
    }

    #[tokio::test]
    async fn role_change_invalidates_cached_permissions() {
        let app = TestApp::new().await;
        let employee = app.add_user(UserRole::Employee).await;
        let resolver = &app.state.permission_resolver;
        assert!(!resolver.get_user_permissions(employee.id).await.unwrap().contains("users:read"));

        app.state
            .user_service
            .update_user(
                &app.owner,
                employee.id,
                UpdateUserPayload { role: Some(UserRole::Manager), ..Default::default() },
            )
            .await
            .unwrap();

        let perms = resolver.get_user_permissions(employee.id).await.unwrap();
        assert!(perms.contains("users:read"));
        assert_eq!(perms.role_name.as_deref(), Some("MANAGER"));
    }

    #[tokio::test]
    async fn list_is_scoped_to_caller_business() {
        let app = TestApp::new().await;
        app.add_user(UserRole::Employee).await;
        app.other_business().await;

        let users = app.state.user_service.list_users(&app.owner).await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.business_id == Some(app.business.id)));
    }

    async fn presser_role(app: &TestApp) -> Uuid {
        app.state
            .role_service
            .create_role(
                &app.owner,
                CreateRolePayload {
                    name: "PRESSER".into(),
                    description: None,
                    level: 15,
                    permissions: vec!["orders:read".into()],
                },
            )
            .await
            .unwrap()
            .role
            .id
    }

    #[tokio::test]
    async fn custom_role_never_carries_the_owner_enum() {
        let app = TestApp::new().await;
        let presser = presser_role(&app).await;
        let service = &app.state.user_service;

        let mut payload = create_payload("p@example.com", UserRole::Owner);
        payload.role_id = Some(presser);
        let err = service.create_user(&app.owner, payload).await.unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::Validation { ref field, .. }) if field == "role"));

        let mut payload = create_payload("p@example.com", UserRole::Employee);
        payload.role = None;
        payload.role_id = Some(presser);
        let user = service.create_user(&app.owner, payload).await.unwrap();
        assert_eq!(user.role, UserRole::Employee);
        assert_eq!(user.role_id, Some(presser));

        let err = service
            .update_user(
                &app.owner,
                user.id,
                UpdateUserPayload {
                    role: Some(UserRole::Owner),
                    role_id: Some(presser),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::Validation { ref field, .. }) if field == "role"));

        let stored = service.get_user(&app.owner, user.id).await.unwrap();
        assert_eq!(stored.role, UserRole::Employee);
        let owners = service.list_users(&app.owner).await.unwrap();
        assert_eq!(owners.iter().filter(|u| u.role == UserRole::Owner).count(), 1);
    }

    #[tokio::test]
    async fn manager_cannot_assign_manager_on_update() {
        let app = TestApp::new().await;
        let manager = app.add_user(UserRole::Manager).await;
        let employee = app.add_user(UserRole::Employee).await;
        let manager_role = RbacStore::find_role_by_name(&app.store, app.business.id, "MANAGER")
            .await
            .unwrap()
            .unwrap();

        for payload in [
            UpdateUserPayload { role: Some(UserRole::Manager), ..Default::default() },
            UpdateUserPayload { role: Some(UserRole::Owner), ..Default::default() },
            UpdateUserPayload { role_id: Some(manager_role.id), ..Default::default() },
        ] {
            let err = app
                .state
                .user_service
                .update_user(&manager, employee.id, payload)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Authz(AuthzError::Forbidden(_))));
        }

        let unchanged = app.state.user_service.get_user(&manager, employee.id).await.unwrap();
        assert_eq!(unchanged.role, UserRole::Employee);
        assert_eq!(unchanged.role_id, None);
    }

    #[tokio::test]
    async fn manager_cannot_edit_accounts_above_them() {
        let app = TestApp::new().await;
        let manager = app.add_user(UserRole::Manager).await;
        let employee = app.add_user(UserRole::Employee).await;
        let service = &app.state.user_service;

        for payload in [
            UpdateUserPayload { name: Some("Renamed".into()), ..Default::default() },
            UpdateUserPayload { is_active: Some(true), ..Default::default() },
        ] {
            let err = service.update_user(&manager, app.owner.id, payload).await.unwrap_err();
            assert!(matches!(err, AppError::Authz(AuthzError::Forbidden(_))));
        }

        let renamed = service
            .update_user(
                &manager,
                employee.id,
                UpdateUserPayload { name: Some("Renamed".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Renamed"));

        // own profile stays editable
        let me = service
            .update_user(
                &manager,
                manager.id,
                UpdateUserPayload { name: Some("Me".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(me.name.as_deref(), Some("Me"));
    }
}
