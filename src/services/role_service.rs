// src/services/role_service.rs

use std::{
    collections::BTreeSet,
    sync::{Arc, LazyLock},
};

use regex::Regex;
use uuid::Uuid;

use crate::{
    common::error::{AppError, AuthzError},
    db::{RbacStore, UserStore},
    middleware::tenancy::{caller_business, ensure_can_assign_level, ensure_same_business},
    models::{
        auth::User,
        rbac::{CreateRolePayload, NewRole, Role, RoleChanges, RoleResponse, UpdateRolePayload},
    },
    services::permission_resolver::PermissionResolver,
};

static ROLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z_]+$").expect("role name pattern is valid"));

fn validate_role_name(name: &str) -> Result<(), AuthzError> {
    if !ROLE_NAME.is_match(name) {
        return Err(AuthzError::validation(
            "name",
            "Role name may only contain upper-case letters and underscores.",
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct RoleService {
    rbac: Arc<dyn RbacStore>,
    users: Arc<dyn UserStore>,
    resolver: PermissionResolver,
}

impl RoleService {
    pub fn new(rbac: Arc<dyn RbacStore>, users: Arc<dyn UserStore>, resolver: PermissionResolver) -> Self {
        Self { rbac, users, resolver }
    }

    pub async fn list_roles(&self, caller: &User) -> Result<Vec<RoleResponse>, AppError> {
        let business_id = caller_business(caller)?;
        let roles = self.rbac.list_roles(business_id).await?;

        let mut response = Vec::with_capacity(roles.len());
        for role in roles {
            response.push(self.with_permissions(role).await?);
        }
        Ok(response)
    }

    pub async fn get_role(&self, caller: &User, id: Uuid) -> Result<RoleResponse, AppError> {
        let role = self.scoped_role(caller, id).await?;
        self.with_permissions(role).await
    }

    pub async fn create_role(&self, caller: &User, payload: CreateRolePayload) -> Result<RoleResponse, AppError> {
        let business_id = caller_business(caller)?;

        // 1. Shape
        validate_role_name(&payload.name)?;

        // 2. Authority
        let caller_level = self.caller_level(caller).await?;
        ensure_can_assign_level(caller_level, payload.level)?;

        // 3. Permission names -> ids
        let permission_ids = self.resolve_permission_ids(&payload.permissions).await?;

        // 4. Insert (role + links in one transaction)
        let role = self
            .rbac
            .create_role(
                NewRole {
                    business_id,
                    name: payload.name,
                    description: payload.description,
                    level: payload.level,
                    is_system: false,
                },
                &permission_ids,
            )
            .await?;

        tracing::info!(%business_id, role = %role.name, level = role.level, "Custom role created");
        self.with_permissions(role).await
    }

    pub async fn update_role(
        &self,
        caller: &User,
        id: Uuid,
        payload: UpdateRolePayload,
    ) -> Result<RoleResponse, AppError> {
        let role = self.scoped_role(caller, id).await?;

        let permission_ids = if role.is_system {
            if payload.touches_core_fields() {
                return Err(AuthzError::validation(
                    "role",
                    "System roles only allow changing description and isActive.",
                )
                .into());
            }
            None
        } else {
            if let Some(name) = &payload.name {
                validate_role_name(name)?;
            }
            let caller_level = self.caller_level(caller).await?;
            // Roles at or above the caller cannot be touched, nor raised there
            ensure_can_assign_level(caller_level, role.level)?;
            if let Some(level) = payload.level {
                ensure_can_assign_level(caller_level, level)?;
            }
            match &payload.permissions {
                Some(names) => Some(self.resolve_permission_ids(names).await?),
                None => None,
            }
        };

        let updated = self
            .rbac
            .update_role(
                id,
                RoleChanges {
                    name: payload.name,
                    description: payload.description,
                    level: payload.level,
                    is_active: payload.is_active,
                },
                permission_ids.as_deref(),
            )
            .await?;

        // Holders resolve against the new definition from now on
        self.resolver.clear_role_cache(&updated).await?;

        tracing::info!(role_id = %id, "Role updated");
        self.with_permissions(updated).await
    }

    pub async fn delete_role(&self, caller: &User, id: Uuid) -> Result<(), AppError> {
        let role = self.scoped_role(caller, id).await?;

        if role.is_system {
            return Err(AuthzError::validation("role", "System roles cannot be deleted.").into());
        }

        let holders = self.users.count_by_role_id(id).await?;
        if holders > 0 {
            return Err(AuthzError::validation(
                "role",
                format!("Role is still assigned to {} user(s).", holders),
            )
            .into());
        }

        self.rbac.delete_role(id).await?;
        tracing::info!(role_id = %id, "Role deleted");
        Ok(())
    }

    async fn scoped_role(&self, caller: &User, id: Uuid) -> Result<Role, AppError> {
        let role = self
            .rbac
            .find_role(id)
            .await?
            .ok_or_else(|| AuthzError::NotFound("Role".into()))?;
        ensure_same_business(caller, Some(role.business_id), "Role")?;
        Ok(role)
    }

    async fn caller_level(&self, caller: &User) -> Result<i32, AppError> {
        let resolved = self.resolver.get_user_permissions(caller.id).await?;
        Ok(resolved.role_level.unwrap_or(0))
    }

    async fn with_permissions(&self, role: Role) -> Result<RoleResponse, AppError> {
        let mut permissions = self.rbac.find_permissions_by_role(role.id).await?;
        permissions.sort();
        Ok(RoleResponse { role, permissions })
    }

    /// Every name must exist in the catalog; unknown names are reported together.
    async fn resolve_permission_ids(&self, names: &[String]) -> Result<Vec<Uuid>, AppError> {
        let wanted: BTreeSet<&String> = names.iter().collect();
        let found = self
            .rbac
            .find_permissions_by_names(&wanted.iter().map(|n| n.to_string()).collect::<Vec<_>>())
            .await?;

        let unknown: Vec<&str> = wanted
            .iter()
            .filter(|name| !found.iter().any(|p| &&p.name == *name))
            .map(|name| name.as_str())
            .collect();
        if !unknown.is_empty() {
            return Err(AuthzError::validation(
                "permissions",
                format!("Unknown permissions: {}.", unknown.join(", ")),
            )
            .into());
        }

        Ok(found.into_iter().map(|p| p.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{auth::UserRole, users::UserChanges},
        testing::TestApp,
    };

    fn payload(name: &str, level: i32, permissions: &[&str]) -> CreateRolePayload {
        CreateRolePayload {
            name: name.into(),
            description: None,
            level,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn role_names_are_upper_snake_case() {
        assert!(validate_role_name("SHIFT_LEAD").is_ok());
        assert!(validate_role_name("shift_lead").is_err());
        assert!(validate_role_name("SHIFT-LEAD").is_err());
        assert!(validate_role_name("").is_err());
    }

    #[tokio::test]
    async fn owner_creates_role_below_own_level() {
        let app = TestApp::new().await;
        let role = app
            .state
            .role_service
            .create_role(&app.owner, payload("SHIFT_LEAD", 30, &["orders:update", "orders:read"]))
            .await
            .unwrap();

        assert_eq!(role.role.business_id, app.business.id);
        assert!(!role.role.is_system);
        assert_eq!(role.permissions, vec!["orders:read", "orders:update"]);
    }

    #[tokio::test]
    async fn role_at_owner_level_is_rejected() {
        let app = TestApp::new().await;
        let err = app
            .state
            .role_service
            .create_role(&app.owner, payload("CO_OWNER", 100, &[]))
            .await
            .unwrap_err();
        match err {
            AppError::Authz(AuthzError::Validation { field, reason }) => {
                assert_eq!(field, "level");
                assert!(reason.contains("authority level"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_permission_names_are_rejected() {
        let app = TestApp::new().await;
        let err = app
            .state
            .role_service
            .create_role(&app.owner, payload("PRESSER", 15, &["orders:read", "rockets:launch"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::Validation { ref field, .. }) if field == "permissions"));
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let app = TestApp::new().await;
        let service = &app.state.role_service;
        service.create_role(&app.owner, payload("PRESSER", 15, &[])).await.unwrap();
        let err = service.create_role(&app.owner, payload("PRESSER", 15, &[])).await.unwrap_err();
        assert!(matches!(err, AppError::RoleNameAlreadyExists(_)));
    }

    #[tokio::test]
    async fn system_role_core_fields_are_immutable() {
        let app = TestApp::new().await;
        let driver = RbacStore::find_role_by_name(&app.store, app.business.id, "DRIVER")
            .await
            .unwrap()
            .unwrap();
        let service = &app.state.role_service;

        let err = service
            .update_role(&app.owner, driver.id, UpdateRolePayload { level: Some(5), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::Validation { .. })));

        let updated = service
            .update_role(
                &app.owner,
                driver.id,
                UpdateRolePayload { description: Some("Van drivers".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.role.description.as_deref(), Some("Van drivers"));
        assert_eq!(updated.role.level, driver.level);
    }

    #[tokio::test]
    async fn permission_change_reaches_role_holders() {
        let app = TestApp::new().await;
        let service = &app.state.role_service;
        let role = service
            .create_role(&app.owner, payload("PRESSER", 15, &["orders:read"]))
            .await
            .unwrap();

        let presser = app.add_user(UserRole::Employee).await;
        UserStore::update_user(
            &app.store,
            presser.id,
            UserChanges { role_id: Some(role.role.id), ..Default::default() },
        )
        .await
        .unwrap();

        let resolver = &app.state.permission_resolver;
        assert!(!resolver.get_user_permissions(presser.id).await.unwrap().contains("orders:update"));

        service
            .update_role(
                &app.owner,
                role.role.id,
                UpdateRolePayload {
                    permissions: Some(vec!["orders:read".into(), "orders:update".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(resolver.get_user_permissions(presser.id).await.unwrap().contains("orders:update"));
    }

    #[tokio::test]
    async fn delete_refuses_system_and_assigned_roles() {
        let app = TestApp::new().await;
        let service = &app.state.role_service;

        let owner_role = app.owner.role_id.unwrap();
        let err = service.delete_role(&app.owner, owner_role).await.unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::Validation { .. })));

        let role = service.create_role(&app.owner, payload("PRESSER", 15, &[])).await.unwrap();
        let presser = app.add_user(UserRole::Employee).await;
        UserStore::update_user(
            &app.store,
            presser.id,
            UserChanges { role_id: Some(role.role.id), ..Default::default() },
        )
        .await
        .unwrap();
        assert!(service.delete_role(&app.owner, role.role.id).await.is_err());

        UserStore::update_user(
            &app.store,
            presser.id,
            UserChanges { is_active: Some(false), ..Default::default() },
        )
        .await
        .unwrap();
        // deactivated accounts still hold the role
        assert!(service.delete_role(&app.owner, role.role.id).await.is_err());
    }

    #[tokio::test]
    async fn unused_custom_role_can_be_deleted() {
        let app = TestApp::new().await;
        let service = &app.state.role_service;
        let role = service.create_role(&app.owner, payload("PRESSER", 15, &[])).await.unwrap();

        service.delete_role(&app.owner, role.role.id).await.unwrap();
        let err = service.get_role(&app.owner, role.role.id).await.unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::NotFound(_))));
    }

    #[tokio::test]
    async fn foreign_roles_are_invisible() {
        let app = TestApp::new().await;
        let other = app.other_business().await;
        let foreign = RbacStore::find_role_by_name(&app.store, other.business.id, "EMPLOYEE")
            .await
            .unwrap()
            .unwrap();

        let err = app.state.role_service.get_role(&app.owner, foreign.id).await.unwrap_err();
        assert!(matches!(err, AppError::Authz(AuthzError::NotFound(_))));

        let listed = app.state.role_service.list_roles(&app.owner).await.unwrap();
        assert_eq!(listed.len(), 4);
        assert!(listed.iter().all(|r| r.role.business_id == app.business.id));
    }
}
