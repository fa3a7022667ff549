// src/services/permission_resolver.rs

use std::{collections::BTreeSet, sync::Arc};

use uuid::Uuid;

use crate::{
    common::error::{AppError, AuthzError},
    db::{RbacStore, UserStore},
    models::{
        auth::{OverrideEffect, PermissionOverride, User},
        rbac::{EffectivePermissions, Role},
    },
    services::{catalog, permission_cache::PermissionCache},
};

/// Applies per-user overrides on top of role-derived permissions.
/// Revokes run last, so a revoke always wins over the role.
pub fn apply_overrides(permissions: &mut BTreeSet<String>, overrides: &[PermissionOverride]) {
    for o in overrides.iter().filter(|o| o.effect == OverrideEffect::Grant) {
        permissions.insert(o.permission.clone());
    }
    for o in overrides.iter().filter(|o| o.effect == OverrideEffect::Revoke) {
        permissions.remove(&o.permission);
    }
}

/// Returns the override list with `permission` set to `effect`.
/// At most one entry per permission; setting the same effect twice is a no-op.
pub fn with_override(
    overrides: &[PermissionOverride],
    permission: &str,
    effect: OverrideEffect,
) -> Vec<PermissionOverride> {
    let mut next: Vec<PermissionOverride> = overrides
        .iter()
        .filter(|o| o.permission != permission)
        .cloned()
        .collect();
    next.push(PermissionOverride {
        permission: permission.to_string(),
        effect,
    });
    next
}

#[derive(Clone)]
pub struct PermissionResolver {
    users: Arc<dyn UserStore>,
    rbac: Arc<dyn RbacStore>,
    cache: Arc<dyn PermissionCache>,
}

impl PermissionResolver {
    pub fn new(
        users: Arc<dyn UserStore>,
        rbac: Arc<dyn RbacStore>,
        cache: Arc<dyn PermissionCache>,
    ) -> Self {
        Self { users, rbac, cache }
    }

    /// Effective permission set of a user. A missing user resolves to an empty set.
    pub async fn get_user_permissions(&self, user_id: Uuid) -> Result<EffectivePermissions, AppError> {
        if let Some(hit) = self.cache.get(user_id) {
            return Ok(hit);
        }

        let Some(user) = self.users.find_by_id(user_id).await? else {
            return Ok(EffectivePermissions::default());
        };

        let resolved = self.compute(&user).await?;
        self.cache.set(user_id, resolved.clone());
        Ok(resolved)
    }

    pub fn clear_user_cache(&self, user_id: Uuid) {
        self.cache.delete(user_id);
    }

    /// Drops the cached set of every user whose permissions derive from `role`.
    pub async fn clear_role_cache(&self, role: &Role) -> Result<(), AppError> {
        let holders = self.users.list_ids_holding_role(role).await?;
        for user_id in &holders {
            self.cache.delete(*user_id);
        }
        tracing::debug!(role = %role.name, users = holders.len(), "Cleared permission cache for role holders");
        Ok(())
    }

    pub async fn grant_custom_permission(
        &self,
        user_id: Uuid,
        permission: &str,
    ) -> Result<EffectivePermissions, AppError> {
        self.set_override(user_id, permission, OverrideEffect::Grant).await
    }

    pub async fn revoke_custom_permission(
        &self,
        user_id: Uuid,
        permission: &str,
    ) -> Result<EffectivePermissions, AppError> {
        self.set_override(user_id, permission, OverrideEffect::Revoke).await
    }

    async fn set_override(
        &self,
        user_id: Uuid,
        permission: &str,
        effect: OverrideEffect,
    ) -> Result<EffectivePermissions, AppError> {
        if !catalog::is_known_permission(permission) {
            return Err(AuthzError::validation(
                "permission",
                format!("Unknown permission '{}'.", permission),
            )
            .into());
        }

        self.users.set_permission_override(user_id, permission, effect).await?;
        self.clear_user_cache(user_id);

        tracing::info!(%user_id, permission, ?effect, "Custom permission override recorded");
        self.get_user_permissions(user_id).await
    }

    async fn role_of(&self, user: &User) -> Result<Option<Role>, AppError> {
        let Some(business_id) = user.business_id else {
            return Ok(None);
        };

        let role = match user.role_id {
            Some(role_id) => self.rbac.find_role(role_id).await?,
            // Legacy accounts resolve through the system role of the same name
            None => self.rbac.find_role_by_name(business_id, user.role.as_str()).await?,
        };

        Ok(role.filter(|r| r.business_id == business_id))
    }

    async fn compute(&self, user: &User) -> Result<EffectivePermissions, AppError> {
        let (role_name, role_level, mut permissions) = match self.role_of(user).await? {
            Some(role) => {
                let mut permissions = BTreeSet::new();
                if role.is_active {
                    permissions.extend(self.rbac.find_permissions_by_role(role.id).await?);
                }
                (role.name, role.level, permissions)
            }
            // Legacy account in a business without seeded role rows
            None if user.role_id.is_none() && user.business_id.is_some() => {
                let seed = catalog::system_role(user.role);
                let permissions: BTreeSet<String> = seed.permissions.iter().map(|p| p.to_string()).collect();
                (seed.role.as_str().to_string(), catalog::legacy_level(user.role), permissions)
            }
            None => {
                tracing::debug!(user_id = %user.id, "User has no resolvable role");
                return Ok(EffectivePermissions::default());
            }
        };

        apply_overrides(&mut permissions, &user.custom_permissions);

        Ok(EffectivePermissions {
            role_name: Some(role_name),
            role_level: Some(role_level),
            permissions,
        })
    }
}
