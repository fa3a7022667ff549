// src/db/memory.rs
//
// In-process implementation of every store trait. Used by the test suite and
// handy for running the API without Postgres.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::{AppError, AuthzError},
    db::store::{BusinessStore, RbacStore, UserStore},
    models::{
        auth::{OverrideEffect, User},
        business::{Business, NewBusiness, Plan},
        rbac::{NewRole, Permission, Role, RoleChanges},
        users::{NewUser, UserChanges},
    },
    services::{
        catalog::{PermissionSeed, SystemRoleSeed},
        permission_resolver::with_override,
    },
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    businesses: HashMap<Uuid, Business>,
    roles: HashMap<Uuid, Role>,
    permissions: HashMap<Uuid, Permission>,
    role_permissions: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl Inner {
    fn permission_ids_by_names(&self, names: &[&str]) -> BTreeSet<Uuid> {
        self.permissions
            .values()
            .filter(|p| names.contains(&p.name.as_str()))
            .map(|p| p.id)
            .collect()
    }

    fn insert_user(&mut self, new_user: NewUser) -> Result<User, AppError> {
        if self.users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::EmailAlreadyExists);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            role_id: new_user.role_id,
            business_id: Some(new_user.business_id),
            is_active: true,
            custom_permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn insert_role(&mut self, new_role: NewRole, permission_ids: BTreeSet<Uuid>) -> Result<Role, AppError> {
        let duplicate = self
            .roles
            .values()
            .any(|r| r.business_id == new_role.business_id && r.name == new_role.name);
        if duplicate {
            return Err(AppError::RoleNameAlreadyExists(new_role.name));
        }
        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            business_id: new_role.business_id,
            name: new_role.name,
            description: new_role.description,
            level: new_role.level,
            is_system: new_role.is_system,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.role_permissions.insert(role.id, permission_ids);
        self.roles.insert(role.id, role.clone());
        Ok(role)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan changes come from billing, which lives outside this service.
    pub async fn set_business_plan(&self, business_id: Uuid, plan: Plan) {
        if let Some(business) = self.inner.write().await.businesses.get_mut(&business_id) {
            business.plan = plan;
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_by_business(&self, business_id: Uuid) -> Result<Vec<User>, AppError> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| u.business_id == Some(business_id))
            .cloned()
            .collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, AppError> {
        self.inner.write().await.insert_user(new_user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.write().await;
        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = Some(name);
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(role_id) = changes.role_id {
            user.role_id = Some(role_id);
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn set_permission_override(
        &self,
        id: Uuid,
        permission: &str,
        effect: OverrideEffect,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| AuthzError::NotFound("User".into()))?;
        user.custom_permissions = with_override(&user.custom_permissions, permission, effect);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn list_ids_holding_role(&self, role: &Role) -> Result<Vec<Uuid>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|u| {
                u.role_id == Some(role.id)
                    || (role.is_system
                        && u.role_id.is_none()
                        && u.business_id == Some(role.business_id)
                        && u.role.as_str() == role.name)
            })
            .map(|u| u.id)
            .collect())
    }

    async fn count_by_role_id(&self, role_id: Uuid) -> Result<i64, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().filter(|u| u.role_id == Some(role_id)).count() as i64)
    }
}

#[async_trait]
impl BusinessStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Business>, AppError> {
        Ok(self.inner.read().await.businesses.get(&id).cloned())
    }

    async fn create_with_owner(
        &self,
        business: NewBusiness,
        mut owner: NewUser,
        system_roles: &[SystemRoleSeed],
    ) -> Result<(Business, User), AppError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == owner.email) {
            return Err(AppError::EmailAlreadyExists);
        }

        let now = Utc::now();
        let business = Business {
            id: Uuid::new_v4(),
            name: business.name,
            phone: None,
            email: business.email,
            address: None,
            business_type: business.business_type,
            plan: Plan::Pro,
            onboarding_completed: false,
            created_at: now,
            updated_at: now,
        };
        inner.businesses.insert(business.id, business.clone());

        for seed in system_roles {
            let permission_ids = inner.permission_ids_by_names(seed.permissions);
            let role = inner.insert_role(
                NewRole {
                    business_id: business.id,
                    name: seed.role.as_str().to_string(),
                    description: Some(seed.description.to_string()),
                    level: seed.level,
                    is_system: true,
                },
                permission_ids,
            )?;
            if seed.role == owner.role {
                owner.role_id = Some(role.id);
            }
        }

        owner.business_id = business.id;
        let user = inner.insert_user(owner)?;
        Ok((business, user))
    }
}

#[async_trait]
impl RbacStore for MemoryStore {
    async fn sync_permissions(&self, seeds: &[PermissionSeed]) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        for seed in seeds {
            let (resource, action) = seed.resource_and_action();
            let existing = inner
                .permissions
                .values()
                .find(|p| p.name == seed.name)
                .map(|p| p.id);
            let id = existing.unwrap_or_else(Uuid::new_v4);
            inner.permissions.insert(
                id,
                Permission {
                    id,
                    name: seed.name.to_string(),
                    category: seed.category.to_string(),
                    action: action.to_string(),
                    resource: resource.to_string(),
                    description: Some(seed.description.to_string()),
                },
            );
        }
        Ok(())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>, AppError> {
        let inner = self.inner.read().await;
        let mut permissions: Vec<Permission> = inner.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
        Ok(permissions)
    }

    async fn find_permissions_by_names(&self, names: &[String]) -> Result<Vec<Permission>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .permissions
            .values()
            .filter(|p| names.contains(&p.name))
            .cloned()
            .collect())
    }

    async fn find_role(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        Ok(self.inner.read().await.roles.get(&id).cloned())
    }

    async fn find_role_by_name(&self, business_id: Uuid, name: &str) -> Result<Option<Role>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .roles
            .values()
            .find(|r| r.business_id == business_id && r.name == name)
            .cloned())
    }

    async fn find_permissions_by_role(&self, role_id: Uuid) -> Result<Vec<String>, AppError> {
        let inner = self.inner.read().await;
        let Some(ids) = inner.role_permissions.get(&role_id) else {
            return Ok(Vec::new());
        };
        let mut names: Vec<String> = ids
            .iter()
            .filter_map(|id| inner.permissions.get(id))
            .map(|p| p.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn list_roles(&self, business_id: Uuid) -> Result<Vec<Role>, AppError> {
        let inner = self.inner.read().await;
        let mut roles: Vec<Role> = inner
            .roles
            .values()
            .filter(|r| r.business_id == business_id)
            .cloned()
            .collect();
        roles.sort_by(|a, b| b.level.cmp(&a.level).then_with(|| a.name.cmp(&b.name)));
        Ok(roles)
    }

    async fn create_role(&self, role: NewRole, permission_ids: &[Uuid]) -> Result<Role, AppError> {
        let mut inner = self.inner.write().await;
        inner.insert_role(role, permission_ids.iter().copied().collect())
    }

    async fn update_role(
        &self,
        id: Uuid,
        changes: RoleChanges,
        permission_ids: Option<&[Uuid]>,
    ) -> Result<Role, AppError> {
        let mut inner = self.inner.write().await;
        let current = inner
            .roles
            .get(&id)
            .cloned()
            .ok_or_else(|| AuthzError::NotFound("Role".into()))?;

        if let Some(name) = &changes.name {
            let taken = inner
                .roles
                .values()
                .any(|r| r.id != id && r.business_id == current.business_id && &r.name == name);
            if taken {
                return Err(AppError::RoleNameAlreadyExists(name.clone()));
            }
        }

        if let Some(ids) = permission_ids {
            inner.role_permissions.insert(id, ids.iter().copied().collect());
        }

        let role = inner
            .roles
            .get_mut(&id)
            .ok_or_else(|| AuthzError::NotFound("Role".into()))?;
        if let Some(name) = changes.name {
            role.name = name;
        }
        if let Some(description) = changes.description {
            role.description = Some(description);
        }
        if let Some(level) = changes.level {
            role.level = level;
        }
        if let Some(is_active) = changes.is_active {
            role.is_active = is_active;
        }
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn delete_role(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        inner.role_permissions.remove(&id);
        inner
            .roles
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AuthzError::NotFound("Role".into()).into())
    }
}
