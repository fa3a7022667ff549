// src/models/rbac.rs

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Roles table. System roles are seeded per business at registration.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(ignore)]
    pub business_id: Uuid,

    #[schema(example = "SHIFT_LEAD")]
    pub name: String,

    #[schema(example = "Runs the counter during a shift")]
    pub description: Option<String>,

    /// Higher means more authority. OWNER sits at the top.
    #[schema(example = 30)]
    pub level: i32,

    pub is_system: bool,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Permissions table (reference data)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: Uuid,

    #[schema(example = "users:read")]
    pub name: String,

    #[schema(example = "users")]
    pub category: String,

    #[schema(example = "read")]
    pub action: String,

    #[schema(example = "users")]
    pub resource: String,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRolePayload {
    #[validate(length(min = 1, max = 50, message = "Role name must have between 1 and 50 characters."))]
    #[schema(example = "SHIFT_LEAD")]
    pub name: String,

    pub description: Option<String>,

    #[validate(range(min = 1, message = "Role level must be positive."))]
    #[schema(example = 30)]
    pub level: i32,

    #[serde(default)]
    #[schema(example = json!(["orders:read", "orders:update"]))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRolePayload {
    #[validate(length(min = 1, max = 50, message = "Role name must have between 1 and 50 characters."))]
    pub name: Option<String>,

    pub description: Option<String>,

    #[validate(range(min = 1, message = "Role level must be positive."))]
    pub level: Option<i32>,

    pub is_active: Option<bool>,

    /// Replaces the whole permission list when present.
    pub permissions: Option<Vec<String>>,
}

impl UpdateRolePayload {
    /// True when the payload touches a field system roles keep fixed.
    pub fn touches_core_fields(&self) -> bool {
        self.name.is_some() || self.level.is_some() || self.permissions.is_some()
    }
}

// Role plus its permission names
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    #[serde(flatten)]
    pub role: Role,

    #[schema(example = json!(["orders:read", "orders:update"]))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewRole {
    pub business_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub level: i32,
    pub is_system: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub level: Option<i32>,
    pub is_active: Option<bool>,
}

/// Computed permission set of a user. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePermissions {
    pub role_name: Option<String>,
    pub role_level: Option<i32>,
    pub permissions: BTreeSet<String>,
}

impl EffectivePermissions {
    pub fn contains(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}
