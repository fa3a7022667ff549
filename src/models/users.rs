// src/models/users.rs

use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::{OverrideEffect, UserRole};

// POST /api/users
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(email(message = "Invalid e-mail address."))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,

    pub name: Option<String>,

    #[schema(example = "EMPLOYEE")]
    pub role: Option<UserRole>,

    pub role_id: Option<Uuid>,
}

// PUT /api/users (id in body) and PUT /api/users/{id}
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    /// Only read by `PUT /api/users`; the path wins on `PUT /api/users/{id}`.
    pub id: Option<Uuid>,

    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,

    pub role: Option<UserRole>,

    pub role_id: Option<Uuid>,

    pub is_active: Option<bool>,
}

impl UpdateUserPayload {
    pub fn changes_role(&self) -> bool {
        self.role.is_some() || self.role_id.is_some()
    }
}

// POST /api/users/{id}/permissions
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PermissionOverridePayload {
    #[validate(length(min = 1, message = "Permission name is required."))]
    #[schema(example = "users:read")]
    pub permission: String,

    pub action: OverrideEffect,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub role_id: Option<Uuid>,
    pub business_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub role_id: Option<Uuid>,
    pub is_active: Option<bool>,
}
