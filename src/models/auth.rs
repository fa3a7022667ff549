// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Legacy role enum (Postgres type `user_role`)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Owner,
    Manager,
    Employee,
    Driver,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Owner,
        UserRole::Manager,
        UserRole::Employee,
        UserRole::Driver,
    ];

    /// Name of the system role row this enum value maps to.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "OWNER",
            UserRole::Manager => "MANAGER",
            UserRole::Employee => "EMPLOYEE",
            UserRole::Driver => "DRIVER",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

// ---
// 2. Per-user permission overrides (stored as JSONB in `users.custom_permissions`)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OverrideEffect {
    Grant,
    Revoke,
}

impl OverrideEffect {
    pub fn as_str(self) -> &'static str {
        match self {
            OverrideEffect::Grant => "grant",
            OverrideEffect::Revoke => "revoke",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionOverride {
    #[schema(example = "users:read")]
    pub permission: String,
    pub effect: OverrideEffect,
}

// Represents a user row
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    #[schema(example = "ayse@kuru-temizleme.com")]
    pub email: String,

    pub name: Option<String>,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub role: UserRole,

    /// Fine-grained role. When absent the legacy `role` decides.
    pub role_id: Option<Uuid>,

    pub business_id: Option<Uuid>,

    pub is_active: bool,

    #[sqlx(json)]
    pub custom_permissions: Vec<PermissionOverride>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Register payload: creates the business and its owner in one go
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, message = "Business name is required."))]
    #[schema(example = "Beyaz Kuru Temizleme")]
    pub business_name: String,

    #[schema(example = "DRY_CLEANING")]
    pub business_type: Option<String>,

    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,

    #[validate(email(message = "Invalid e-mail address."))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "Invalid e-mail address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

/// `GET /api/auth/me`: the caller plus the permission set the gates evaluate.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: User,
    pub role_name: Option<String>,
    pub role_level: Option<i32>,
    #[schema(example = json!(["users:read", "orders:read"]))]
    pub permissions: Vec<String>,
}

// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user id
    pub email: String,
    pub business_id: Option<Uuid>,
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}
