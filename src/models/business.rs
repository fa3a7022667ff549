// src/models/business.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Subscription plan. Ordered: a higher plan includes every lower one.
/// New businesses open on PRO; billing moves lapsed ones down to FREE.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "business_plan", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Free,
    Pro,
}

// The tenant boundary. Everything else hangs off a business.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: Uuid,

    #[schema(example = "Beyaz Kuru Temizleme")]
    pub name: String,

    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,

    #[schema(example = "DRY_CLEANING")]
    pub business_type: Option<String>,

    pub plan: Plan,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to open a new business at registration.
#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub name: String,
    pub email: Option<String>,
    pub business_type: Option<String>,
}
