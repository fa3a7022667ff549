// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Outcome of a failed tenant-scope, authority or self-protection check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// Missing, or owned by another business. Both look the same to the caller.
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },
}

impl AuthzError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AuthzError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("E-mail already in use")]
    EmailAlreadyExists,

    #[error("Role name already in use: {0}")]
    RoleNameAlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Account is inactive")]
    InactiveAccount,

    #[error("Plan upgrade required for {0}")]
    PlanUpgradeRequired(&'static str),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// The error body every handler answers with.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, error: impl Into<String>) -> Self {
        Self {
            status,
            code,
            error: error.into(),
            details: None,
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Missing or invalid authentication token.",
        )
    }
}

impl AppError {
    pub fn to_api_error(&self) -> ApiError {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    code: "VALIDATION_ERROR",
                    error: "One or more fields are invalid.".into(),
                    details: Some(Value::Object(details)),
                }
            }
            AppError::Authz(AuthzError::Validation { field, reason }) => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "VALIDATION_ERROR",
                error: reason.clone(),
                details: Some(json!({ field.as_str(): [reason] })),
            },
            AppError::Authz(AuthzError::NotFound(what)) => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found.", what))
            }
            AppError::Authz(AuthzError::Forbidden(reason)) => {
                ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", reason.clone())
            }
            AppError::PlanUpgradeRequired(feature) => ApiError::new(
                StatusCode::FORBIDDEN,
                "PLAN_UPGRADE_REQUIRED",
                format!("Your current plan does not include {}.", feature),
            ),
            AppError::EmailAlreadyExists => {
                ApiError::new(StatusCode::CONFLICT, "EMAIL_EXISTS", "This e-mail is already in use.")
            }
            AppError::RoleNameAlreadyExists(name) => ApiError::new(
                StatusCode::CONFLICT,
                "ROLE_EXISTS",
                format!("A role named '{}' already exists.", name),
            ),
            AppError::InvalidCredentials => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid e-mail or password.",
            ),
            AppError::InvalidToken | AppError::InactiveAccount => ApiError::unauthorized(),

            // Everything else is logged and hidden behind a generic 500.
            e => {
                tracing::error!("Internal server error: {}", e);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred.",
                )
            }
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error()
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        AppError::Authz(err).to_api_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "code": self.code,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}
