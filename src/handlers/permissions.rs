// src/handlers/permissions.rs

use axum::{extract::State, Json};

use crate::{common::error::ApiError, config::AppState, models::rbac::Permission};

// GET /api/permissions (the catalog the role editor picks from)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    responses(
        (status = 200, description = "Permission catalog", body = Vec<Permission>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_permissions(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Permission>>, ApiError> {
    let permissions = app_state.rbac.list_permissions().await?;
    Ok(Json(permissions))
}
