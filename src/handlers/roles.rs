// src/handlers/roles.rs
//
// Owner-only. Creating a custom role also needs a plan that includes them;
// the feature gate comes first so a FREE business is told to upgrade.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        entitlement::{FeatureCustomRoles, RequireFeature},
        rbac::RequireOwner,
    },
    models::rbac::{CreateRolePayload, RoleResponse, UpdateRolePayload},
};

// GET /api/roles
#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "RBAC",
    responses(
        (status = 200, description = "Roles of the caller's business", body = Vec<RoleResponse>),
        (status = 403, description = "Owner only")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_roles(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _owner: RequireOwner,
) -> Result<Json<Vec<RoleResponse>>, ApiError> {
    let roles = app_state.role_service.list_roles(&caller).await?;
    Ok(Json(roles))
}

// GET /api/roles/{id}
#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Not found in this business")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_role(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _owner: RequireOwner,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleResponse>, ApiError> {
    let role = app_state.role_service.get_role(&caller, id).await?;
    Ok(Json(role))
}

// POST /api/roles
#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "RBAC",
    request_body = CreateRolePayload,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Invalid name, level or permissions"),
        (status = 403, description = "Owner only, or plan upgrade required"),
        (status = 409, description = "Role name already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _feature: RequireFeature<FeatureCustomRoles>,
    _owner: RequireOwner,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let role = app_state.role_service.create_role(&caller, payload).await?;

    Ok((StatusCode::CREATED, Json(role)))
}

// PUT /api/roles/{id}
#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "Role id")),
    request_body = UpdateRolePayload,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 400, description = "Invalid change (system roles keep name, level and permissions)"),
        (status = 403, description = "Owner only"),
        (status = 404, description = "Not found in this business")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_role(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _owner: RequireOwner,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRolePayload>,
) -> Result<Json<RoleResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let role = app_state.role_service.update_role(&caller, id, payload).await?;
    Ok(Json(role))
}

// DELETE /api/roles/{id}
#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    tag = "RBAC",
    params(("id" = Uuid, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 400, description = "System role, or still assigned"),
        (status = 404, description = "Not found in this business")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_role(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _owner: RequireOwner,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    app_state.role_service.delete_role(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
