// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError, AuthzError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{
            PermUsersCreate, PermUsersDelete, PermUsersRead, PermUsersUpdate, RequireOwner,
            RequirePermission,
        },
    },
    models::{
        auth::User,
        rbac::EffectivePermissions,
        users::{CreateUserPayload, PermissionOverridePayload, UpdateUserPayload},
    },
};

// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    responses(
        (status = 200, description = "Users of the caller's business", body = Vec<User>),
        (status = 403, description = "Missing users:read")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequirePermission<PermUsersRead>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = app_state.user_service.list_users(&caller).await?;
    Ok(Json(users))
}

// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "Not found in this business")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequirePermission<PermUsersRead>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = app_state.user_service.get_user(&caller, id).await?;
    Ok(Json(user))
}

// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid payload or role level"),
        (status = 403, description = "Role elevation not allowed"),
        (status = 409, description = "E-mail already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequirePermission<PermUsersCreate>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let user = app_state.user_service.create_user(&caller, payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

// PUT /api/users (id in body)
#[utoipa::path(
    put,
    path = "/api/users",
    tag = "Users",
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Missing id or invalid change"),
        (status = 404, description = "Not found in this business")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user_by_body(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequirePermission<PermUsersUpdate>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<User>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let id = payload
        .id
        .ok_or_else(|| AuthzError::validation("id", "User id is required."))?;

    let user = app_state.user_service.update_user(&caller, id, payload).await?;
    Ok(Json(user))
}

// PUT /api/users/{id}
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserPayload,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 404, description = "Not found in this business")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequirePermission<PermUsersUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<User>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let user = app_state.user_service.update_user(&caller, id, payload).await?;
    Ok(Json(user))
}

// DELETE /api/users/{id} (soft)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated", body = User),
        (status = 400, description = "Cannot deactivate yourself"),
        (status = 404, description = "Not found in this business")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _guard: RequirePermission<PermUsersDelete>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = app_state.user_service.deactivate_user(&caller, id).await?;
    Ok(Json(user))
}

// POST /api/users/{id}/permissions
#[utoipa::path(
    post,
    path = "/api/users/{id}/permissions",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = PermissionOverridePayload,
    responses(
        (status = 200, description = "Override recorded, new effective set returned"),
        (status = 400, description = "Unknown permission"),
        (status = 403, description = "Owner only")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_permission_override(
    State(app_state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    _owner: RequireOwner,
    Path(id): Path<Uuid>,
    Json(payload): Json<PermissionOverridePayload>,
) -> Result<Json<EffectivePermissions>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let resolved = app_state
        .user_service
        .set_permission_override(&caller, id, &payload.permission, payload.action)
        .await?;

    Ok(Json(resolved))
}
