// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use std::marker::PhantomData;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::UserRole,
};

/// 1. A permission the route requires, by name
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. The guard. Resolves the caller's effective set and checks membership.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // A. Caller
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(ApiError::unauthorized)?;

        // B. Required permission
        let required_perm = T::slug();

        // C. Effective set (cached)
        let resolved = app_state
            .permission_resolver
            .get_user_permissions(user.0.id)
            .await?;

        if !resolved.contains(required_perm) {
            tracing::debug!(user_id = %user.0.id, permission = required_perm, "Permission denied");
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                format!("You need the '{}' permission to perform this action.", required_perm),
            ));
        }

        Ok(RequirePermission(PhantomData))
    }
}

/// Owner-only routes. Checks the account's role, not its permission set.
pub struct RequireOwner;

impl<S> FromRequestParts<S> for RequireOwner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(ApiError::unauthorized)?;

        if user.0.role != UserRole::Owner {
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Only the business owner can perform this action.",
            ));
        }
        Ok(RequireOwner)
    }
}

// ---
// PERMISSION TYPES
// ---

pub struct PermUsersRead;
impl PermissionDef for PermUsersRead {
    fn slug() -> &'static str { "users:read" }
}

pub struct PermUsersCreate;
impl PermissionDef for PermUsersCreate {
    fn slug() -> &'static str { "users:create" }
}

pub struct PermUsersUpdate;
impl PermissionDef for PermUsersUpdate {
    fn slug() -> &'static str { "users:update" }
}

pub struct PermUsersDelete;
impl PermissionDef for PermUsersDelete {
    fn slug() -> &'static str { "users:delete" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::is_known_permission;

    #[test]
    fn every_guarded_permission_is_in_the_catalog() {
        for slug in [
            PermUsersRead::slug(),
            PermUsersCreate::slug(),
            PermUsersUpdate::slug(),
            PermUsersDelete::slug(),
        ] {
            assert!(is_known_permission(slug), "{slug}");
        }
    }
}
