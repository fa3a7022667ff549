// src/middleware/tenancy.rs
//
// Business scoping. The business comes from the authenticated user, never
// from the request, and every check either passes or rejects the whole call.

use uuid::Uuid;

use crate::{common::error::AuthzError, models::auth::User};

/// A caller without a business fails every tenant-scoped check.
pub fn caller_business(caller: &User) -> Result<Uuid, AuthzError> {
    caller
        .business_id
        .ok_or_else(|| AuthzError::Forbidden("No business context for this account.".into()))
}

/// Passes only when the resource belongs to the caller's business.
/// A foreign resource is reported as missing so other tenants stay invisible.
pub fn ensure_same_business(
    caller: &User,
    resource_business_id: Option<Uuid>,
    resource: &str,
) -> Result<(), AuthzError> {
    let business_id = caller_business(caller)?;
    if resource_business_id != Some(business_id) {
        tracing::warn!(
            caller = %caller.id,
            resource,
            "Cross-business access rejected"
        );
        return Err(AuthzError::NotFound(resource.to_string()));
    }
    Ok(())
}

/// Roles can only be handed out strictly below the caller's own level.
pub fn ensure_can_assign_level(caller_level: i32, target_level: i32) -> Result<(), AuthzError> {
    if target_level >= caller_level {
        return Err(AuthzError::validation(
            "level",
            format!(
                "Role level {} must be below your own authority level ({}).",
                target_level, caller_level
            ),
        ));
    }
    Ok(())
}

/// Management endpoints act on other accounts only.
pub fn ensure_not_self(caller: &User, target_id: Uuid, action: &str) -> Result<(), AuthzError> {
    if caller.id == target_id {
        return Err(AuthzError::validation(
            "id",
            format!("You cannot {} your own account.", action),
        ));
    }
    Ok(())
}
