// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user_by_body,
        handlers::users::update_user,
        handlers::users::deactivate_user,
        handlers::users::set_permission_override,

        // --- RBAC ---
        handlers::permissions::list_permissions,
        handlers::roles::list_roles,
        handlers::roles::get_role,
        handlers::roles::create_role,
        handlers::roles::update_role,
        handlers::roles::delete_role,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::OverrideEffect,
            models::auth::PermissionOverride,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::MeResponse,

            // --- Business ---
            models::business::Plan,
            models::business::Business,

            // --- Users ---
            models::users::CreateUserPayload,
            models::users::UpdateUserPayload,
            models::users::PermissionOverridePayload,

            // --- RBAC ---
            models::rbac::Role,
            models::rbac::Permission,
            models::rbac::CreateRolePayload,
            models::rbac::UpdateRolePayload,
            models::rbac::RoleResponse,
        )
    ),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Auth", description = "Registration, login and the current account"),
        (name = "Users", description = "Staff accounts of the business"),
        (name = "RBAC", description = "Roles, permissions and overrides")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
