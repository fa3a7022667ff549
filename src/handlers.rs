pub mod auth;
pub mod permissions;
pub mod roles;
pub mod users;

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "OK"
}
