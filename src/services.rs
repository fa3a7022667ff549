pub mod auth;
pub mod catalog;
pub mod permission_cache;
pub mod permission_resolver;
pub mod role_service;
pub mod user_service;
