pub mod auth;
pub mod entitlement;
pub mod rbac;
pub mod tenancy;
