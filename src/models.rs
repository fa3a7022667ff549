pub mod auth;
pub mod business;
pub mod rbac;
pub mod users;
