// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{BusinessRepository, BusinessStore, RbacRepository, RbacStore, UserRepository, UserStore},
    services::{
        auth::AuthService,
        permission_cache::{InMemoryPermissionCache, PermissionCache},
        permission_resolver::PermissionResolver,
        role_service::RoleService,
        user_service::UserService,
    },
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub permission_cache_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            permission_cache_ttl: Duration::from_secs(parse_var(
                "PERMISSION_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub businesses: Arc<dyn BusinessStore>,
    pub rbac: Arc<dyn RbacStore>,
    pub auth_service: AuthService,
    pub permission_resolver: PermissionResolver,
    pub user_service: UserService,
    pub role_service: RoleService,
}

impl AppState {
    /// Postgres-backed state. Also returns the pool so `main` can run migrations.
    pub async fn new(config: &AppConfig) -> anyhow::Result<(Self, PgPool)> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Could not connect to the database")?;

        tracing::info!("Database connection established");

        // --- Dependency graph ---
        let user_repo = UserRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let business_repo = BusinessRepository::new(db_pool.clone(), user_repo.clone(), rbac_repo.clone());

        let state = Self::from_parts(
            Arc::new(user_repo),
            Arc::new(business_repo),
            Arc::new(rbac_repo),
            Arc::new(InMemoryPermissionCache::new(config.permission_cache_ttl)),
            config.jwt_secret.clone(),
            config.bcrypt_cost,
        );

        Ok((state, db_pool))
    }

    /// Wires the services over any set of stores and any cache.
    pub fn from_parts(
        users: Arc<dyn UserStore>,
        businesses: Arc<dyn BusinessStore>,
        rbac: Arc<dyn RbacStore>,
        cache: Arc<dyn PermissionCache>,
        jwt_secret: String,
        bcrypt_cost: u32,
    ) -> Self {
        let auth_service = AuthService::new(users.clone(), businesses.clone(), jwt_secret, bcrypt_cost);
        let permission_resolver = PermissionResolver::new(users.clone(), rbac.clone(), cache);
        let user_service = UserService::new(
            users.clone(),
            rbac.clone(),
            permission_resolver.clone(),
            auth_service.clone(),
        );
        let role_service = RoleService::new(rbac.clone(), users, permission_resolver.clone());

        Self {
            businesses,
            rbac,
            auth_service,
            permission_resolver,
            user_service,
            role_service,
        }
    }
}
