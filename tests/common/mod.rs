#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use laundry_backend::{
    config::AppState,
    db::MemoryStore,
    models::{business::Plan, rbac::EffectivePermissions},
    routes::build_router,
    services::{
        catalog::sync_catalog,
        permission_cache::{InMemoryPermissionCache, PermissionCache},
    },
};

pub const JWT_SECRET: &str = "integration-secret";
pub const PASSWORD: &str = "correct-horse";
// Lowest cost bcrypt accepts
pub const BCRYPT_COST: u32 = 4;

/// Cache that records how often the resolver looked it up.
pub struct RecordingCache {
    inner: InMemoryPermissionCache,
    pub gets: AtomicUsize,
}

impl RecordingCache {
    pub fn lookups(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl PermissionCache for RecordingCache {
    fn get(&self, user_id: Uuid) -> Option<EffectivePermissions> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(user_id)
    }
    fn set(&self, user_id: Uuid, permissions: EffectivePermissions) {
        self.inner.set(user_id, permissions)
    }
    fn delete(&self, user_id: Uuid) {
        self.inner.delete(user_id)
    }
}

pub struct TestServer {
    pub router: Router,
    pub store: MemoryStore,
    pub cache: Arc<RecordingCache>,
}

/// A signed-in account: token plus the ids tests need.
pub struct Account {
    pub token: String,
    pub id: Uuid,
    pub business_id: Uuid,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let store = MemoryStore::new();
        sync_catalog(&store).await?;

        let cache = Arc::new(RecordingCache {
            inner: InMemoryPermissionCache::new(Duration::from_secs(300)),
            gets: AtomicUsize::new(0),
        });

        let state = AppState::from_parts(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            cache.clone(),
            JWT_SECRET.to_string(),
            BCRYPT_COST,
        );

        Ok(Self {
            router: build_router(state),
            store,
            cache,
        })
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok((status, value))
    }

    /// Registers a new business and returns its owner, signed in.
    pub async fn register(&self, business_name: &str) -> Result<Account> {
        let email = format!("owner-{}@example.com", Uuid::new_v4());
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "businessName": business_name,
                    "businessType": "DRY_CLEANING",
                    "name": "Owner",
                    "email": email,
                    "password": PASSWORD,
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "register failed: {status} {body}");
        let token = body["token"].as_str().context("token missing")?.to_string();
        self.account(token).await
    }

    /// Owner creates a staff account, which then logs in.
    pub async fn add_staff(&self, owner: &Account, role: &str) -> Result<Account> {
        let email = format!("{}-{}@example.com", role.to_lowercase(), Uuid::new_v4());
        let (status, body) = self
            .send(
                Method::POST,
                "/api/users",
                Some(&owner.token),
                Some(json!({
                    "email": email,
                    "password": PASSWORD,
                    "name": role,
                    "role": role,
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create user failed: {status} {body}");

        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {status} {body}");
        let token = body["token"].as_str().context("token missing")?.to_string();
        self.account(token).await
    }

    pub async fn set_plan(&self, account: &Account, plan: Plan) {
        self.store.set_business_plan(account.business_id, plan).await;
    }

    async fn account(&self, token: String) -> Result<Account> {
        let (status, me) = self.send(Method::GET, "/api/auth/me", Some(&token), None).await?;
        anyhow::ensure!(status == StatusCode::OK, "me failed: {status} {me}");
        Ok(Account {
            id: me["user"]["id"].as_str().context("id")?.parse()?,
            business_id: me["user"]["businessId"].as_str().context("businessId")?.parse()?,
            token,
        })
    }
}
