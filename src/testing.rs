// src/testing.rs
//
// Fixtures for unit tests: a fully wired state over the in-memory store.

use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    config::AppState,
    db::{BusinessStore, MemoryStore, UserStore},
    models::{
        auth::{User, UserRole},
        business::{Business, NewBusiness},
        users::NewUser,
    },
    services::{
        catalog::{sync_catalog, SYSTEM_ROLES},
        permission_cache::InMemoryPermissionCache,
    },
};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const PASSWORD: &str = "correct-horse";
// Lowest cost bcrypt accepts
pub const BCRYPT_COST: u32 = 4;

pub struct TestBusiness {
    pub business: Business,
    pub owner: User,
}

pub struct TestApp {
    pub state: AppState,
    pub store: MemoryStore,
    pub business: Business,
    pub owner: User,
}

fn password_hash() -> String {
    bcrypt::hash(PASSWORD, BCRYPT_COST).unwrap()
}

async fn open_business(store: &MemoryStore, name: &str) -> TestBusiness {
    let (business, owner) = store
        .create_with_owner(
            NewBusiness {
                name: name.to_string(),
                email: None,
                business_type: Some("DRY_CLEANING".into()),
            },
            NewUser {
                email: format!("owner-{}@example.com", Uuid::new_v4()),
                name: Some("Owner".into()),
                password_hash: password_hash(),
                role: UserRole::Owner,
                role_id: None,
                business_id: Uuid::nil(),
            },
            SYSTEM_ROLES,
        )
        .await
        .unwrap();
    TestBusiness { business, owner }
}

impl TestApp {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        sync_catalog(&store).await.unwrap();

        let state = AppState::from_parts(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(InMemoryPermissionCache::new(Duration::from_secs(300))),
            JWT_SECRET.to_string(),
            BCRYPT_COST,
        );

        let TestBusiness { business, owner } = open_business(&store, "Beyaz Kuru Temizleme").await;

        Self { state, store, business, owner }
    }

    /// Staff account on the legacy enum only (no `role_id`).
    pub async fn add_user(&self, role: UserRole) -> User {
        UserStore::create_user(
            &self.store,
            NewUser {
                email: format!("{}-{}@example.com", role.as_str().to_lowercase(), Uuid::new_v4()),
                name: Some(role.as_str().to_string()),
                password_hash: password_hash(),
                role,
                role_id: None,
                business_id: self.business.id,
            },
        )
        .await
        .unwrap()
    }

    pub async fn other_business(&self) -> TestBusiness {
        open_business(&self.store, "Rakip Kuru Temizleme").await
    }
}
