// src/services/permission_cache.rs

use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::rbac::EffectivePermissions;

/// Key/value store for resolved permission sets, keyed by user id.
///
/// Invalidation is delete-on-write: any mutation of a user's role or overrides
/// deletes the entry and the next lookup recomputes it.
pub trait PermissionCache: Send + Sync {
    fn get(&self, user_id: Uuid) -> Option<EffectivePermissions>;
    fn set(&self, user_id: Uuid, permissions: EffectivePermissions);
    fn delete(&self, user_id: Uuid);
}

#[derive(Clone)]
struct CachedEntry {
    permissions: EffectivePermissions,
    cached_at: Instant,
}

/// Process-local cache with a time-to-live per entry.
pub struct InMemoryPermissionCache {
    entries: DashMap<Uuid, CachedEntry>,
    ttl: Duration,
}

impl InMemoryPermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PermissionCache for InMemoryPermissionCache {
    fn get(&self, user_id: Uuid) -> Option<EffectivePermissions> {
        let entry = self.entries.get(&user_id)?;
        if entry.cached_at.elapsed() > self.ttl {
            // release the shard lock before removing
            drop(entry);
            self.entries.remove(&user_id);
            return None;
        }
        Some(entry.permissions.clone())
    }

    fn set(&self, user_id: Uuid, permissions: EffectivePermissions) {
        self.entries.insert(
            user_id,
            CachedEntry {
                permissions,
                cached_at: Instant::now(),
            },
        );
    }

    fn delete(&self, user_id: Uuid) {
        self.entries.remove(&user_id);
    }
}
