// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cache-aside identity resolution.
//!
//! Reads check the cache first and fall back to the store on a miss,
//! populating the cache with the fresh snapshot. A cache hit never touches
//! the store. Mutations call [`IdentityResolver::invalidate`] before
//! reporting success so the next read cannot see pre-mutation data.
//!
//! A miss that read the store before a concurrent invalidation must not
//! leave its older snapshot behind. Every invalidation bumps a generation
//! counter; a populating read that sees the counter move drops the entry it
//! just wrote. This holds within one process only.

use crate::db::cache::UserCache;
use crate::db::{Storage, StoreError};
use crate::error::{AppError, Result};
use crate::models::User;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Resolves user ids to active users through an optional cache.
///
/// With no cache configured every read goes straight to the store.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn Storage>,
    cache: Option<Arc<dyn UserCache>>,
    generation: Arc<AtomicU64>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Storage>, cache: Option<Arc<dyn UserCache>>) -> Self {
        Self {
            store,
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Resolve an active user by id.
    ///
    /// A failing cache read is logged and treated as a miss; a failing
    /// cache write is logged and the store value is still returned.
    pub async fn get(&self, user_id: i64) -> Result<User> {
        let Some(cache) = &self.cache else {
            return self.load_from_store(user_id).await;
        };

        match cache.get(user_id).await {
            Ok(Some(user)) => return Ok(user),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Identity cache read failed, using store");
            }
        }

        let generation = self.generation.load(Ordering::Acquire);
        let user = self.load_from_store(user_id).await?;

        if let Err(e) = cache.set(&user).await {
            tracing::warn!(user_id, error = %e, "Failed to populate identity cache");
        } else if self.generation.load(Ordering::Acquire) != generation {
            if let Err(e) = cache.delete(user_id).await {
                tracing::warn!(user_id, error = %e, "Failed to drop raced identity cache entry");
            }
        }

        Ok(user)
    }

    /// Drop the cached snapshot for `user_id`.
    pub async fn invalidate(&self, user_id: i64) -> Result<()> {
        if let Some(cache) = &self.cache {
            self.generation.fetch_add(1, Ordering::AcqRel);
            cache.delete(user_id).await?;
            tracing::debug!(user_id, "Identity cache entry invalidated");
        }
        Ok(())
    }

    async fn load_from_store(&self, user_id: i64) -> Result<User> {
        self.store.get_user_by_id(user_id).await.map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound(format!("user {}", user_id)),
            other => other.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cache::{CacheError, MemoryUserCache};
    use crate::db::MemoryStore;
    use crate::models::{role, Password};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use std::sync::OnceLock;
    use std::time::Duration;

    async fn setup() -> (Arc<MemoryStore>, Arc<MemoryUserCache>, IdentityResolver, User) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryUserCache::new(Duration::from_secs(60)));
        let resolver = IdentityResolver::new(store.clone(), Some(cache.clone()));
        let user = store
            .insert_active_user("alice", "alice@x.com", Password::from_hash("h"), role::USER)
            .await
            .unwrap();
        (store, cache, resolver, user)
    }

    #[tokio::test]
    async fn test_miss_reads_store_and_populates() {
        let (store, cache, resolver, user) = setup().await;

        assert_eq!(resolver.get(user.id).await.unwrap(), user);
        assert_eq!(store.user_reads(), 1);
        assert!(cache.contains(user.id));
    }

    #[tokio::test]
    async fn test_hit_skips_store() {
        let (store, _cache, resolver, user) = setup().await;

        resolver.get(user.id).await.unwrap();
        resolver.get(user.id).await.unwrap();
        resolver.get(user.id).await.unwrap();

        assert_eq!(store.user_reads(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reread() {
        let (store, cache, resolver, user) = setup().await;

        resolver.get(user.id).await.unwrap();
        store.set_user_role(user.id, role::ADMIN).await.unwrap();

        // Still the cached snapshot
        assert_eq!(resolver.get(user.id).await.unwrap().role_level, 1);

        resolver.invalidate(user.id).await.unwrap();
        assert!(!cache.contains(user.id));
        assert_eq!(resolver.get(user.id).await.unwrap().role_level, 3);
        assert_eq!(store.user_reads(), 2);
    }

    #[tokio::test]
    async fn test_cache_unavailable_falls_back_to_store() {
        let (store, cache, resolver, user) = setup().await;
        cache.set_unavailable(true);

        assert_eq!(resolver.get(user.id).await.unwrap(), user);
        assert_eq!(resolver.get(user.id).await.unwrap(), user);
        assert_eq!(store.user_reads(), 2);

        // Invalidation errors are not swallowed
        assert!(resolver.invalidate(user.id).await.is_err());
    }

    #[tokio::test]
    async fn test_disabled_cache_always_reads_store() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_active_user("bob", "bob@x.com", Password::from_hash("h"), role::USER)
            .await
            .unwrap();
        let resolver = IdentityResolver::new(store.clone(), None);

        resolver.get(user.id).await.unwrap();
        resolver.get(user.id).await.unwrap();

        assert!(!resolver.caching_enabled());
        assert_eq!(store.user_reads(), 2);
        assert!(resolver.invalidate(user.id).await.is_ok());
    }

    /// Cache whose first `set` runs a role change and invalidation before
    /// storing the (now stale) snapshot.
    struct InterleavedCache {
        inner: MemoryUserCache,
        store: Arc<MemoryStore>,
        resolver: OnceLock<IdentityResolver>,
        raced: AtomicBool,
    }

    #[async_trait]
    impl UserCache for InterleavedCache {
        async fn get(&self, user_id: i64) -> std::result::Result<Option<User>, CacheError> {
            self.inner.get(user_id).await
        }

        async fn set(&self, user: &User) -> std::result::Result<(), CacheError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.store.set_user_role(user.id, role::ADMIN).await.unwrap();
                let resolver = self.resolver.get().unwrap();
                resolver.invalidate(user.id).await.unwrap();
            }
            self.inner.set(user).await
        }

        async fn delete(&self, user_id: i64) -> std::result::Result<(), CacheError> {
            self.inner.delete(user_id).await
        }
    }

    #[tokio::test]
    async fn test_invalidation_during_miss_drops_stale_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_active_user("carol", "carol@x.com", Password::from_hash("h"), role::USER)
            .await
            .unwrap();
        let cache = Arc::new(InterleavedCache {
            inner: MemoryUserCache::new(Duration::from_secs(60)),
            store: store.clone(),
            resolver: OnceLock::new(),
            raced: AtomicBool::new(false),
        });
        let resolver = IdentityResolver::new(store.clone(), Some(cache.clone()));
        assert!(cache.resolver.set(resolver.clone()).is_ok());

        // This read saw the old role; it must not stay cached
        assert_eq!(resolver.get(user.id).await.unwrap().role_level, 1);
        assert!(!cache.inner.contains(user.id));

        assert_eq!(resolver.get(user.id).await.unwrap().role_level, 3);
        assert!(cache.inner.contains(user.id));
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (_store, _cache, resolver, _user) = setup().await;
        assert!(matches!(
            resolver.get(999).await,
            Err(AppError::NotFound(_))
        ));
    }
}
