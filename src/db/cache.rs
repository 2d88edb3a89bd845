// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity cache backends.
//!
//! Entries are JSON snapshots of [`User`] stored under `user-<id>` with a
//! fixed time-to-live. [`RedisUserCache`] is the shared production cache;
//! [`MemoryUserCache`] is a process-local double used by tests.

use crate::models::User;
use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Errors from a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache call timed out")]
    Timeout,

    #[error("cache entry could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        CacheError::Unavailable(err.to_string())
    }
}

/// Cache key for a user snapshot.
pub fn user_key(user_id: i64) -> String {
    format!("user-{}", user_id)
}

/// Key-value cache of user snapshots.
#[async_trait]
pub trait UserCache: Send + Sync {
    /// Fetch a snapshot; `Ok(None)` on a miss or expired entry.
    async fn get(&self, user_id: i64) -> Result<Option<User>, CacheError>;

    /// Store a snapshot under the user's key with the cache TTL.
    async fn set(&self, user: &User) -> Result<(), CacheError>;

    /// Remove the user's entry. Removing an absent key is not an error.
    async fn delete(&self, user_id: i64) -> Result<(), CacheError>;
}

// ─── Redis ──────────────────────────────────────────────────────────────────

/// Redis-backed user cache.
#[derive(Clone)]
pub struct RedisUserCache {
    pool: Pool,
    ttl: Duration,
    timeout: Duration,
}

impl RedisUserCache {
    pub fn new(pool: Pool, ttl: Duration, timeout: Duration) -> Self {
        Self { pool, ttl, timeout }
    }

    async fn deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| CacheError::Timeout)?
    }
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, user_id: i64) -> Result<Option<User>, CacheError> {
        let key = user_key(user_id);
        self.deadline(async {
            let mut conn = self.pool.get().await?;
            let data: Option<Vec<u8>> = conn.get(&key).await?;
            match data {
                Some(bytes) => {
                    tracing::debug!(key = %key, "cache hit");
                    Ok(Some(serde_json::from_slice(&bytes)?))
                }
                None => {
                    tracing::debug!(key = %key, "cache miss");
                    Ok(None)
                }
            }
        })
        .await
    }

    async fn set(&self, user: &User) -> Result<(), CacheError> {
        let key = user_key(user.id);
        let data = serde_json::to_vec(user)?;
        let ttl_secs = self.ttl.as_secs().max(1);
        self.deadline(async {
            let mut conn = self.pool.get().await?;
            conn.set_ex::<_, _, ()>(&key, data, ttl_secs).await?;
            tracing::debug!(key = %key, ttl_secs, "cache set");
            Ok(())
        })
        .await
    }

    async fn delete(&self, user_id: i64) -> Result<(), CacheError> {
        let key = user_key(user_id);
        self.deadline(async {
            let mut conn = self.pool.get().await?;
            conn.del::<_, ()>(&key).await?;
            tracing::debug!(key = %key, "cache entry removed");
            Ok(())
        })
        .await
    }
}

// ─── In-memory ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct CachedEntry {
    data: Arc<Vec<u8>>,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// Process-local user cache with the same TTL semantics as Redis.
///
/// Can be switched into an "unavailable" mode where every call fails, to
/// exercise the fallback paths of the identity resolver.
pub struct MemoryUserCache {
    entries: DashMap<String, CachedEntry>,
    ttl: Duration,
    unavailable: AtomicBool,
}

impl MemoryUserCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `Unavailable` (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Whether a live entry exists for the user.
    pub fn contains(&self, user_id: i64) -> bool {
        self.entries
            .get(&user_key(user_id))
            .is_some_and(|entry| !entry.is_expired())
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("memory cache disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserCache for MemoryUserCache {
    async fn get(&self, user_id: i64) -> Result<Option<User>, CacheError> {
        self.check_available()?;
        let key = user_key(user_id);

        let data = match self.entries.get(&key) {
            Some(entry) if !entry.is_expired() => Arc::clone(&entry.data),
            Some(entry) => {
                drop(entry);
                self.entries.remove(&key);
                return Ok(None);
            }
            None => return Ok(None),
        };

        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn set(&self, user: &User) -> Result<(), CacheError> {
        self.check_available()?;
        let data = serde_json::to_vec(user)?;
        self.entries
            .insert(user_key(user.id), CachedEntry::new(data, self.ttl));
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> Result<(), CacheError> {
        self.check_available()?;
        self.entries.remove(&user_key(user_id));
        Ok(())
    }
}
