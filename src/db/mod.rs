// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer.
//!
//! [`Storage`] is the boundary to the authoritative store. Two variants
//! exist: [`PostgresStore`] for production and [`MemoryStore`] as an
//! in-memory double for tests. Both run the identity lifecycle units
//! (`create_and_invite`, `activate`, `delete_user`) all-or-nothing.

pub mod cache;
pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::models::{Comment, FeedItem, FeedQuery, NewPost, NewUser, Post, Role, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Errors from the persistent store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("conflicting record: {0}")]
    Conflict(String),

    #[error("store call timed out")]
    Timeout,

    #[error("store error: {0}")]
    Backend(String),
}

/// Authoritative store for users, invitations, roles, posts and follows.
#[async_trait]
pub trait Storage: Send + Sync {
    // ─── User Lifecycle ─────────────────────────────────────────

    /// Insert an inactive user and its invitation in one transaction.
    ///
    /// Fails with `Conflict` on a duplicate username or email, leaving
    /// neither row behind.
    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expiry: DateTime<Utc>,
    ) -> Result<User, StoreError>;

    /// Activate the user owning a live invitation and consume it, in one
    /// transaction. Returns the activated user's id.
    ///
    /// Unknown, expired and already-consumed hashes all yield `NotFound`.
    async fn activate(&self, token_hash: &str, now: DateTime<Utc>) -> Result<i64, StoreError>;

    /// Delete a user's invitation (if any) and then the user, in one
    /// transaction.
    async fn delete_user(&self, user_id: i64) -> Result<(), StoreError>;

    // ─── User Reads ─────────────────────────────────────────────

    /// Get an active user by id.
    async fn get_user_by_id(&self, user_id: i64) -> Result<User, StoreError>;

    /// Get an active user by email.
    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    // ─── Roles ──────────────────────────────────────────────────

    async fn get_role_by_name(&self, name: &str) -> Result<Role, StoreError>;

    // ─── Follows & Feed ─────────────────────────────────────────

    /// Record `follower_id` following `user_id`; `Conflict` if already following.
    async fn follow(&self, user_id: i64, follower_id: i64) -> Result<(), StoreError>;

    /// Remove a follow; `NotFound` if it did not exist.
    async fn unfollow(&self, user_id: i64, follower_id: i64) -> Result<(), StoreError>;

    /// Posts by the user and by everyone they follow.
    async fn get_user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<FeedItem>, StoreError>;

    // ─── Posts & Comments ───────────────────────────────────────

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;

    async fn get_post(&self, post_id: i64) -> Result<Post, StoreError>;

    /// Write title/content if `post.version` is still current; returns the
    /// post with its bumped version. A stale version yields `NotFound`.
    async fn update_post(&self, post: &Post) -> Result<Post, StoreError>;

    async fn delete_post(&self, post_id: i64) -> Result<(), StoreError>;

    async fn get_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError>;
}
