// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store used by tests and local development.
//!
//! All tables live behind a single async mutex, so every operation
//! (including the multi-row lifecycle units) is applied all-or-nothing and
//! is linearized with respect to every other operation.

use super::{Storage, StoreError};
use crate::models::role::{self, default_roles};
use crate::models::{
    Comment, FeedItem, FeedQuery, Invitation, NewPost, NewUser, Password, Post, Role, SortOrder,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    invitations: Vec<Invitation>,
    roles: Vec<Role>,
    posts: BTreeMap<i64, Post>,
    comments: Vec<Comment>,
    /// (user_id, follower_id)
    followers: BTreeSet<(i64, i64)>,
    next_user_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
}

impl Tables {
    fn role(&self, name: &str) -> Result<&Role, StoreError> {
        self.roles
            .iter()
            .find(|r| r.name == name)
            .ok_or(StoreError::NotFound)
    }

    fn active_user(&self, user_id: i64) -> Option<&User> {
        self.users.get(&user_id).filter(|u| u.is_active)
    }
}

/// In-memory implementation of [`Storage`].
pub struct MemoryStore {
    tables: Mutex<Tables>,
    user_reads: AtomicUsize,
    fail_invitation_insert: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store seeded with the default roles.
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                roles: default_roles(),
                next_user_id: 1,
                next_post_id: 1,
                next_comment_id: 1,
                ..Default::default()
            }),
            user_reads: AtomicUsize::new(0),
            fail_invitation_insert: AtomicBool::new(false),
        }
    }

    // ─── Test Helpers ───────────────────────────────────────────

    /// Insert an already-active user with the given role.
    pub async fn insert_active_user(
        &self,
        username: &str,
        email: &str,
        password: Password,
        role_name: &str,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        let role = tables.role(role_name)?.clone();
        let id = tables.next_user_id;
        tables.next_user_id += 1;

        let user = User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password,
            created_at: Utc::now(),
            is_active: true,
            role_id: role.id,
            role_level: role.level,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    /// Look up a user regardless of activation state.
    pub async fn find_user(&self, user_id: i64) -> Option<User> {
        self.tables.lock().await.users.get(&user_id).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    pub async fn invitations_for(&self, user_id: i64) -> Vec<Invitation> {
        self.tables
            .lock()
            .await
            .invitations
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn invitation_count(&self) -> usize {
        self.tables.lock().await.invitations.len()
    }

    /// Move every invitation of `user_id` into the past.
    pub async fn expire_invitations_for(&self, user_id: i64) {
        let past = Utc::now() - chrono::Duration::seconds(1);
        for invitation in self.tables.lock().await.invitations.iter_mut() {
            if invitation.user_id == user_id {
                invitation.expiry = past;
            }
        }
    }

    /// Directly change a user's role, bypassing any cache.
    pub async fn set_user_role(&self, user_id: i64, role_name: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let role = tables.role(role_name)?.clone();
        let user = tables.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.role_id = role.id;
        user.role_level = role.level;
        Ok(())
    }

    pub async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Comment, StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.posts.contains_key(&post_id) {
            return Err(StoreError::NotFound);
        }
        let username = tables
            .users
            .get(&user_id)
            .map(|u| u.username.clone())
            .ok_or(StoreError::NotFound)?;

        let comment = Comment {
            id: tables.next_comment_id,
            post_id,
            user_id,
            username,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.next_comment_id += 1;
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    /// Number of `get_user_by_id` calls served so far.
    pub fn user_reads(&self) -> usize {
        self.user_reads.load(Ordering::SeqCst)
    }

    /// Make the invitation step of `create_and_invite` fail.
    pub fn fail_invitation_insert(&self, fail: bool) {
        self.fail_invitation_insert.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn create_and_invite(
        &self,
        user: NewUser,
        token_hash: &str,
        expiry: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username already taken".to_string()));
        }

        let role = tables.role(role::USER)?.clone();
        let created = User {
            id: tables.next_user_id,
            username: user.username,
            email: user.email,
            password: user.password,
            created_at: Utc::now(),
            is_active: false,
            role_id: role.id,
            role_level: role.level,
        };
        let invitation = Invitation {
            token_hash: token_hash.to_string(),
            user_id: created.id,
            expiry,
        };

        tables.next_user_id += 1;
        tables.users.insert(created.id, created.clone());

        // The invitation step can fail after the user row exists; undo it.
        let failure = if self.fail_invitation_insert.load(Ordering::SeqCst) {
            Some(StoreError::Backend("invitation insert failed".to_string()))
        } else if tables.invitations.iter().any(|i| i.token_hash == token_hash) {
            Some(StoreError::Conflict("invitation token already exists".to_string()))
        } else {
            None
        };
        if let Some(err) = failure {
            tables.users.remove(&created.id);
            return Err(err);
        }

        tables.invitations.push(invitation);
        Ok(created)
    }

    async fn activate(&self, token_hash: &str, now: DateTime<Utc>) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock().await;

        let user_id = tables
            .invitations
            .iter()
            .find(|i| i.token_hash == token_hash && i.is_live(now))
            .map(|i| i.user_id)
            .ok_or(StoreError::NotFound)?;

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::NotFound)?;
        user.is_active = true;
        tables.invitations.retain(|i| i.user_id != user_id);

        Ok(user_id)
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::NotFound);
        }
        tables.invitations.retain(|i| i.user_id != user_id);
        let tables = &mut *tables;
        tables.users.remove(&user_id);
        tables.posts.retain(|_, p| p.user_id != user_id);
        let posts = &tables.posts;
        tables
            .comments
            .retain(|c| c.user_id != user_id && posts.contains_key(&c.post_id));
        tables
            .followers
            .retain(|&(followed, follower)| followed != user_id && follower != user_id);
        Ok(())
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<User, StoreError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        self.tables
            .lock()
            .await
            .active_user(user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.tables
            .lock()
            .await
            .users
            .values()
            .find(|u| u.is_active && u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Role, StoreError> {
        self.tables.lock().await.role(name).cloned()
    }

    async fn follow(&self, user_id: i64, follower_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.active_user(user_id).is_none() || !tables.users.contains_key(&follower_id) {
            return Err(StoreError::NotFound);
        }
        if !tables.followers.insert((user_id, follower_id)) {
            return Err(StoreError::Conflict("already following".to_string()));
        }
        Ok(())
    }

    async fn unfollow(&self, user_id: i64, follower_id: i64) -> Result<(), StoreError> {
        if self
            .tables
            .lock()
            .await
            .followers
            .remove(&(user_id, follower_id))
        {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn get_user_feed(
        &self,
        user_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<FeedItem>, StoreError> {
        let tables = self.tables.lock().await;
        let search = query.search.to_lowercase();

        let mut items: Vec<FeedItem> = tables
            .posts
            .values()
            .filter(|p| p.user_id == user_id || tables.followers.contains(&(p.user_id, user_id)))
            .filter(|p| {
                search.is_empty()
                    || p.title.to_lowercase().contains(&search)
                    || p.content.to_lowercase().contains(&search)
            })
            .filter(|p| query.tags.iter().all(|t| p.tags.contains(t)))
            .map(|p| FeedItem {
                post: p.clone(),
                username: tables
                    .users
                    .get(&p.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
                comments_count: tables.comments.iter().filter(|c| c.post_id == p.id).count()
                    as i64,
            })
            .collect();

        items.sort_by_key(|item| (item.post.created_at, item.post.id));
        if query.sort == SortOrder::Desc {
            items.reverse();
        }

        Ok(items
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let created = Post {
            id: tables.next_post_id,
            title: post.title,
            content: post.content,
            user_id: post.user_id,
            tags: post.tags,
            version: 0,
            created_at: now,
            updated_at: now,
            comments: Vec::new(),
        };
        tables.next_post_id += 1;
        tables.posts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_post(&self, post_id: i64) -> Result<Post, StoreError> {
        self.tables
            .lock()
            .await
            .posts
            .get(&post_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_post(&self, post: &Post) -> Result<Post, StoreError> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .posts
            .get_mut(&post.id)
            .filter(|p| p.version == post.version)
            .ok_or(StoreError::NotFound)?;

        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_post(&self, post_id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        tables.posts.remove(&post_id).ok_or(StoreError::NotFound)?;
        tables.comments.retain(|c| c.post_id != post_id);
        Ok(())
    }

    async fn get_comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.lock().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(comments)
    }
}
