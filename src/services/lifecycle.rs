// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity lifecycle transitions.
//!
//! - Register: insert an inactive user plus its invitation as one unit,
//!   then try to email the plaintext invitation secret.
//! - Activate: consume a live invitation and flip the user active, as one unit.
//! - Delete: remove a user and any invitation, as one unit.
//!
//! The invitation email is sent after the registration unit commits and is
//! not part of it. A delivery failure is logged and the registration still
//! succeeds; the user can be re-invited out of band.

use crate::db::{Storage, StoreError};
use crate::error::{AppError, Result};
use crate::models::invitation::{generate_token, hash_token};
use crate::models::{NewUser, Password, User};
use crate::services::identity::IdentityResolver;
use crate::services::mailer::{Mailer, Template, TemplateData};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const INVALID_INVITATION: &str = "invitation not found or expired";

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    /// Plaintext invitation secret (never stored)
    pub invitation_token: String,
    /// Whether the invitation email was accepted by the mail provider
    pub mail_sent: bool,
}

pub struct LifecycleService {
    store: Arc<dyn Storage>,
    identities: IdentityResolver,
    mailer: Arc<dyn Mailer>,
    invitation_ttl: Duration,
    api_url: String,
}

impl LifecycleService {
    pub fn new(
        store: Arc<dyn Storage>,
        identities: IdentityResolver,
        mailer: Arc<dyn Mailer>,
        invitation_ttl: Duration,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            identities,
            mailer,
            invitation_ttl,
            api_url: api_url.into(),
        }
    }

    /// Register a new, inactive user and invite them by email.
    pub async fn register(&self, username: &str, email: &str, secret: &str) -> Result<Registration> {
        let password = Password::from_secret(secret)?;
        let (plaintext, token_hash) = generate_token();
        let expiry = Utc::now()
            + chrono::Duration::from_std(self.invitation_ttl)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("invitation ttl: {e}")))?;

        let user = self
            .store
            .create_and_invite(
                NewUser {
                    username: username.to_string(),
                    email: email.to_string(),
                    password,
                },
                &token_hash,
                expiry,
            )
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    AppError::Conflict("a user with that username or email already exists".to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(user_id = user.id, "User registered, invitation created");

        let data = TemplateData {
            username: user.username.clone(),
            activation_url: format!("{}/v1/users/activate/{}", self.api_url, plaintext),
        };
        let mail_sent = match self
            .mailer
            .send(Template::UserInvitation, &user.username, &user.email, &data)
            .await
        {
            Ok(status) => {
                tracing::debug!(user_id = user.id, status, "Invitation email accepted");
                true
            }
            Err(e) => {
                tracing::warn!(
                    user_id = user.id,
                    error = %e,
                    "Invitation email failed; user remains pending"
                );
                false
            }
        };

        Ok(Registration {
            user,
            invitation_token: plaintext,
            mail_sent,
        })
    }

    /// Activate the user owning `plaintext`. Unknown, expired and already
    /// used secrets all fail with the same `NotFound`.
    pub async fn activate(&self, plaintext: &str) -> Result<i64> {
        let user_id = self
            .store
            .activate(&hash_token(plaintext), Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AppError::NotFound(INVALID_INVITATION.to_string()),
                other => other.into(),
            })?;

        self.identities.invalidate(user_id).await?;
        tracing::info!(user_id, "User activated");
        Ok(user_id)
    }

    /// Delete a user and any pending invitation.
    pub async fn delete(&self, user_id: i64) -> Result<()> {
        self.store.delete_user(user_id).await.map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound(format!("user {}", user_id)),
            other => other.into(),
        })?;

        self.identities.invalidate(user_id).await?;
        tracing::info!(user_id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::cache::MemoryUserCache;
    use crate::db::MemoryStore;
    use crate::services::mailer::MemoryMailer;

    struct Fixture {
        store: Arc<MemoryStore>,
        mailer: Arc<MemoryMailer>,
        cache: Arc<MemoryUserCache>,
        lifecycle: LifecycleService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let cache = Arc::new(MemoryUserCache::new(Duration::from_secs(60)));
        let identities = IdentityResolver::new(store.clone(), Some(cache.clone()));
        let lifecycle = LifecycleService::new(
            store.clone(),
            identities,
            mailer.clone(),
            Duration::from_secs(72 * 3600),
            "http://localhost:4040",
        );
        Fixture {
            store,
            mailer,
            cache,
            lifecycle,
        }
    }

    #[tokio::test]
    async fn test_register_then_activate() {
        let f = fixture();
        let registration = f
            .lifecycle
            .register("alice", "alice@x.com", "s3cret")
            .await
            .unwrap();
        let id = registration.user.id;

        assert!(!registration.user.is_active);
        assert!(registration.mail_sent);

        let invitations = f.store.invitations_for(id).await;
        assert_eq!(invitations.len(), 1);
        assert!(invitations[0].is_live(Utc::now()));
        assert_eq!(invitations[0].token_hash, hash_token(&registration.invitation_token));
        assert_ne!(invitations[0].token_hash, registration.invitation_token);

        let sent = f.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].address, "alice@x.com");
        assert!(sent[0]
            .data
            .activation_url
            .ends_with(&registration.invitation_token));

        assert_eq!(
            f.lifecycle.activate(&registration.invitation_token).await.unwrap(),
            id
        );
        assert!(f.store.find_user(id).await.unwrap().is_active);
        assert!(f.store.invitations_for(id).await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_and_leaves_nothing() {
        let f = fixture();
        f.lifecycle
            .register("alice", "alice@x.com", "s3cret")
            .await
            .unwrap();

        let result = f.lifecycle.register("alice2", "alice@x.com", "s3cret").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(f.store.user_count().await, 1);
        assert_eq!(f.store.invitation_count().await, 1);
        assert_eq!(f.mailer.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_invitation_step_rolls_back_user() {
        let f = fixture();
        f.store.fail_invitation_insert(true);

        let result = f.lifecycle.register("alice", "alice@x.com", "s3cret").await;
        assert!(result.is_err());
        assert_eq!(f.store.user_count().await, 0);
        assert_eq!(f.store.invitation_count().await, 0);
        assert!(f.mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_weak_secret_rejected_before_store() {
        let f = fixture();
        let result = f.lifecycle.register("alice", "alice@x.com", "ab").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(f.store.user_count().await, 0);
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_registration() {
        let f = fixture();
        f.mailer.set_failing(true);

        let registration = f
            .lifecycle
            .register("alice", "alice@x.com", "s3cret")
            .await
            .unwrap();
        assert!(!registration.mail_sent);
        assert_eq!(f.store.user_count().await, 1);
        assert_eq!(f.store.invitation_count().await, 1);
    }

    #[tokio::test]
    async fn test_bad_secrets_fail_identically() {
        let f = fixture();
        let registration = f
            .lifecycle
            .register("alice", "alice@x.com", "s3cret")
            .await
            .unwrap();

        let unknown = f.lifecycle.activate("never-issued").await.unwrap_err();

        f.store.expire_invitations_for(registration.user.id).await;
        let expired = f
            .lifecycle
            .activate(&registration.invitation_token)
            .await
            .unwrap_err();

        assert_eq!(unknown.to_string(), expired.to_string());
        assert!(matches!(unknown, AppError::NotFound(_)));
        assert!(matches!(expired, AppError::NotFound(_)));
        assert!(!f.store.find_user(registration.user.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_consumed_secret_fails_like_unknown() {
        let f = fixture();
        let registration = f
            .lifecycle
            .register("alice", "alice@x.com", "s3cret")
            .await
            .unwrap();

        f.lifecycle
            .activate(&registration.invitation_token)
            .await
            .unwrap();
        let replay = f
            .lifecycle
            .activate(&registration.invitation_token)
            .await
            .unwrap_err();
        let unknown = f.lifecycle.activate("never-issued").await.unwrap_err();

        assert_eq!(replay.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_delete_removes_user_invitation_and_cache() {
        let f = fixture();
        let registration = f
            .lifecycle
            .register("alice", "alice@x.com", "s3cret")
            .await
            .unwrap();
        let id = registration.user.id;

        f.lifecycle.delete(id).await.unwrap();
        assert!(f.store.find_user(id).await.is_none());
        assert!(f.store.invitations_for(id).await.is_empty());
        assert!(!f.cache.contains(id));

        assert!(matches!(
            f.lifecycle.delete(id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
