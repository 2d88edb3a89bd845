// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ownership + role-rank authorization.
//!
//! An actor may act on a resource when they own it, or when their role's
//! level is at least the level of the required role. Ownership alone is
//! always enough.

use crate::db::{Storage, StoreError};
use crate::models::{Post, Role, User};
use std::sync::Arc;

/// A resource with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

impl Owned for Post {
    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("role not found: {0}")]
    RoleNotFound(String),

    /// The actor or resource was not resolved before the check ran.
    #[error("authorization context missing: {0}")]
    ContextMissing(&'static str),

    #[error(transparent)]
    Store(StoreError),
}

/// Pure decision rule.
pub fn decide(actor: &User, owner_id: i64, required: &Role) -> Decision {
    if actor.id == owner_id || actor.role_level >= required.level {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Resolves required roles from the store and applies [`decide`].
#[derive(Clone)]
pub struct AuthorizationEvaluator {
    store: Arc<dyn Storage>,
}

impl AuthorizationEvaluator {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Check whether `actor` may act on `resource` given `required_role`.
    ///
    /// Both `actor` and `resource` must have been resolved upstream; a
    /// missing one is a pipeline error, not a denial.
    pub async fn check_permission<R: Owned + ?Sized>(
        &self,
        actor: Option<&User>,
        resource: Option<&R>,
        required_role: &str,
    ) -> Result<Decision, AuthzError> {
        let actor = actor.ok_or(AuthzError::ContextMissing("actor"))?;
        let resource = resource.ok_or(AuthzError::ContextMissing("resource"))?;

        let role = self
            .store
            .get_role_by_name(required_role)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthzError::RoleNotFound(required_role.to_string()),
                other => AuthzError::Store(other),
            })?;

        let decision = decide(actor, resource.owner_id(), &role);
        tracing::debug!(
            user_id = actor.id,
            owner_id = resource.owner_id(),
            role = %role.name,
            ?decision,
            "Permission evaluated"
        );
        Ok(decision)
    }
}
