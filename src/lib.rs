// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Social API: request admission and identity consistency for a
//! content-sharing backend.
//!
//! Every request passes through a fixed-window rate gate, bearer-token
//! authentication, and a cache-aside identity lookup before reaching a
//! handler. Handlers that act on another user's content go through the
//! ownership + role-rank authorization check, and account registration,
//! activation and deletion run as atomic store units.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::cache::UserCache;
use db::Storage;
use services::{
    AuthorizationEvaluator, FixedWindowLimiter, IdentityResolver, LifecycleService, Mailer,
    TokenAuthenticator,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Storage>,
    pub identities: IdentityResolver,
    pub authenticator: TokenAuthenticator,
    pub rate_limiter: FixedWindowLimiter,
    pub authz: AuthorizationEvaluator,
    pub lifecycle: LifecycleService,
}

impl AppState {
    /// Wire the services over the given store, optional cache and mailer.
    pub fn new(
        config: Config,
        store: Arc<dyn Storage>,
        cache: Option<Arc<dyn UserCache>>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let identities = IdentityResolver::new(store.clone(), cache);
        let lifecycle = LifecycleService::new(
            store.clone(),
            identities.clone(),
            mailer,
            config.mail.invitation_ttl,
            config.api_url.clone(),
        );

        Self {
            authenticator: TokenAuthenticator::new(&config.token),
            rate_limiter: FixedWindowLimiter::from_config(&config.rate_limit),
            authz: AuthorizationEvaluator::new(store.clone()),
            identities,
            lifecycle,
            store,
            config,
        }
    }
}
