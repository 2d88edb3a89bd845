// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use social_api::config::Config;
use social_api::db::cache::{MemoryUserCache, UserCache};
use social_api::db::{MemoryStore, Storage};
use social_api::models::{role, NewPost, Password, Post, User};
use social_api::routes::create_router;
use social_api::services::{Mailer, MemoryMailer};
use social_api::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Password used for every seeded user.
#[allow(dead_code)]
pub const TEST_PASSWORD: &str = "password";

/// Check if a PostgreSQL database is available via environment variable.
#[allow(dead_code)]
pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// Skip test with message if no database is configured.
#[macro_export]
macro_rules! require_database {
    () => {
        match crate::common::database_url() {
            Some(url) => url,
            None => {
                eprintln!("⚠️  Skipping: DATABASE_URL not set");
                return;
            }
        }
    };
}

/// An app wired over in-memory doubles, with handles to each of them.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryUserCache>,
    pub mailer: Arc<MemoryMailer>,
}

/// Create a test app with the default test configuration.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

/// Create a test app with a custom configuration.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryUserCache::new(config.cache.user_ttl));
    let mailer = Arc::new(MemoryMailer::new());

    let cache_handle: Option<Arc<dyn UserCache>> = if config.cache.enabled {
        Some(cache.clone())
    } else {
        None
    };
    let store_handle: Arc<dyn Storage> = store.clone();
    let mailer_handle: Arc<dyn Mailer> = mailer.clone();

    let state = Arc::new(AppState::new(config, store_handle, cache_handle, mailer_handle));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
        cache,
        mailer,
    }
}

#[allow(dead_code)]
impl TestApp {
    /// Send one request through the full router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Seed an active user with the given role.
    pub async fn create_user(&self, username: &str, role_name: &str) -> User {
        self.store
            .insert_active_user(
                username,
                &format!("{}@example.com", username),
                Password::from_secret(TEST_PASSWORD).unwrap(),
                role_name,
            )
            .await
            .unwrap()
    }

    pub async fn create_plain_user(&self, username: &str) -> User {
        self.create_user(username, role::USER).await
    }

    pub async fn create_post(&self, owner: &User, title: &str) -> Post {
        self.store
            .create_post(NewPost {
                title: title.to_string(),
                content: format!("{} content", title),
                user_id: owner.id,
                tags: vec![],
            })
            .await
            .unwrap()
    }

    /// A valid session token for `user_id`.
    pub fn token_for(&self, user_id: i64) -> String {
        let authenticator = &self.state.authenticator;
        authenticator
            .issue(&authenticator.claims_for(user_id))
            .unwrap()
    }
}

/// Build a request, optionally authenticated and with a JSON body.
#[allow(dead_code)]
pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
