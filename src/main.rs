// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Social API Server
//!
//! Content-sharing backend with rate limiting, token authentication,
//! cache-aside identity resolution and role-based authorization.

use social_api::{
    config::Config,
    db::cache::{RedisUserCache, UserCache},
    db::{PostgresStore, Storage},
    services::{Mailer, MailtrapMailer},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, env = %config.env, "Starting Social API");

    // Connect to PostgreSQL and apply migrations
    let store: Arc<dyn Storage> = Arc::new(PostgresStore::connect(&config.db).await?);

    // Identity cache (optional)
    let cache: Option<Arc<dyn UserCache>> = if config.cache.enabled {
        let pool = deadpool_redis::Config::from_url(&config.cache.redis_url)
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))?;
        tracing::info!(ttl_secs = config.cache.user_ttl.as_secs(), "Redis identity cache enabled");
        Some(Arc::new(RedisUserCache::new(
            pool,
            config.cache.user_ttl,
            config.cache.timeout,
        )))
    } else {
        tracing::info!("Identity cache disabled");
        None
    };

    let mailer: Arc<dyn Mailer> = Arc::new(MailtrapMailer::new(&config.mail)?);

    if !config.rate_limit.enabled {
        tracing::warn!("Rate limiter disabled");
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, cache, mailer));

    // Build router
    let app = social_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("social_api=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
