// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile, activation, follow and feed routes.

use crate::db::StoreError;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{FeedItem, FeedParams, FeedQuery, UserResponse};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use std::sync::Arc;
use validator::Validate;

/// Routes reachable without a session token.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/users/activate/{token}", put(activate_user))
}

/// Routes that require authentication (applied in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/feed", get(get_user_feed))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/follow", put(follow_user))
        .route("/users/{id}/unfollow", put(unfollow_user))
}

async fn activate_user(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<StatusCode> {
    state.lifecycle.activate(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserResponse>> {
    let user = state.identities.get(user_id).await?;
    Ok(Json(user.into()))
}

async fn follow_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    state
        .store
        .follow(user_id, me.id)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::Conflict("already following this user".to_string()),
            StoreError::NotFound => AppError::NotFound(format!("user {}", user_id)),
            other => other.into(),
        })?;

    tracing::debug!(user_id, follower_id = me.id, "Follow recorded");
    Ok(StatusCode::ACCEPTED)
}

async fn unfollow_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode> {
    state
        .store
        .unfollow(user_id, me.id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound("not following this user".to_string()),
            other => other.into(),
        })?;

    Ok(StatusCode::ACCEPTED)
}

async fn get_user_feed(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<FeedItem>>> {
    let query = FeedQuery::from(params);
    query.validate()?;

    let feed = state.store.get_user_feed(me.id, &query).await?;
    Ok(Json(feed))
}
