// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post routes.
//!
//! `/posts/{id}` loads the post once for every method; PATCH additionally
//! requires ownership or admin, DELETE ownership or moderator.

use crate::db::StoreError;
use crate::error::{AppError, Result};
use crate::middleware::{load_post, require_admin, require_moderator, CurrentUser, PostContext};
use crate::models::{NewPost, Post};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Routes that require authentication (applied in routes/mod.rs).
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let item = get(get_post)
        .merge(
            patch(update_post)
                .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
        )
        .merge(
            delete(delete_post)
                .route_layer(middleware::from_fn_with_state(state.clone(), require_moderator)),
        )
        .route_layer(middleware::from_fn_with_state(state, load_post));

    Router::new()
        .route("/posts", post(create_post))
        .route("/posts/{id}", item)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostPayload {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(me)): Extension<CurrentUser>,
    Json(payload): Json<CreatePostPayload>,
) -> Result<(StatusCode, Json<Post>)> {
    payload.validate()?;

    let post = state
        .store
        .create_post(NewPost {
            title: payload.title,
            content: payload.content,
            user_id: me.id,
            tags: payload.tags,
        })
        .await?;

    tracing::info!(post_id = post.id, user_id = me.id, "Post created");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Extension(PostContext(mut post)): Extension<PostContext>,
) -> Result<Json<Post>> {
    post.comments = state.store.get_comments_for_post(post.id).await?;
    Ok(Json(post))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostPayload {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 1000))]
    pub content: Option<String>,
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    Extension(PostContext(mut post)): Extension<PostContext>,
    Json(payload): Json<UpdatePostPayload>,
) -> Result<Json<Post>> {
    payload.validate()?;

    if let Some(title) = payload.title {
        post.title = title;
    }
    if let Some(content) = payload.content {
        post.content = content;
    }

    let updated = state.store.update_post(&post).await.map_err(|e| match e {
        StoreError::NotFound => {
            AppError::NotFound(format!("post {} (it may have been modified concurrently)", post.id))
        }
        other => other.into(),
    })?;

    // The owner's cached snapshot must not outlive a mutation of their content.
    state.identities.invalidate(updated.user_id).await?;

    tracing::info!(post_id = updated.id, version = updated.version, "Post updated");
    Ok(Json(updated))
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    Extension(PostContext(post)): Extension<PostContext>,
) -> Result<StatusCode> {
    state.store.delete_post(post.id).await?;

    tracing::info!(post_id = post.id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}
