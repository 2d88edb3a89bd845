// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Loads the post named by the `{id}` path parameter into the request.

use crate::db::StoreError;
use crate::error::AppError;
use crate::models::Post;
use crate::AppState;
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// The post a request targets.
#[derive(Debug, Clone)]
pub struct PostContext(pub Post);

pub async fn load_post(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let post = state.store.get_post(post_id).await.map_err(|e| match e {
        StoreError::NotFound => AppError::NotFound(format!("post {}", post_id)),
        other => other.into(),
    })?;

    request.extensions_mut().insert(PostContext(post));
    Ok(next.run(request).await)
}
