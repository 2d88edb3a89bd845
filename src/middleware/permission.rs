// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post permission checks.
//!
//! Must run after [`require_auth`](super::auth::require_auth) and
//! [`load_post`](super::post_context::load_post); if either context value
//! is missing the request fails with 500.

use super::auth::CurrentUser;
use super::post_context::PostContext;
use crate::error::AppError;
use crate::models::role;
use crate::services::Decision;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Owner or moderator.
pub async fn require_moderator(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&state, role::MODERATOR, request, next).await
}

/// Owner or admin.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_role(&state, role::ADMIN, request, next).await
}

async fn require_role(
    state: &AppState,
    required_role: &'static str,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = request
        .extensions()
        .get::<CurrentUser>()
        .map(|CurrentUser(user)| user.clone());
    let post = request
        .extensions()
        .get::<PostContext>()
        .map(|PostContext(post)| post.clone());

    let decision = state
        .authz
        .check_permission(actor.as_ref(), post.as_ref(), required_role)
        .await?;

    match decision {
        Decision::Allow => Ok(next.run(request).await),
        Decision::Deny => {
            tracing::info!(
                user_id = actor.as_ref().map(|u| u.id),
                post_id = post.as_ref().map(|p| p.id),
                role = required_role,
                "Permission denied"
            );
            Err(AppError::Forbidden)
        }
    }
}
