// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer token authentication middleware.

use crate::error::AppError;
use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// The authenticated caller, resolved through the identity cache.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Middleware that requires a valid session token for an active user.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers().get(header::AUTHORIZATION))?.to_string();

    let claims = state.authenticator.verify(&token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AppError::from(e)
    })?;

    let user_id: i64 = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;

    // A valid token for a deleted or deactivated user is still a 401.
    let user = state.identities.get(user_id).await.map_err(|e| match e {
        AppError::NotFound(_) => {
            tracing::debug!(user_id, "Token subject is not an active user");
            AppError::Unauthorized
        }
        other => other,
    })?;

    request.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, AppError> {
    let value = auth_header
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?
        .trim();

    if token.is_empty() {
        return Err(AppError::Unauthorized);
    }

    Ok(token)
}
