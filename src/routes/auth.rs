// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and session token routes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::db::StoreError;
use crate::error::{AppError, Result};
use crate::models::UserResponse;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/authentication/register", post(register_user))
        .route("/authentication/token", post(create_token))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 3, max = 72))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    /// Plaintext invitation secret, also sent by email
    pub token: String,
}

/// Register a user and send the invitation.
async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<(StatusCode, Json<RegistrationResponse>)> {
    payload.validate()?;

    let registration = state
        .lifecycle
        .register(&payload.username, &payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RegistrationResponse {
            user: registration.user.into(),
            token: registration.invitation_token,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTokenPayload {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 3, max = 72))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Exchange credentials for a session token.
///
/// Unknown, inactive and wrong-password logins all get the same 401.
async fn create_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTokenPayload>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    payload.validate()?;

    let user = match state.store.get_user_by_email(&payload.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e.into()),
    };

    user.password.compare(&payload.password).map_err(|_| {
        tracing::info!(user_id = user.id, "Login with wrong password");
        AppError::Unauthorized
    })?;

    let claims = state.authenticator.claims_for(user.id);
    let token = state.authenticator.issue(&claims)?;

    tracing::info!(user_id = user.id, "Session token issued");
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}
