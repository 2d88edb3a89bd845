// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP basic authentication for operational routes.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Require the configured basic-auth credentials.
pub async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (username, password) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(decode_basic)
        .ok_or(AppError::BasicUnauthorized)?;

    let expected = &state.config.basic_auth;
    let username_ok = username.as_bytes().ct_eq(expected.username.as_bytes());
    let password_ok = password.as_bytes().ct_eq(expected.password.as_bytes());

    if !bool::from(username_ok & password_ok) {
        tracing::warn!("Rejected basic auth credentials");
        return Err(AppError::BasicUnauthorized);
    }

    Ok(next.run(request).await)
}

/// Decode `Basic <base64(user:pass)>` into its two parts.
fn decode_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic() {
        let header = format!("Basic {}", STANDARD.encode("admin:pa:ss"));
        assert_eq!(
            decode_basic(&header),
            Some(("admin".to_string(), "pa:ss".to_string()))
        );

        assert_eq!(decode_basic("Bearer abc"), None);
        assert_eq!(decode_basic("Basic !!!"), None);
        assert_eq!(
            decode_basic(&format!("Basic {}", STANDARD.encode("nocolon"))),
            None
        );
    }
}
