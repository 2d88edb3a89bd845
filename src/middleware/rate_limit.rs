// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rate admission middleware.

use crate::error::AppError;
use crate::services::Admission;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Admit or reject the request based on its client address.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.rate_limiter.is_enabled() {
        return Ok(next.run(request).await);
    }

    let connect_info = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), connect_info);

    match state.rate_limiter.admit(&client) {
        Admission::Allowed => Ok(next.run(request).await),
        Admission::Rejected { retry_after } => {
            tracing::warn!(
                client = %client,
                retry_after_secs = AppError::retry_after_secs(retry_after),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited { retry_after })
        }
    }
}

/// Client key: `X-Real-IP`, else the first `X-Forwarded-For` hop, else the
/// peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(real_ip) = header("x-real-ip") {
        return real_ip.to_string();
    }

    if let Some(first) = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
