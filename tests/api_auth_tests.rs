// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Tokens for inactive or deleted users are rejected
//! 3. Login issues a token only for correct credentials of active users
//! 4. The health check requires basic auth

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;
use social_api::services::Claims;

mod common;
use common::{body_json, create_test_app, request, TEST_PASSWORD};

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = create_test_app();
    let user = app.create_plain_user("alice").await;

    let response = app
        .send(request(Method::GET, &format!("/v1/users/{}", user.id), None, None))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let app = create_test_app();

    let response = app
        .send(request(
            Method::GET,
            "/v1/users/feed",
            Some("invalid.token.here"),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_token");
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let app = create_test_app();
    let user = app.create_plain_user("alice").await;
    let token = app.token_for(user.id);

    let response = app
        .send(request(
            Method::GET,
            &format!("/v1/users/{}", user.id),
            Some(&token),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = create_test_app();
    let user = app.create_plain_user("alice").await;

    let authenticator = &app.state.authenticator;
    let fresh = authenticator.claims_for(user.id);
    let expired = Claims {
        iat: fresh.iat - 7200,
        nbf: fresh.nbf - 7200,
        exp: fresh.iat - 3600,
        ..fresh
    };
    let token = authenticator.issue(&expired).unwrap();

    let response = app
        .send(request(Method::GET, "/v1/users/feed", Some(&token), None))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_deleted_user_rejected() {
    let app = create_test_app();
    let user = app.create_plain_user("alice").await;
    let token = app.token_for(user.id);

    app.state.lifecycle.delete(user.id).await.unwrap();

    let response = app
        .send(request(Method::GET, "/v1/users/feed", Some(&token), None))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_with_non_numeric_subject_rejected() {
    let app = create_test_app();
    let authenticator = &app.state.authenticator;
    let claims = Claims {
        sub: "alice".to_string(),
        ..authenticator.claims_for(1)
    };
    let token = authenticator.issue(&claims).unwrap();

    let response = app
        .send(request(Method::GET, "/v1/users/feed", Some(&token), None))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_issues_token() {
    let app = create_test_app();
    let user = app.create_plain_user("alice").await;

    let response = app
        .send(request(
            Method::POST,
            "/v1/authentication/token",
            None,
            Some(json!({ "email": user.email, "password": TEST_PASSWORD })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let claims = app.state.authenticator.verify(&token).unwrap();
    assert_eq!(claims.sub, user.id.to_string());
    assert_eq!(claims.iss, "socialapi");
    assert_eq!(claims.aud, "socialapi");

    // The token works on a protected route
    let response = app
        .send(request(Method::GET, "/v1/users/feed", Some(&token), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let app = create_test_app();
    let user = app.create_plain_user("alice").await;

    let wrong_password = app
        .send(request(
            Method::POST,
            "/v1/authentication/token",
            None,
            Some(json!({ "email": user.email, "password": "not-the-password" })),
        ))
        .await;
    let unknown_email = app
        .send(request(
            Method::POST,
            "/v1/authentication/token",
            None,
            Some(json!({ "email": "nobody@example.com", "password": TEST_PASSWORD })),
        ))
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_email).await);
}

#[tokio::test]
async fn test_inactive_user_cannot_log_in() {
    let app = create_test_app();

    let response = app
        .send(request(
            Method::POST,
            "/v1/authentication/register",
            None,
            Some(json!({ "username": "bob", "email": "bob@example.com", "password": "s3cret" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .send(request(
            Method::POST,
            "/v1/authentication/token",
            None,
            Some(json!({ "email": "bob@example.com", "password": "s3cret" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_requires_basic_auth() {
    let app = create_test_app();

    let response = app
        .send(request(Method::GET, "/v1/health", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response
        .headers()
        .get(header::WWW_AUTHENTICATE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("Basic"));

    let wrong = format!("Basic {}", STANDARD.encode("admin:wrong"));
    let response = app
        .send(
            Request::builder()
                .uri("/v1/health")
                .header(header::AUTHORIZATION, wrong)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let right = format!("Basic {}", STANDARD.encode("admin:admin-password"));
    let response = app
        .send(
            Request::builder()
                .uri("/v1/health")
                .header(header::AUTHORIZATION, right)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["env"], "test");
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = create_test_app();

    let response = app
        .send(
            Request::builder()
                .method("OPTIONS")
                .uri("/v1/posts/1")
                .header(header::ORIGIN, "http://localhost:5174")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    // Should have CORS headers
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let app = create_test_app();

    let response = app
        .send(request(Method::GET, "/v1/users/feed", None, None))
        .await;

    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}
