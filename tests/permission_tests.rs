// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post ownership and role-rank authorization.

use axum::http::{Method, StatusCode};
use serde_json::json;
use social_api::models::role;

mod common;
use common::{body_json, create_test_app, request};

#[tokio::test]
async fn test_user_cannot_delete_others_post() {
    let app = create_test_app();
    let alice = app.create_plain_user("alice").await;
    let bob = app.create_plain_user("bob").await;
    let post = app.create_post(&bob, "bob's post").await;

    let response = app
        .send(request(
            Method::DELETE,
            &format!("/v1/posts/{}", post.id),
            Some(&app.token_for(alice.id)),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "forbidden");
}

#[tokio::test]
async fn test_owner_can_delete_own_post() {
    let app = create_test_app();
    let bob = app.create_plain_user("bob").await;
    let post = app.create_post(&bob, "bob's post").await;

    let response = app
        .send(request(
            Method::DELETE,
            &format!("/v1/posts/{}", post.id),
            Some(&app.token_for(bob.id)),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .send(request(
            Method::GET,
            &format!("/v1/posts/{}", post.id),
            Some(&app.token_for(bob.id)),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_moderator_can_delete_but_not_edit() {
    let app = create_test_app();
    let moderator = app.create_user("mod", role::MODERATOR).await;
    let bob = app.create_plain_user("bob").await;
    let post = app.create_post(&bob, "bob's post").await;
    let token = app.token_for(moderator.id);

    let response = app
        .send(request(
            Method::PATCH,
            &format!("/v1/posts/{}", post.id),
            Some(&token),
            Some(json!({ "title": "edited" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(request(
            Method::DELETE,
            &format!("/v1/posts/{}", post.id),
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_admin_can_edit_others_post() {
    let app = create_test_app();
    let admin = app.create_user("root", role::ADMIN).await;
    let bob = app.create_plain_user("bob").await;
    let post = app.create_post(&bob, "bob's post").await;

    let response = app
        .send(request(
            Method::PATCH,
            &format!("/v1/posts/{}", post.id),
            Some(&app.token_for(admin.id)),
            Some(json!({ "title": "edited by admin" })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], "edited by admin");
    assert_eq!(body["user_id"], bob.id);
    assert_eq!(body["version"], post.version + 1);
}

#[tokio::test]
async fn test_owner_can_edit_own_post() {
    let app = create_test_app();
    let bob = app.create_plain_user("bob").await;
    let post = app.create_post(&bob, "bob's post").await;

    let response = app
        .send(request(
            Method::PATCH,
            &format!("/v1/posts/{}", post.id),
            Some(&app.token_for(bob.id)),
            Some(json!({ "content": "new content" })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["content"], "new content");
    assert_eq!(body["title"], "bob's post");
}

#[tokio::test]
async fn test_any_user_can_read_posts() {
    let app = create_test_app();
    let alice = app.create_plain_user("alice").await;
    let bob = app.create_plain_user("bob").await;
    let post = app.create_post(&bob, "bob's post").await;
    app.store.add_comment(post.id, alice.id, "nice").await.unwrap();

    let response = app
        .send(request(
            Method::GET,
            &format!("/v1/posts/{}", post.id),
            Some(&app.token_for(alice.id)),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["title"], "bob's post");
    assert_eq!(body["comments"][0]["username"], "alice");
}

#[tokio::test]
async fn test_unknown_post_is_not_found_before_authorization() {
    let app = create_test_app();
    let alice = app.create_plain_user("alice").await;

    let response = app
        .send(request(
            Method::DELETE,
            "/v1/posts/4242",
            Some(&app.token_for(alice.id)),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_post_owned_by_caller() {
    let app = create_test_app();
    let alice = app.create_plain_user("alice").await;

    let response = app
        .send(request(
            Method::POST,
            "/v1/posts",
            Some(&app.token_for(alice.id)),
            Some(json!({ "title": "hi", "content": "first post", "tags": ["intro"] })),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["user_id"], alice.id);
    assert_eq!(body["tags"][0], "intro");

    let too_long = app
        .send(request(
            Method::POST,
            "/v1/posts",
            Some(&app.token_for(alice.id)),
            Some(json!({ "title": "t".repeat(101), "content": "c" })),
        ))
        .await;
    assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);
}
