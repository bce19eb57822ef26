// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-up, sign-in and sign-out through the HTTP surface.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use prepwise::db::DocumentStore;
use prepwise::models::Session;
use prepwise::services::SESSION_COOKIE;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::json_body;

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .find(|value| value.starts_with(&format!("{SESSION_COOKIE}=")))
}

#[tokio::test]
async fn test_sign_up_creates_profile_once() {
    let app = common::create_test_app();
    let identity = app.directory.create_user("ada@example.com", "pw").unwrap();
    let form = json!({ "uid": identity.id, "name": "Ada Lovelace", "email": "ada@example.com" });

    let response = app
        .app()
        .oneshot(post_json("/auth/sign-up", form.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        json_body(response).await,
        json!({ "success": true, "message": "Account created successfully. Please sign in." })
    );

    let again = app
        .app()
        .oneshot(post_json(
            "/auth/sign-up",
            json!({ "uid": identity.id, "name": "Someone Else", "email": "ada@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(
        json_body(again).await,
        json!({ "success": false, "message": "User already exists. Please sign in." })
    );

    let stored = app.store.get_user(&identity.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Ada Lovelace");
}

#[tokio::test]
async fn test_concurrent_sign_up_creates_one_profile() {
    let app = common::create_test_app();
    let identity = app.directory.create_user("race@example.com", "pw").unwrap();

    let attempts = (0..8).map(|i| {
        let state = app.state.clone();
        let uid = identity.id.clone();
        tokio::spawn(async move {
            state
                .auth
                .sign_up(&uid, &format!("Racer {i}"), "race@example.com")
                .await
        })
    });

    let mut created = 0;
    for attempt in attempts {
        if attempt.await.unwrap().is_ok() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
}

#[tokio::test]
async fn test_sign_up_without_identity_is_rejected() {
    let app = common::create_test_app();

    let response = app
        .app()
        .oneshot(post_json(
            "/auth/sign-up",
            json!({ "uid": "ghost-uid", "name": "Ghost", "email": "ghost@example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["success"], false);
    assert!(app.store.get_user("ghost-uid").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_up_with_other_email_is_rejected() {
    let app = common::create_test_app();
    let identity = app.directory.create_user("ada@example.com", "pw").unwrap();

    let response = app
        .app()
        .oneshot(post_json(
            "/auth/sign-up",
            json!({ "uid": identity.id, "name": "Mallory", "email": "mallory@example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["success"], false);
    assert!(app.store.get_user(&identity.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_up_validates_form() {
    let app = common::create_test_app();

    let response = app
        .app()
        .oneshot(post_json(
            "/auth/sign-up",
            json!({ "uid": "u1", "name": "Al", "email": "not-an-email" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(app.store.get_user("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_in_unknown_email_sets_no_cookie() {
    let app = common::create_test_app();

    let response = app
        .app()
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "ghost@example.com", "idToken": "whatever" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(session_cookie(&response).is_none());
    assert_eq!(
        json_body(response).await,
        json!({ "success": false, "message": "User does not exist. Create an account instead." })
    );
}

#[tokio::test]
async fn test_sign_in_with_bad_id_token_fails() {
    let app = common::create_test_app();
    app.directory.create_user("ada@example.com", "pw").unwrap();

    let response = app
        .app()
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "ada@example.com", "idToken": "forged" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());
    assert_eq!(
        json_body(response).await["message"],
        "Failed to log into an account."
    );
}

#[tokio::test]
async fn test_sign_in_sets_session_cookie() {
    let app = common::create_test_app();
    let identity = app.directory.create_user("ada@example.com", "pw").unwrap();
    app.state
        .auth
        .sign_up(&identity.id, "Ada Lovelace", "ada@example.com")
        .await
        .unwrap();
    let id_token = app
        .directory
        .sign_in_with_password("ada@example.com", "pw")
        .unwrap();

    let response = app
        .app()
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "ada@example.com", "idToken": id_token }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("session cookie");
    assert!(cookie.contains("Max-Age=604800"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    // Test config is not production
    assert!(!cookie.contains("Secure"));

    // The cookie resolves to the stored profile.
    let token = cookie
        .trim_start_matches("session=")
        .split(';')
        .next()
        .unwrap();
    match app.state.auth.session_for_token(Some(token)).await {
        Session::Authenticated(user) => {
            assert_eq!(user.id, identity.id);
            assert_eq!(user.name, "Ada Lovelace");
        }
        Session::Anonymous => panic!("expected an authenticated session"),
    }
}

#[tokio::test]
async fn test_production_cookie_is_secure() {
    let mut config = prepwise::config::Config::test_default();
    config.production = true;
    let app = common::create_test_app_with_config(config);
    app.directory.create_user("ada@example.com", "pw").unwrap();
    let id_token = app
        .directory
        .sign_in_with_password("ada@example.com", "pw")
        .unwrap();

    let cookie = app.state.auth.mint_session(&id_token).await.unwrap();

    assert_eq!(cookie.secure(), Some(true));
}

#[tokio::test]
async fn test_sign_out_clears_cookie_with_same_attributes() {
    let app = common::create_test_app();
    let (_, cookie) = app.signed_in("Ada Lovelace", "ada@example.com").await;

    let response = app
        .app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/sign-out")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let removal = session_cookie(&response).expect("removal cookie");
    assert!(removal.starts_with("session=;"));
    assert!(removal.contains("Max-Age=0"));
    assert!(removal.contains("HttpOnly"));
    assert!(removal.contains("SameSite=Lax"));
    assert!(removal.contains("Path=/"));
}
