// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Guarded routes reject requests without a token (401)
//! 2. Guarded routes reject tokens that fail verification (403)
//! 3. Tokens are accepted from the cookie or the bearer header
//! 4. CORS preflight, security headers, and the 404 fallback behave

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use vidtube::config::Config;

mod common;
use common::{body_json, empty_request, send, PREFIX};

/// Create an access-token-shaped JWT signed with `key`.
fn create_test_jwt(user_id: &str, key: &[u8], exp_offset_secs: i64) -> String {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Claims {
        sub: String,
        email: String,
        username: String,
        full_name: String,
        exp: usize,
        iat: usize,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id.to_string(),
        email: "someone@example.com".to_string(),
        username: "someone".to_string(),
        full_name: "Someone".to_string(),
        exp: (now + exp_offset_secs) as usize,
        iat: now as usize,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(key),
    )
    .unwrap()
}

fn current_user_uri() -> String {
    format!("{}/current-user", PREFIX)
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _, _) = common::create_test_app();

    let response = send(&app, empty_request("GET", &current_user_uri(), None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Unauthorized request");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _, _) = common::create_test_app();

    let response = send(
        &app,
        empty_request("GET", &current_user_uri(), Some("invalid.token.here")),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["message"], "Invalid access token");
}

#[tokio::test]
async fn test_protected_route_with_wrong_key() {
    let (app, _, _) = common::create_test_app();
    let config = Config::test_default();

    // Signed with the refresh key: well-formed but not an access token
    let token = create_test_jwt("65a1b2c3d4e5f60718293a4b", &config.refresh_token_secret, 3600);
    let response = send(&app, empty_request("GET", &current_user_uri(), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_protected_route_with_expired_token() {
    let (app, _, _) = common::create_test_app();
    let config = Config::test_default();

    let token = create_test_jwt("65a1b2c3d4e5f60718293a4b", &config.access_token_secret, -3600);
    let response = send(&app, empty_request("GET", &current_user_uri(), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_valid_token_for_unknown_user() {
    let (app, _, _) = common::create_test_app();
    let config = Config::test_default();

    let token = create_test_jwt("000000000000000000000000", &config.access_token_secret, 3600);
    let response = send(&app, empty_request("GET", &current_user_uri(), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid access token");
}

#[tokio::test]
async fn test_protected_route_with_bearer_token() {
    let (app, _, _) = common::create_test_app();
    let session = common::register_and_login(&app, "alice").await;

    let response = send(
        &app,
        empty_request("GET", &current_user_uri(), Some(&session.access_token)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "User fetched successfully");
    assert_eq!(body["data"]["id"], session.user_id.as_str());
}

#[tokio::test]
async fn test_bearer_scheme_is_case_insensitive() {
    let (app, _, _) = common::create_test_app();
    let session = common::register_and_login(&app, "dave").await;

    for scheme in ["bearer", "BEARER"] {
        let request = Request::builder()
            .method("GET")
            .uri(current_user_uri())
            .header(
                header::AUTHORIZATION,
                format!("{} {}", scheme, session.access_token),
            )
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK, "scheme {}", scheme);
    }

    // Other schemes are treated as no token at all
    let request = Request::builder()
        .method("GET")
        .uri(current_user_uri())
        .header(header::AUTHORIZATION, format!("Basic {}", session.access_token))
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_cookie_token() {
    let (app, _, _) = common::create_test_app();
    let session = common::register_and_login(&app, "bob").await;

    let request = Request::builder()
        .method("GET")
        .uri(current_user_uri())
        .header(header::COOKIE, format!("accessToken={}", session.access_token))
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["username"], "bob");
}

#[tokio::test]
async fn test_cookie_takes_precedence_over_header() {
    let (app, _, _) = common::create_test_app();
    let session = common::register_and_login(&app, "carol").await;

    let request = Request::builder()
        .method("GET")
        .uri(current_user_uri())
        .header(header::COOKIE, "accessToken=garbage")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", session.access_token),
        )
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _, _) = common::create_test_app();

    let request = Request::builder()
        .method("OPTIONS")
        .uri(format!("{}/update-account", PREFIX))
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    let methods = headers
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("PATCH"));
}

#[tokio::test]
async fn test_cors_rejects_unknown_origin() {
    let (app, _, _) = common::create_test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _, _) = common::create_test_app();

    let response = send(&app, empty_request("GET", "/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("X-Frame-Options").unwrap(), "DENY");
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_returns_envelope() {
    let (app, _, _) = common::create_test_app();

    for uri in ["/nope", "/api/v1/users/does-not-exist"] {
        let response = send(&app, empty_request("GET", uri, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(
            response.headers().get("X-Content-Type-Options").unwrap(),
            "nosniff"
        );

        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 404);
        assert_eq!(body["message"], "Route not found");
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"], serde_json::json!([]));
    }
}
