// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication tests.
//!
//! These tests decode tokens handed out by the login route with plain
//! `jsonwebtoken`, so a change to the claim layout, algorithm, or keys is
//! caught before clients see it.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};
use vidtube::config::Config;

mod common;

/// Access token claims as a client would read them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessClaims {
    sub: String,
    email: String,
    username: String,
    full_name: String,
    exp: usize,
    iat: usize,
}

/// Refresh tokens carry only the subject and a token id.
#[derive(Debug, Deserialize)]
struct RefreshClaims {
    sub: String,
    jti: String,
    exp: usize,
    iat: usize,
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

#[tokio::test]
async fn test_access_token_claims() {
    let (app, _, _) = common::create_test_app();
    let session = common::register_and_login(&app, "alice").await;
    let config = Config::test_default();

    let token_data = decode::<AccessClaims>(
        &session.access_token,
        &DecodingKey::from_secret(&config.access_token_secret),
        &Validation::new(Algorithm::HS256),
    )
    .expect("Failed to decode access token - check claims compatibility");

    let claims = token_data.claims;
    assert_eq!(claims.sub, session.user_id);
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.email, "alice@example.com");
    assert_eq!(claims.full_name, "Test User");
    assert_eq!(
        (claims.exp - claims.iat) as i64,
        config.access_token_ttl_secs
    );
    assert!(claims.exp > now());
}

#[tokio::test]
async fn test_refresh_token_claims() {
    let (app, _, _) = common::create_test_app();
    let session = common::register_and_login(&app, "bob").await;
    let config = Config::test_default();

    let token_data = decode::<RefreshClaims>(
        &session.refresh_token,
        &DecodingKey::from_secret(&config.refresh_token_secret),
        &Validation::new(Algorithm::HS256),
    )
    .expect("Failed to decode refresh token");

    let claims = token_data.claims;
    assert_eq!(claims.sub, session.user_id);
    assert_eq!(claims.jti.len(), 32);
    assert_eq!(
        (claims.exp - claims.iat) as i64,
        config.refresh_token_ttl_secs
    );
}

#[tokio::test]
async fn test_tokens_use_separate_keys() {
    let (app, _, _) = common::create_test_app();
    let session = common::register_and_login(&app, "carol").await;
    let config = Config::test_default();

    let wrong_key = decode::<AccessClaims>(
        &session.access_token,
        &DecodingKey::from_secret(&config.refresh_token_secret),
        &Validation::new(Algorithm::HS256),
    );
    assert!(wrong_key.is_err());

    let header = jsonwebtoken::decode_header(&session.refresh_token).unwrap();
    assert_eq!(header.alg, Algorithm::HS256);
}
