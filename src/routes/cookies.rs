// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookies carrying the access and refresh tokens.

use crate::services::TokenPair;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Creation and removal must share attributes or browsers keep the old cookie.
fn session_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Add both session cookies for a freshly minted pair.
pub fn with_session_cookies(
    jar: CookieJar,
    tokens: &TokenPair,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.clone(),
        access_ttl_secs,
    ))
    .add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        tokens.refresh_token.clone(),
        refresh_ttl_secs,
    ))
}

/// Expire both session cookies.
pub fn without_session_cookies(jar: CookieJar) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, String::new(), 0))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, String::new(), 0))
}
