// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration, login, logout, and refresh-token routes.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::{generate_id, DUPLICATE_USER_MESSAGE};
use crate::error::{invalid_fields, AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::user::normalize_identity;
use crate::models::{User, UserResponse};
use crate::response::ApiResponse;
use crate::routes::cookies::{with_session_cookies, without_session_cookies, REFRESH_TOKEN_COOKIE};
use crate::routes::uploads::MultipartForm;
use crate::services::{password, TokenPair};
use crate::time_utils::now_rfc3339;
use crate::AppState;

/// Public auth routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_access_token))
}

/// Auth routes that need a principal; the guard is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/logout", post(logout))
}

// ─── Register ────────────────────────────────────────────────

#[derive(Debug, Validate)]
struct RegisterRequest {
    full_name: String,
    #[validate(email)]
    email: String,
    username: String,
    password: String,
}

/// Create an account from a multipart form with a mandatory avatar.
async fn register(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let mut form = MultipartForm::read(
        multipart?,
        &state.config.upload_temp_dir,
        &["avatar", "coverImage"],
    )
    .await?;

    let request = RegisterRequest {
        full_name: form.text("fullName").trim().to_string(),
        email: normalize_identity(form.text("email")),
        username: normalize_identity(form.text("username")),
        password: form.text("password").to_string(),
    };

    let missing: Vec<String> = [
        ("fullName", request.full_name.as_str()),
        ("email", request.email.as_str()),
        ("username", request.username.as_str()),
        ("password", request.password.trim()),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name.to_string())
    .collect();

    if !missing.is_empty() {
        return Err(AppError::validation("All fields are required", missing));
    }

    request
        .validate()
        .map_err(|e| invalid_fields("Invalid email address", e))?;

    if state.db.find_user_by_username(&request.username).await?.is_some()
        || state.db.find_user_by_email(&request.email).await?.is_some()
    {
        return Err(AppError::Conflict(DUPLICATE_USER_MESSAGE.to_string()));
    }

    let avatar_file = form
        .take_file("avatar")
        .ok_or_else(|| AppError::BadRequest("Avatar file is required".to_string()))?;
    let cover_file = form.take_file("coverImage");

    let avatar = state
        .media
        .upload(avatar_file.path())
        .await
        .ok_or_else(|| AppError::BadRequest("Avatar file is required".to_string()))?;

    let cover_image = match cover_file {
        Some(file) => state
            .media
            .upload(file.path())
            .await
            .map(|media| media.url)
            .unwrap_or_default(),
        None => String::new(),
    };

    let password_hash = password::hash_password(&request.password).await?;
    let now = now_rfc3339();

    let user = User {
        id: generate_id()?,
        username: request.username,
        email: request.email,
        full_name: request.full_name,
        password_hash,
        avatar: avatar.url,
        cover_image,
        watch_history: Vec::new(),
        refresh_token: None,
        created_at: now.clone(),
        updated_at: now,
    };

    state.db.create_user(&user).await?;

    let created = state.db.get_user(&user.id).await?.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "User {} missing right after registration",
            user.id
        ))
    })?;

    tracing::info!(user_id = %created.id, username = %created.username, "User registered");

    Ok(ApiResponse::created(
        UserResponse::from(&created),
        "User registered successfully",
    ))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: String,
}

/// Login response body; the same tokens are also set as cookies.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let Json(request) = body?;

    let username = request
        .username
        .as_deref()
        .map(normalize_identity)
        .filter(|u| !u.is_empty());
    let email = request
        .email
        .as_deref()
        .map(normalize_identity)
        .filter(|e| !e.is_empty());

    if username.is_none() && email.is_none() {
        return Err(AppError::BadRequest(
            "username or email is required".to_string(),
        ));
    }

    let mut user = None;
    if let Some(username) = &username {
        user = state.db.find_user_by_username(username).await?;
    }
    if user.is_none() {
        if let Some(email) = &email {
            user = state.db.find_user_by_email(email).await?;
        }
    }
    let user = user.ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if !password::verify_password(&request.password, &user.password_hash).await? {
        tracing::info!(user_id = %user.id, "Login rejected: bad password");
        return Err(AppError::Unauthorized(
            "Invalid user credentials".to_string(),
        ));
    }

    let tokens = issue_and_store_tokens(&state, &user).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    let jar = with_session_cookies(
        CookieJar::new(),
        &tokens,
        state.tokens.access_ttl_secs(),
        state.tokens.refresh_ttl_secs(),
    );

    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user: UserResponse::from(&user),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Mint a pair and make its refresh token the only one accepted for `user`.
async fn issue_and_store_tokens(state: &AppState, user: &User) -> Result<TokenPair> {
    let tokens = state
        .tokens
        .issue_pair(user)
        .map_err(|e| AppError::Internal(e.context("Token creation failed")))?;

    state
        .db
        .set_refresh_token(&user.id, Some(&tokens.refresh_token))
        .await?;

    Ok(tokens)
}

// ─── Logout ──────────────────────────────────────────────────

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>)> {
    state.db.set_refresh_token(&auth.user_id, None).await?;

    tracing::info!(user_id = %auth.user_id, "User logged out");

    Ok((
        without_session_cookies(CookieJar::new()),
        ApiResponse::ok(serde_json::json!({}), "User logged out"),
    ))
}

// ─── Refresh ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// New token pair, returned in the body and as cookies.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh token from the cookie, else from a JSON body.
fn presented_refresh_token(jar: &CookieJar, body: &Bytes) -> Result<Option<String>> {
    if let Some(cookie) = jar.get(REFRESH_TOKEN_COOKIE) {
        if !cookie.value().is_empty() {
            return Ok(Some(cookie.value().to_string()));
        }
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let request: RefreshRequest = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    Ok(request
        .refresh_token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty()))
}

/// Exchange a refresh token for a new pair (rotation on use).
async fn refresh_access_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenResponse>)> {
    let presented = presented_refresh_token(&jar, &body)?
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    let claims = state
        .tokens
        .verify_refresh_token(&presented)
        .map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            AppError::Unauthorized("Invalid refresh token".to_string())
        })?;

    let user = state
        .db
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let matches_stored = user
        .refresh_token
        .as_deref()
        .map(|stored| bool::from(stored.as_bytes().ct_eq(presented.as_bytes())))
        .unwrap_or(false);

    if !matches_stored {
        tracing::warn!(user_id = %user.id, "Superseded or revoked refresh token presented");
        return Err(AppError::Unauthorized(
            "Refresh token is expired or used".to_string(),
        ));
    }

    let tokens = issue_and_store_tokens(&state, &user).await?;

    tracing::info!(user_id = %user.id, "Access token refreshed");

    let jar = with_session_cookies(
        CookieJar::new(),
        &tokens,
        state.tokens.access_ttl_secs(),
        state.tokens.refresh_ttl_secs(),
    );

    Ok((
        jar,
        ApiResponse::ok(
            TokenResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "Access token refreshed",
        ),
    ))
}
