// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and channel routes for authenticated users.

use crate::db::UserChange;
use crate::error::{invalid_fields, AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::user::normalize_identity;
use crate::models::{OwnerSummary, User, UserResponse, WatchedVideo};
use crate::response::ApiResponse;
use crate::routes::uploads::MultipartForm;
use crate::services::password;
use crate::AppState;
use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, State},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use futures_util::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_CONCURRENT_OWNER_LOOKUPS: usize = 10;

/// User routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/change-password", post(change_password))
        .route("/current-user", get(get_current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar))
        .route("/coverImage", patch(update_cover_image))
        .route("/c/{username}", get(get_channel_profile))
        .route("/history", get(get_watch_history))
}

/// Load the principal's record. A valid token for a vanished user is
/// treated like a bad token.
async fn load_principal(state: &AppState, auth: &AuthUser) -> Result<User> {
    state.db.get_user(&auth.user_id).await?.ok_or_else(vanished_principal)
}

fn vanished_principal() -> AppError {
    AppError::Unauthorized("Invalid access token".to_string())
}

/// Write only the fields `change` owns.
async fn write_change(state: &AppState, auth: &AuthUser, change: UserChange) -> Result<User> {
    state
        .db
        .apply_user_change(&auth.user_id, &change)
        .await?
        .ok_or_else(vanished_principal)
}

// ─── Current User ────────────────────────────────────────────

async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<UserResponse>> {
    let user = load_principal(&state, &auth).await?;
    Ok(ApiResponse::ok(
        UserResponse::from(&user),
        "User fetched successfully",
    ))
}

// ─── Password ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<ApiResponse<serde_json::Value>> {
    let Json(request) = body?;

    let missing: Vec<String> = [
        ("oldPassword", &request.old_password),
        ("newPassword", &request.new_password),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name.to_string())
    .collect();
    if !missing.is_empty() {
        return Err(AppError::validation("All fields are required", missing));
    }

    let user = load_principal(&state, &auth).await?;

    if !password::verify_password(&request.old_password, &user.password_hash).await? {
        return Err(AppError::BadRequest("Invalid old password".to_string()));
    }

    let hash = password::hash_password(&request.new_password).await?;
    write_change(&state, &auth, UserChange::PasswordHash(hash)).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

// ─── Account Details ─────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    full_name: String,
    #[serde(default)]
    #[validate(email)]
    email: String,
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let Json(mut request) = body?;
    request.full_name = request.full_name.trim().to_string();
    request.email = normalize_identity(&request.email);

    let missing: Vec<String> = [
        ("fullName", &request.full_name),
        ("email", &request.email),
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
        .map_err(|e| invalid_fields("Invalid account details", e))?;

    let current = load_principal(&state, &auth).await?;

    let user = state
        .db
        .update_account_details(
            &current.id,
            &current.email,
            &request.full_name,
            &request.email,
        )
        .await?
        .ok_or_else(vanished_principal)?;

    Ok(ApiResponse::ok(
        UserResponse::from(&user),
        "Account details updated successfully",
    ))
}

// ─── Images ──────────────────────────────────────────────────

/// Which profile image an upload replaces.
#[derive(Debug, Clone, Copy)]
enum ProfileImage {
    Avatar,
    Cover,
}

impl ProfileImage {
    fn field(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "avatar",
            ProfileImage::Cover => "coverImage",
        }
    }

    fn label(self) -> &'static str {
        match self {
            ProfileImage::Avatar => "Avatar",
            ProfileImage::Cover => "Cover image",
        }
    }
}

async fn replace_profile_image(
    state: &AppState,
    auth: &AuthUser,
    multipart: Multipart,
    kind: ProfileImage,
) -> Result<UserResponse> {
    let mut form =
        MultipartForm::read(multipart, &state.config.upload_temp_dir, &[kind.field()]).await?;

    let file = form
        .take_file(kind.field())
        .ok_or_else(|| AppError::BadRequest(format!("{} file is missing", kind.label())))?;

    let uploaded = state.media.upload(file.path()).await.ok_or_else(|| {
        AppError::BadRequest(format!(
            "Error while uploading {}",
            kind.label().to_lowercase()
        ))
    })?;

    let change = match kind {
        ProfileImage::Avatar => UserChange::Avatar(uploaded.url),
        ProfileImage::Cover => UserChange::CoverImage(uploaded.url),
    };
    let user = write_change(state, auth, change).await?;

    tracing::info!(user_id = %user.id, image = kind.field(), "Profile image replaced");

    Ok(UserResponse::from(&user))
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let user = replace_profile_image(&state, &auth, multipart?, ProfileImage::Avatar).await?;
    Ok(ApiResponse::ok(user, "Avatar image updated successfully"))
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<UserResponse>> {
    let user = replace_profile_image(&state, &auth, multipart?, ProfileImage::Cover).await?;
    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

// ─── Channel Profile ─────────────────────────────────────────

/// Public channel view with subscription counts.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelProfile {
    pub id: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscribers_count: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub channels_subscribed_to_count: u64,
    pub is_subscribed: bool,
}

async fn get_channel_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(username): Path<String>,
) -> Result<ApiResponse<ChannelProfile>> {
    let username = normalize_identity(&username);
    if username.is_empty() {
        return Err(AppError::BadRequest("username is missing".to_string()));
    }

    let channel = state
        .db
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))?;

    let (subscribers_count, channels_subscribed_to_count, is_subscribed) = tokio::try_join!(
        state.db.count_subscribers(&channel.id),
        state.db.count_subscriptions(&channel.id),
        state.db.is_subscribed(&auth.user_id, &channel.id),
    )?;

    Ok(ApiResponse::ok(
        ChannelProfile {
            id: channel.id,
            full_name: channel.full_name,
            username: channel.username,
            email: channel.email,
            avatar: channel.avatar,
            cover_image: channel.cover_image,
            subscribers_count,
            channels_subscribed_to_count,
            is_subscribed,
        },
        "User channel fetched successfully",
    ))
}

// ─── Watch History ───────────────────────────────────────────

async fn get_watch_history(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<WatchedVideo>>> {
    let user = load_principal(&state, &auth).await?;
    let videos = state.db.get_videos(&user.watch_history).await?;

    let owner_ids: HashSet<String> = videos.iter().map(|v| v.owner.clone()).collect();
    let owners: HashMap<String, OwnerSummary> = stream::iter(owner_ids)
        .map(|owner_id| {
            let db = &state.db;
            async move {
                let owner = db.get_user(&owner_id).await?;
                Ok::<_, AppError>(owner.map(|o| {
                    (
                        owner_id,
                        OwnerSummary {
                            full_name: o.full_name,
                            username: o.username,
                            avatar: o.avatar,
                        },
                    )
                }))
            }
        })
        .buffer_unordered(MAX_CONCURRENT_OWNER_LOOKUPS)
        .try_filter_map(|entry| async move { Ok(entry) })
        .try_collect()
        .await?;

    let history = videos
        .into_iter()
        .map(|video| {
            let owner = owners.get(&video.owner).cloned();
            WatchedVideo::new(video, owner)
        })
        .collect();

    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
