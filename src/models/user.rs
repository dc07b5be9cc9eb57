// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User record stored in Firestore (`users/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Random 24-hex identifier (also used as document ID)
    pub id: String,
    /// Unique, lowercase
    pub username: String,
    /// Unique, lowercase
    pub email: String,
    pub full_name: String,
    /// Argon2 PHC string, never the plaintext
    pub password_hash: String,
    /// Avatar URL on the media host
    pub avatar: String,
    /// Cover image URL, empty when not set
    #[serde(default)]
    pub cover_image: String,
    /// Watched video IDs, oldest first
    #[serde(default)]
    pub watch_history: Vec<String>,
    /// The single refresh token currently accepted for this user
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Public view of a user: everything except the secret and the refresh token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            watch_history: user.watch_history.clone(),
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}

/// Reservation of a unique username or email (`usernames/{value}`, `emails/{value}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueClaim {
    pub user_id: String,
}

/// Usernames and emails are matched case-insensitively.
pub fn normalize_identity(value: &str) -> String {
    value.trim().to_lowercase()
}
