// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, or an in-process store for tests and local dev).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::config::DatabaseBackend;
use crate::error::AppError;
use crate::models::{User, Video};
use crate::time_utils::now_rfc3339;
use ring::rand::{SecureRandom, SystemRandom};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Unique-claim documents keyed by username
    pub const USERNAMES: &str = "usernames";
    /// Unique-claim documents keyed by email
    pub const EMAILS: &str = "emails";
    pub const VIDEOS: &str = "videos";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
}

/// Message returned when a username or email is already claimed.
pub const DUPLICATE_USER_MESSAGE: &str = "User with email or username already exists";

/// Generate a random 24-hex document ID.
pub fn generate_id() -> Result<String, AppError> {
    let mut bytes = [0u8; 12];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG unavailable")))?;
    Ok(hex::encode(bytes))
}

/// A write to one user document. Each variant owns a fixed set of fields
/// and is stored with `updated_at` only, so concurrent changes to other
/// fields (a logout clearing the refresh token, say) are never overwritten.
#[derive(Debug, Clone, PartialEq)]
pub enum UserChange {
    PasswordHash(String),
    AccountDetails { full_name: String, email: String },
    Avatar(String),
    CoverImage(String),
    RefreshToken(Option<String>),
}

impl UserChange {
    /// Apply the change to a loaded record and stamp `updated_at`.
    pub fn apply(&self, user: &mut User) {
        match self {
            UserChange::PasswordHash(hash) => user.password_hash = hash.clone(),
            UserChange::AccountDetails { full_name, email } => {
                user.full_name = full_name.clone();
                user.email = email.clone();
            }
            UserChange::Avatar(url) => user.avatar = url.clone(),
            UserChange::CoverImage(url) => user.cover_image = url.clone(),
            UserChange::RefreshToken(token) => user.refresh_token = token.clone(),
        }
        user.updated_at = now_rfc3339();
    }
}

/// Document store used by the handlers.
///
/// Both backends enforce username/email uniqueness with create-only claims,
/// so a lost registration race surfaces as `AppError::Conflict`.
#[derive(Clone)]
pub enum Database {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

impl Database {
    /// Connect to the backend selected in configuration.
    pub async fn connect(backend: &DatabaseBackend) -> Result<Self, AppError> {
        match backend {
            DatabaseBackend::Firestore { project_id } => {
                Ok(Database::Firestore(FirestoreDb::new(project_id).await?))
            }
            DatabaseBackend::Memory => {
                tracing::warn!("Using in-memory database; data will not survive a restart");
                Ok(Database::Memory(MemoryDb::new()))
            }
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match self {
            Database::Firestore(db) => db.get_user(user_id).await,
            Database::Memory(db) => Ok(db.get_user(user_id)),
        }
    }

    /// Look up a user by (normalized) username.
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        match self {
            Database::Firestore(db) => db.find_user_by_username(username).await,
            Database::Memory(db) => Ok(db.find_user_by_username(username)),
        }
    }

    /// Look up a user by (normalized) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match self {
            Database::Firestore(db) => db.find_user_by_email(email).await,
            Database::Memory(db) => Ok(db.find_user_by_email(email)),
        }
    }

    /// Insert a new user. The password must already be hashed.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match self {
            Database::Firestore(db) => db.create_user(user).await,
            Database::Memory(db) => db.create_user(user),
        }
    }

    /// Write `change` to the user's document and return the stored record,
    /// or `None` if the user does not exist.
    pub async fn apply_user_change(
        &self,
        user_id: &str,
        change: &UserChange,
    ) -> Result<Option<User>, AppError> {
        match self {
            Database::Firestore(db) => db.apply_user_change(user_id, change).await,
            Database::Memory(db) => Ok(db.apply_user_change(user_id, change)),
        }
    }

    /// Update name and email, moving the email claim when it changes.
    ///
    /// The new email is claimed before the document write. If the write
    /// fails (or the user is gone) the new claim is released and the old
    /// one is kept; the old claim is released only after a successful write.
    pub async fn update_account_details(
        &self,
        user_id: &str,
        old_email: &str,
        full_name: &str,
        new_email: &str,
    ) -> Result<Option<User>, AppError> {
        let email_changed = old_email != new_email;
        if email_changed {
            self.claim_email(user_id, new_email).await?;
        }

        let change = UserChange::AccountDetails {
            full_name: full_name.to_string(),
            email: new_email.to_string(),
        };
        let result = self.apply_user_change(user_id, &change).await;

        if email_changed {
            match &result {
                Ok(Some(_)) => self.release_email(user_id, old_email).await,
                _ => {
                    tracing::warn!(user_id, "Account update failed; releasing new email claim");
                    self.release_email(user_id, new_email).await;
                }
            }
        }
        result
    }

    /// Set or clear the stored refresh token, touching nothing else.
    pub async fn set_refresh_token(
        &self,
        user_id: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        let change = UserChange::RefreshToken(refresh_token.map(str::to_string));
        self.apply_user_change(user_id, &change)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn claim_email(&self, user_id: &str, email: &str) -> Result<(), AppError> {
        match self {
            Database::Firestore(db) => db.claim_email(user_id, email).await,
            Database::Memory(db) => db.claim_email(user_id, email),
        }
    }

    async fn release_email(&self, user_id: &str, email: &str) {
        match self {
            Database::Firestore(db) => db.release_email(email).await,
            Database::Memory(db) => db.release_email(user_id, email),
        }
    }

    /// Fetch videos in the given order; missing IDs are skipped.
    pub async fn get_videos(&self, video_ids: &[String]) -> Result<Vec<Video>, AppError> {
        match self {
            Database::Firestore(db) => db.get_videos(video_ids).await,
            Database::Memory(db) => Ok(db.get_videos(video_ids)),
        }
    }

    pub async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError> {
        match self {
            Database::Firestore(db) => db.count_subscribers(channel_id).await,
            Database::Memory(db) => Ok(db.count_subscribers(channel_id)),
        }
    }

    pub async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError> {
        match self {
            Database::Firestore(db) => db.count_subscriptions(subscriber_id).await,
            Database::Memory(db) => Ok(db.count_subscriptions(subscriber_id)),
        }
    }

    pub async fn is_subscribed(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, AppError> {
        match self {
            Database::Firestore(db) => db.is_subscribed(subscriber_id, channel_id).await,
            Database::Memory(db) => Ok(db.is_subscribed(subscriber_id, channel_id)),
        }
    }
}
