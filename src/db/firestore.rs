// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile, password hash, refresh token)
//! - Unique claims (`usernames/{value}`, `emails/{value}`)
//! - Videos and subscriptions (read-only)

use crate::db::{collections, UserChange, DUPLICATE_USER_MESSAGE};
use crate::error::AppError;
use crate::models::{Subscription, UniqueClaim, User, Video};
use firestore::errors::FirestoreError;
use futures_util::{stream, StreamExt, TryStreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 20;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

/// Claim documents are keyed by the value itself; emails contain `@` and `.`.
fn claim_id(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Document fields written for each kind of change.
fn change_paths(change: &UserChange) -> Vec<String> {
    match change {
        UserChange::PasswordHash(_) => firestore::paths!(User::{password_hash, updated_at}),
        UserChange::AccountDetails { .. } => {
            firestore::paths!(User::{full_name, email, updated_at})
        }
        UserChange::Avatar(_) => firestore::paths!(User::{avatar, updated_at}),
        UserChange::CoverImage(_) => firestore::paths!(User::{cover_image, updated_at}),
        UserChange::RefreshToken(_) => firestore::paths!(User::{refresh_token, updated_at}),
    }
}

fn db_error(e: FirestoreError) -> AppError {
    AppError::Database(e.to_string())
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(db_error)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_by_claim(collections::USERNAMES, username).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_by_claim(collections::EMAILS, email).await
    }

    async fn find_by_claim(&self, collection: &str, value: &str) -> Result<Option<User>, AppError> {
        let claim: Option<UniqueClaim> = self
            .client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(&claim_id(value))
            .await
            .map_err(db_error)?;

        match claim {
            Some(claim) => self.get_user(&claim.user_id).await,
            None => Ok(None),
        }
    }

    /// Create a user after claiming its username and email.
    ///
    /// Claims use create-only inserts, so of two concurrent registrations
    /// for the same value exactly one succeeds. Claims taken by a failed
    /// attempt are released before returning.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.insert_claim(collections::USERNAMES, &user.username, &user.id)
            .await?;

        if let Err(e) = self
            .insert_claim(collections::EMAILS, &user.email, &user.id)
            .await
        {
            self.release_claim(collections::USERNAMES, &user.username)
                .await;
            return Err(e);
        }

        let inserted: Result<User, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await;

        if let Err(e) = inserted {
            self.release_claim(collections::USERNAMES, &user.username)
                .await;
            self.release_claim(collections::EMAILS, &user.email).await;
            return Err(db_error(e));
        }

        tracing::debug!(user_id = %user.id, "User document created");
        Ok(())
    }

    /// Masked write of the fields owned by `change` plus `updated_at`;
    /// other fields are left as stored even if a concurrent request
    /// changed them.
    pub async fn apply_user_change(
        &self,
        user_id: &str,
        change: &UserChange,
    ) -> Result<Option<User>, AppError> {
        let Some(mut user) = self.get_user(user_id).await? else {
            return Ok(None);
        };
        change.apply(&mut user);

        let stored: User = self
            .client
            .fluent()
            .update()
            .fields(change_paths(change))
            .in_col(collections::USERS)
            .document_id(user_id)
            .object(&user)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(Some(stored))
    }

    pub async fn claim_email(&self, user_id: &str, email: &str) -> Result<(), AppError> {
        self.insert_claim(collections::EMAILS, email, user_id).await
    }

    pub async fn release_email(&self, email: &str) {
        self.release_claim(collections::EMAILS, email).await
    }

    async fn insert_claim(&self, collection: &str, value: &str, user_id: &str) -> Result<(), AppError> {
        let claim = UniqueClaim {
            user_id: user_id.to_string(),
        };

        let result: Result<UniqueClaim, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(claim_id(value))
            .object(&claim)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(FirestoreError::DataConflictError(_)) => {
                Err(AppError::Conflict(DUPLICATE_USER_MESSAGE.to_string()))
            }
            Err(e) => Err(db_error(e)),
        }
    }

    /// Best-effort delete; a leftover claim only blocks reuse of the value.
    async fn release_claim(&self, collection: &str, value: &str) {
        if let Err(e) = self
            .client
            .fluent()
            .delete()
            .from(collection)
            .document_id(claim_id(value))
            .execute()
            .await
        {
            tracing::error!(collection, error = %e, "Failed to release unique claim");
        }
    }

    // ─── Video / Subscription Operations ─────────────────────────

    pub async fn get_videos(&self, video_ids: &[String]) -> Result<Vec<Video>, AppError> {
        let videos: Vec<Option<Video>> = stream::iter(video_ids.iter().cloned())
            .map(|id| async move {
                self.client
                    .fluent()
                    .select()
                    .by_id_in(collections::VIDEOS)
                    .obj::<Video>()
                    .one(&id)
                    .await
                    .map_err(db_error)
            })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .try_collect()
            .await?;

        Ok(videos.into_iter().flatten().collect())
    }

    pub async fn count_subscribers(&self, channel_id: &str) -> Result<u64, AppError> {
        self.count_subscriptions_where("channel", channel_id).await
    }

    pub async fn count_subscriptions(&self, subscriber_id: &str) -> Result<u64, AppError> {
        self.count_subscriptions_where("subscriber", subscriber_id)
            .await
    }

    async fn count_subscriptions_where(&self, field: &str, value: &str) -> Result<u64, AppError> {
        let field = field.to_string();
        let value = value.to_string();
        let subscriptions: Vec<Subscription> = self
            .client
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(move |q| q.for_all([q.field(field.clone()).eq(value.clone())]))
            .obj()
            .query()
            .await
            .map_err(db_error)?;
        Ok(subscriptions.len() as u64)
    }

    pub async fn is_subscribed(
        &self,
        subscriber_id: &str,
        channel_id: &str,
    ) -> Result<bool, AppError> {
        let subscription: Option<Subscription> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::SUBSCRIPTIONS)
            .obj()
            .one(&Subscription::document_id(subscriber_id, channel_id))
            .await
            .map_err(db_error)?;
        Ok(subscription.is_some())
    }

    // ─── Seeding (integration tests) ─────────────────────────────

    pub async fn insert_video(&self, video: &Video) -> Result<(), AppError> {
        let _: Video = self
            .client
            .fluent()
            .update()
            .in_col(collections::VIDEOS)
            .document_id(&video.id)
            .object(video)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn insert_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        let _: Subscription = self
            .client
            .fluent()
            .update()
            .in_col(collections::SUBSCRIPTIONS)
            .document_id(Subscription::document_id(
                &subscription.subscriber,
                &subscription.channel,
            ))
            .object(subscription)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
