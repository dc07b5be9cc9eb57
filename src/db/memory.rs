// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store backed by `DashMap`.
//!
//! Mirrors the Firestore layout (users, unique claims, videos,
//! subscriptions) so handlers behave the same against either backend.

use crate::db::{UserChange, DUPLICATE_USER_MESSAGE};
use crate::error::AppError;
use crate::models::{Subscription, User, Video};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

#[derive(Default)]
struct Collections {
    users: DashMap<String, User>,
    /// username -> user id
    usernames: DashMap<String, String>,
    /// email -> user id
    emails: DashMap<String, String>,
    videos: DashMap<String, Video>,
    /// `{subscriber}_{channel}` -> subscription
    subscriptions: DashMap<String, Subscription>,
}

/// In-memory database. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Collections>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.inner.users.get(user_id).map(|u| u.clone())
    }

    pub fn find_user_by_username(&self, username: &str) -> Option<User> {
        let user_id = self.inner.usernames.get(username)?.clone();
        self.get_user(&user_id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let user_id = self.inner.emails.get(email)?.clone();
        self.get_user(&user_id)
    }

    pub fn create_user(&self, user: &User) -> Result<(), AppError> {
        // Each entry() holds the shard lock, so only one racer wins a claim.
        match self.inner.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => return Err(AppError::Conflict(DUPLICATE_USER_MESSAGE.into())),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        match self.inner.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                self.inner.usernames.remove(&user.username);
                return Err(AppError::Conflict(DUPLICATE_USER_MESSAGE.into()));
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        self.inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    /// Apply `change` under the entry lock and return the updated record.
    pub fn apply_user_change(&self, user_id: &str, change: &UserChange) -> Option<User> {
        let mut user = self.inner.users.get_mut(user_id)?;
        change.apply(&mut user);
        Some(user.clone())
    }

    pub fn claim_email(&self, user_id: &str, email: &str) -> Result<(), AppError> {
        match self.inner.emails.entry(email.to_string()) {
            Entry::Occupied(_) => Err(AppError::Conflict(DUPLICATE_USER_MESSAGE.into())),
            Entry::Vacant(slot) => {
                slot.insert(user_id.to_string());
                Ok(())
            }
        }
    }

    /// Release `email` only if `user_id` holds it.
    pub fn release_email(&self, user_id: &str, email: &str) {
        self.inner
            .emails
            .remove_if(email, |_, owner| owner == user_id);
    }

    pub fn get_videos(&self, video_ids: &[String]) -> Vec<Video> {
        video_ids
            .iter()
            .filter_map(|id| self.inner.videos.get(id).map(|v| v.clone()))
            .collect()
    }

    pub fn count_subscribers(&self, channel_id: &str) -> u64 {
        self.inner
            .subscriptions
            .iter()
            .filter(|s| s.channel == channel_id)
            .count() as u64
    }

    pub fn count_subscriptions(&self, subscriber_id: &str) -> u64 {
        self.inner
            .subscriptions
            .iter()
            .filter(|s| s.subscriber == subscriber_id)
            .count() as u64
    }

    pub fn is_subscribed(&self, subscriber_id: &str, channel_id: &str) -> bool {
        self.inner
            .subscriptions
            .contains_key(&Subscription::document_id(subscriber_id, channel_id))
    }

    // ─── Seeding (videos and subscriptions have no write endpoints) ───

    pub fn insert_video(&self, video: Video) {
        self.inner.videos.insert(video.id.clone(), video);
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        let id = Subscription::document_id(&subscription.subscriber, &subscription.channel);
        self.inner.subscriptions.insert(id, subscription);
    }

    pub fn set_watch_history(&self, user_id: &str, video_ids: Vec<String>) {
        if let Some(mut user) = self.inner.users.get_mut(user_id) {
            user.watch_history = video_ids;
        }
    }

    /// Drop a user document but keep its claims, as a half-failed write would.
    #[cfg(test)]
    pub(crate) fn remove_user_document(&self, user_id: &str) {
        self.inner.users.remove(user_id);
    }
}
