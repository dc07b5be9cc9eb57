// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Video and subscription records. This service only reads them.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored video record (`videos/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub id: String,
    /// Media host URL of the video file
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Length in seconds
    pub duration: f64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub is_published: bool,
    /// User ID of the uploader
    pub owner: String,
    pub created_at: String,
    pub updated_at: String,
}

/// `subscriber` follows `channel` (`subscriptions/{subscriber}_{channel}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub subscriber: String,
    pub channel: String,
    pub created_at: String,
}

impl Subscription {
    pub fn document_id(subscriber: &str, channel: &str) -> String {
        format!("{}_{}", subscriber, channel)
    }
}

/// Owner fields embedded in watch-history entries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OwnerSummary {
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

/// A watched video with its owner resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WatchedVideo {
    pub id: String,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    pub duration: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub views: u64,
    pub is_published: bool,
    pub owner: Option<OwnerSummary>,
    pub created_at: String,
}

impl WatchedVideo {
    pub fn new(video: Video, owner: Option<OwnerSummary>) -> Self {
        Self {
            id: video.id,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            owner,
            created_at: video.created_at,
        }
    }
}
