// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod user;
pub mod video;

pub use user::{UniqueClaim, User, UserResponse};
pub use video::{OwnerSummary, Subscription, Video, WatchedVideo};
