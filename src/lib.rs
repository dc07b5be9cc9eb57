// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! VidTube: user accounts backend for a video-sharing site
//!
//! Registration with avatar upload, password login with access/refresh
//! JWTs, token rotation, and profile management over a document store.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{MediaService, TokenService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub media: MediaService,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(config: Config, db: Database, media: MediaService) -> Self {
        let tokens = TokenService::new(&config);
        Self {
            config,
            db,
            media,
            tokens,
        }
    }
}
