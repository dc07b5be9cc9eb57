// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! VidTube API Server
//!
//! User registration, JWT sessions, and profile images for a
//! video-sharing backend.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidtube::{config::Config, db::Database, services::MediaService, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting VidTube API");

    let db = Database::connect(&config.database).await?;

    let media = match &config.cloudinary {
        Some(credentials) => {
            tracing::info!(cloud = %credentials.cloud_name, "Cloudinary uploads enabled");
            MediaService::new(credentials.clone())
        }
        None => {
            tracing::warn!("Cloudinary not configured; uploads run in mock mode");
            MediaService::new_mock()
        }
    };

    tokio::fs::create_dir_all(&config.upload_temp_dir).await?;

    let port = config.port;
    let state = Arc::new(AppState::new(config, db, media));

    // Build router
    let app = vidtube::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vidtube=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
