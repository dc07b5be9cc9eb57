// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is read first when present, so local development only needs
//! the token secrets set there.

use std::env;
use std::path::PathBuf;

const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 24 * 60 * 60; // 1 day
const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 10 * 24 * 60 * 60; // 10 days
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which document store backs the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// Google Cloud Firestore (or its emulator when `FIRESTORE_EMULATOR_HOST` is set)
    Firestore { project_id: String },
    /// Process-local store; data is lost on restart
    Memory,
}

/// Cloudinary credentials for signed uploads.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    pub database: DatabaseBackend,

    /// HS256 key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    pub access_token_ttl_secs: i64,
    /// HS256 key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    pub refresh_token_ttl_secs: i64,

    /// `None` means uploads run in mock mode
    pub cloudinary: Option<CloudinaryConfig>,
    /// Where multipart files are staged before upload
    pub upload_temp_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Config for tests: in-memory store, mock uploads, fixed secrets.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            database: DatabaseBackend::Memory,
            access_token_secret: b"test_access_key_32_bytes_minimum!".to_vec(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            cloudinary: None,
            upload_temp_dir: env::temp_dir().join("vidtube-test-uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let database = match env::var("DATABASE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "firestore" => DatabaseBackend::Firestore {
                project_id: env::var("GCP_PROJECT_ID")
                    .unwrap_or_else(|_| "local-dev".to_string()),
            },
            "memory" => DatabaseBackend::Memory,
            other => {
                return Err(ConfigError::Invalid(
                    "DATABASE_BACKEND",
                    format!("unknown backend '{}'", other),
                ))
            }
        };

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            database,

            access_token_secret: required_secret("ACCESS_TOKEN_SECRET")?,
            access_token_ttl_secs: parse_or("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?,
            refresh_token_secret: required_secret("REFRESH_TOKEN_SECRET")?,
            refresh_token_ttl_secs: parse_or(
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            )?,

            cloudinary: cloudinary_from_env()?,
            upload_temp_dir: env::var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./public/temp")),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn required_secret(name: &'static str) -> Result<Vec<u8>, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.as_bytes().to_vec())
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// All three Cloudinary variables or none of them.
fn cloudinary_from_env() -> Result<Option<CloudinaryConfig>, ConfigError> {
    let cloud_name = env::var("CLOUDINARY_CLOUD_NAME").ok();
    let api_key = env::var("CLOUDINARY_API_KEY").ok();
    let api_secret = env::var("CLOUDINARY_API_SECRET").ok();

    match (cloud_name, api_key, api_secret) {
        (Some(cloud_name), Some(api_key), Some(api_secret)) => Ok(Some(CloudinaryConfig {
            cloud_name: cloud_name.trim().to_string(),
            api_key: api_key.trim().to_string(),
            api_secret: api_secret.trim().to_string(),
        })),
        (None, None, None) => Ok(None),
        (None, _, _) => Err(ConfigError::Missing("CLOUDINARY_CLOUD_NAME")),
        (_, None, _) => Err(ConfigError::Missing("CLOUDINARY_API_KEY")),
        (_, _, None) => Err(ConfigError::Missing("CLOUDINARY_API_SECRET")),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
