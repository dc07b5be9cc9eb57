// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media host client (Cloudinary) for avatar and cover image uploads.
//!
//! `upload` takes a staged local file and always removes it before
//! returning, whether the upload succeeded or not. Failures are logged and
//! reported as `None`; callers decide whether a missing URL is fatal.

use crate::config::CloudinaryConfig;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Base URL handed out in mock mode.
pub const MOCK_MEDIA_BASE: &str = "https://media.mock.invalid";

/// Upload result returned by the media host.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UploadedMedia {
    /// HTTPS delivery URL
    #[serde(rename = "secure_url")]
    pub url: String,
    pub public_id: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Media upload service.
#[derive(Clone)]
pub struct MediaService {
    http: reqwest::Client,
    /// `None` runs in mock mode
    credentials: Option<CloudinaryConfig>,
}

impl MediaService {
    pub fn new(credentials: CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials: Some(credentials),
        }
    }

    /// Mock service for tests and local development.
    ///
    /// Any non-empty file "uploads" to a synthetic URL under
    /// `MOCK_MEDIA_BASE`; empty or unreadable files fail.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials: None,
        }
    }

    /// Upload a local file and remove it afterwards.
    pub async fn upload(&self, local_path: &Path) -> Option<UploadedMedia> {
        let result = match &self.credentials {
            Some(credentials) => self.upload_to_cloudinary(credentials, local_path).await,
            None => mock_upload(local_path).await,
        };

        if let Err(e) = tokio::fs::remove_file(local_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %local_path.display(), error = %e, "Failed to remove staged file");
            }
        }

        match result {
            Ok(media) => {
                tracing::info!(public_id = %media.public_id, bytes = media.bytes, "Media uploaded");
                Some(media)
            }
            Err(e) => {
                tracing::warn!(path = %local_path.display(), error = %e, "Media upload failed");
                None
            }
        }
    }

    async fn upload_to_cloudinary(
        &self,
        credentials: &CloudinaryConfig,
        local_path: &Path,
    ) -> anyhow::Result<UploadedMedia> {
        let contents = tokio::fs::read(local_path).await?;
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let signature = sign_params(&[("timestamp", timestamp.to_string())], &credentials.api_secret);

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(contents).file_name(file_name),
            )
            .text("api_key", credentials.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let url = format!(
            "{}/{}/auto/upload",
            CLOUDINARY_API_BASE, credentials.cloud_name
        );

        let response = self.http.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Cloudinary HTTP {}: {}", status, body);
        }

        Ok(response.json::<UploadedMedia>().await?)
    }
}

/// Cloudinary request signature: params sorted by name, joined as
/// `k=v&k=v`, secret appended, SHA-256 hex.
fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

async fn mock_upload(local_path: &Path) -> anyhow::Result<UploadedMedia> {
    let metadata = tokio::fs::metadata(local_path).await?;
    if metadata.len() == 0 {
        anyhow::bail!("empty file");
    }

    let name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let format = local_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string);

    Ok(UploadedMedia {
        url: format!("{}/{}", MOCK_MEDIA_BASE, name),
        public_id: name.to_string(),
        resource_type: "image".to_string(),
        bytes: metadata.len(),
        format,
        width: None,
        height: None,
    })
}
