// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Multipart form parsing with files staged on local disk.
//!
//! Files are written to the upload temp directory so the media service can
//! stream them from a path. A `StagedFile` deletes its file when dropped, so
//! early returns (validation failures, conflicts) never leave files behind.

use crate::db::generate_id;
use crate::error::{AppError, Result};
use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const MAX_FILE_NAME_LEN: usize = 64;

/// A file written to the temp directory, removed on drop.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        // Usually already gone: MediaService::upload removes what it consumed.
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged file");
            }
        }
    }
}

/// Text fields and staged files of one multipart request.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, StagedFile>,
}

impl MultipartForm {
    /// Read the whole body. Only fields named in `file_fields` are staged;
    /// other file parts are drained and dropped. Empty file parts count as
    /// absent.
    pub async fn read(
        mut multipart: Multipart,
        temp_dir: &Path,
        file_fields: &[&str],
    ) -> Result<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if file_fields.contains(&name.as_str()) {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                let staged = stage(temp_dir, &original_name, &bytes).await?;
                form.files.insert(name, staged);
            } else if field.file_name().is_some() {
                let _ = field.bytes().await?;
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Raw text field value; empty when absent.
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }
}

async fn stage(temp_dir: &Path, original_name: &str, bytes: &[u8]) -> Result<StagedFile> {
    tokio::fs::create_dir_all(temp_dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create temp dir: {}", e)))?;

    let path = temp_dir.join(format!(
        "{}-{}",
        generate_id()?,
        sanitize_file_name(original_name)
    ));
    // Construct the guard first so a failed write still cleans up.
    let staged = StagedFile { path };

    tokio::fs::write(&staged.path, bytes)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {}", e)))?;

    tracing::debug!(path = %staged.path.display(), bytes = bytes.len(), "Upload staged");
    Ok(staged)
}

/// Keep the client-supplied name recognizable but path-safe.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .take(MAX_FILE_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("avatar.png"), "avatar.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pic 1.jpg"), "pic1.jpg");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[tokio::test]
    async fn test_staged_file_removed_on_drop() {
        let dir = std::env::temp_dir().join("vidtube-stage-tests");
        let staged = stage(&dir, "a.png", b"data").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert!(path.starts_with(&dir));

        drop(staged);
        assert!(!path.exists());
    }
}
