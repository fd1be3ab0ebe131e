//! Image uploads
//!
//! Files are checked against the MIME allowlist and the size cap, then
//! written to the upload directory under a random name. The extension is
//! taken from the MIME type, never from the client's file name.

use crate::config::UploadConfig;
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

/// URL prefix the upload directory is served under
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type: {0}")]
    InvalidType(String),

    #[error("File too large. Maximum size: {max} bytes")]
    TooLarge { max: u64 },

    #[error("Empty file")]
    Empty,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A stored file
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredUpload {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

pub struct UploadService {
    config: UploadConfig,
}

impl UploadService {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    pub fn upload_dir(&self) -> &PathBuf {
        &self.config.path
    }

    /// Whether `content_type` is on the allowlist
    pub fn accepts(&self, content_type: &str) -> bool {
        self.config.is_type_allowed(content_type)
    }

    /// Check type and size without touching the disk
    pub fn validate(&self, content_type: &str, size: u64) -> Result<(), UploadError> {
        if !self.accepts(content_type) {
            return Err(UploadError::InvalidType(content_type.to_string()));
        }
        if size == 0 {
            return Err(UploadError::Empty);
        }
        if size > self.config.max_file_size {
            return Err(UploadError::TooLarge {
                max: self.config.max_file_size,
            });
        }
        Ok(())
    }

    pub async fn store(&self, content_type: &str, data: &[u8]) -> Result<StoredUpload, UploadError> {
        self.validate(content_type, data.len() as u64)?;

        let content_type = content_type.trim().to_lowercase();
        let filename = format!("{}.{}", Uuid::new_v4(), self.config.extension_for(&content_type));

        fs::create_dir_all(&self.config.path)
            .await
            .with_context(|| format!("Failed to create upload dir {}", self.config.path.display()))?;
        fs::write(self.config.path.join(&filename), data)
            .await
            .context("Failed to save file")?;

        tracing::info!(file = %filename, size = data.len(), "Stored upload");

        Ok(StoredUpload {
            url: format!("{}/{}", UPLOAD_URL_PREFIX, filename),
            filename,
            size: data.len() as u64,
            content_type,
        })
    }
}
