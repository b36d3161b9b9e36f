//! Getting a local image onto the CDN.

pub mod imagekit;
pub mod mock;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::consts::MAX_UPLOAD_BYTES;

/// File extensions accepted as images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "avif"];

/// Signed credentials for a single upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadAuth {
    pub token: String,
    pub expire: u64,
    pub signature: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// Why an upload failed. The first three are caught before any request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("not an image file: {}", .0.display())]
    NotAnImage(PathBuf),
    #[error("{} is too large ({size} bytes, limit is 10 MB)", .path.display())]
    TooLarge { path: PathBuf, size: u64 },
    #[error("failed to read {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },
    #[error("failed to get upload auth params: {0}")]
    Auth(String),
    #[error("invalid upload request: {0}")]
    InvalidRequest(String),
    #[error("image server error: {0}")]
    Server(String),
    #[error("network error during upload: {0}")]
    Network(String),
}

impl UploadError {
    /// Rejected locally, without talking to any server.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            UploadError::NotAnImage(_) | UploadError::TooLarge { .. } | UploadError::Read { .. }
        )
    }
}

/// Something that can host a local image and hand back its URL.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<String, UploadError>;
}

/// Check that `path` looks like an image and fits the size limit.
/// Returns the file size.
pub async fn check_image(path: &Path) -> Result<u64, UploadError> {
    let is_image = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if !is_image {
        return Err(UploadError::NotAnImage(path.to_path_buf()));
    }

    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| UploadError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    if !meta.is_file() {
        return Err(UploadError::NotAnImage(path.to_path_buf()));
    }
    if meta.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
        });
    }
    Ok(meta.len())
}
