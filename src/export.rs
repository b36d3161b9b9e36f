//! Saving a finished result to a local file.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Url;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::consts::{EXPORT_PREFIX, now_ms};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export yet, apply an effect first")]
    NoResult,
    #[error("invalid export format: {0:?}")]
    InvalidFormat(String),
    #[error("cannot export from {0}: not a local file")]
    InvalidLocator(String),
    #[error("download failed with status {status}: {url}")]
    Http { status: u16, url: String },
    #[error("download failed: {0}")]
    Network(String),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Normalize a format like `PNG` to `png`. Only short alphanumeric
/// extensions are accepted.
pub fn validate_format(format: &str) -> Result<String, ExportError> {
    let format = format.trim().trim_start_matches('.').to_ascii_lowercase();
    if format.is_empty() || format.len() > 8 || !format.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ExportError::InvalidFormat(format));
    }
    Ok(format)
}

/// `pixora-<millis>.<format>`
pub fn export_filename(format: &str, millis: u64) -> String {
    format!("{EXPORT_PREFIX}-{millis}.{format}")
}

/// Save the resource at `result` into `dir`. Remote results are streamed
/// to disk; `file://` URLs and plain paths are copied. Returns the path
/// written. A partial file is removed if the download breaks off.
pub async fn export(result: &str, format: &str, dir: &Path) -> Result<PathBuf, ExportError> {
    let format = validate_format(format)?;
    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(export_filename(&format, now_ms()));

    match Url::parse(result) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            if let Err(e) = download(url, &target).await {
                let _ = tokio::fs::remove_file(&target).await;
                return Err(e);
            }
        }
        Ok(url) if url.scheme() == "file" => {
            let source = url
                .to_file_path()
                .map_err(|_| ExportError::InvalidLocator(result.to_string()))?;
            tokio::fs::copy(&source, &target).await?;
        }
        _ => {
            tokio::fs::copy(result, &target).await?;
        }
    }

    info!(path = %target.display(), "exported result");
    Ok(target)
}

async fn download(url: Url, target: &Path) -> Result<(), ExportError> {
    debug!(%url, "downloading result");
    let resp = reqwest::get(url.clone())
        .await
        .map_err(|e| ExportError::Network(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(ExportError::Http {
            status: resp.status().as_u16(),
            url: url.to_string(),
        });
    }

    let mut file = tokio::fs::File::create(target).await?;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ExportError::Network(e.to_string()))?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}
