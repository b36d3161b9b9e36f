use std::path::Path;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::StatusCode;
use reqwest::multipart::Form;
use serde::Deserialize;
use tracing::{debug, info};

use super::{UploadAuth, UploadError, Uploader};
use crate::consts::UPLOAD_FOLDER;

/// Uploads through ImageKit: fetch signed credentials from the auth
/// endpoint, then post the file to the upload API.
pub struct ImageKitUploader {
    client: reqwest::Client,
    auth_url: String,
    upload_url: String,
    folder: String,
}

impl ImageKitUploader {
    pub fn new(auth_url: impl Into<String>, upload_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth_url: auth_url.into(),
            upload_url: upload_url.into(),
            folder: UPLOAD_FOLDER.to_string(),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Ask the auth endpoint for one-time upload credentials.
    pub async fn fetch_auth(&self) -> Result<UploadAuth, UploadError> {
        let resp = self
            .client
            .get(&self.auth_url)
            .send()
            .await
            .map_err(|e| UploadError::Auth(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(UploadError::Auth(format!("status {}", resp.status())));
        }

        resp.json::<UploadAuth>()
            .await
            .map_err(|e| UploadError::Auth(format!("malformed response: {e}")))
    }
}

#[async_trait]
impl Uploader for ImageKitUploader {
    async fn upload(&self, path: &Path) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| UploadError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let auth = self.fetch_auth().await?;
        debug!(file = %file_name, bytes = bytes.len(), "uploading image");

        let form = Form::new()
            .text("file", STANDARD.encode(&bytes))
            .text("fileName", file_name.clone())
            .text("folder", self.folder.clone())
            .text("publicKey", auth.public_key)
            .text("signature", auth.signature)
            .text("expire", auth.expire.to_string())
            .text("token", auth.token);

        let resp = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify(status, text));
        }

        let body: UploadResponse = resp
            .json()
            .await
            .map_err(|e| UploadError::Server(format!("unreadable upload response: {e}")))?;

        let url = body
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| UploadError::Server("upload response has no url".to_string()))?;
        info!(file = %file_name, %url, "image uploaded");
        Ok(url)
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

/// Map a non-success upload status onto an error category.
fn classify(status: StatusCode, body: String) -> UploadError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    if status.is_server_error() {
        UploadError::Server(detail)
    } else {
        UploadError::InvalidRequest(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_invalid_requests() {
        let err = classify(StatusCode::BAD_REQUEST, "missing file".to_string());
        assert_eq!(
            err,
            UploadError::InvalidRequest("400 Bad Request: missing file".to_string())
        );
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, String::new()),
            UploadError::InvalidRequest(_)
        ));
    }

    #[test]
    fn server_errors_are_server_errors() {
        let err = classify(StatusCode::BAD_GATEWAY, String::new());
        assert_eq!(err, UploadError::Server("502 Bad Gateway".to_string()));
    }

    #[test]
    fn default_folder() {
        let uploader = ImageKitUploader::new("http://a", "http://b");
        assert_eq!(uploader.folder, UPLOAD_FOLDER);
        let uploader = uploader.with_folder("elsewhere");
        assert_eq!(uploader.folder, "elsewhere");
    }

    #[tokio::test]
    async fn unreachable_auth_endpoint_is_auth_error() {
        let uploader = ImageKitUploader::new("http://127.0.0.1:1/api/upload-auth", "http://b");
        let err = uploader.fetch_auth().await.unwrap_err();
        assert!(matches!(err, UploadError::Auth(_)));
    }
}
