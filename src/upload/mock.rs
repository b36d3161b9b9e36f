use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{UploadError, Uploader};

/// An uploader for tests that answers the same way every time.
pub struct MockUploader {
    outcome: Result<String, UploadError>,
    calls: AtomicUsize,
}

impl MockUploader {
    pub fn succeeding(url: impl Into<String>) -> Self {
        Self {
            outcome: Ok(url.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: UploadError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Uploader for MockUploader {
    async fn upload(&self, _path: &Path) -> Result<String, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
