//! In-memory file store used in tests and embedded setups.

use async_trait::async_trait;
use dashmap::DashSet;

use crate::error::AppResult;
use crate::storage::{
    DOWNLOAD_URL_EXPIRY_SECS, DownloadHandle, FileStore, UPLOAD_URL_EXPIRY_SECS, UploadTarget,
};

/// Tracks uploaded keys in a set; "URLs" are memory:// pseudo-links.
#[derive(Default)]
pub struct MemoryFileStore {
    objects: DashSet<String>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a key as uploaded, as a real client PUT would.
    pub fn put(&self, key: &str) {
        self.objects.insert(key.to_string());
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.objects.contains(key))
    }

    async fn presigned_put_url(&self, key: &str) -> AppResult<UploadTarget> {
        Ok(UploadTarget {
            key: key.to_string(),
            url: format!("memory://put/{key}"),
            expires_in_secs: UPLOAD_URL_EXPIRY_SECS,
        })
    }

    async fn presigned_get_url(&self, key: &str) -> AppResult<DownloadHandle> {
        Ok(DownloadHandle {
            key: key.to_string(),
            url: format!("memory://get/{key}"),
            expires_in_secs: DOWNLOAD_URL_EXPIRY_SECS,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
