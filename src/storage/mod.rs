//! Pluggable file storage for bulk upload inputs.
//!
//! Schedules reference an already-uploaded input file; the [`FileStore`]
//! trait covers the presign and existence checks the lifecycle needs.
//! Object keys are built here so every backend shares the same layout.

mod memory_store;

pub use memory_store::MemoryFileStore;

use std::sync::LazyLock;

use async_trait::async_trait;
use jiff::Timestamp;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::ScheduleScope;

/// Seconds a presigned upload URL stays valid.
pub const UPLOAD_URL_EXPIRY_SECS: u64 = 900;
/// Seconds a presigned download URL stays valid.
pub const DOWNLOAD_URL_EXPIRY_SECS: u64 = 300;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9._-]").unwrap());
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

/// Replaces characters unsafe for object keys and collapses the
/// underscore runs that replacement produces.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name, "_");
    UNDERSCORE_RUNS.replace_all(&replaced, "_").into_owned()
}

/// Builds the object key for a new upload, namespaced by scope so
/// tenants never collide:
/// `{app}/{brand}/{platform}/bulk_uploads/{timestamp}_{uuid}_{file}`.
pub fn upload_key(scope: &ScheduleScope, file_name: &str, now: Timestamp) -> String {
    format!(
        "{}/{}/{}/bulk_uploads/{}_{}_{}",
        scope.app_id,
        scope.brand_id,
        scope.platform_id,
        now.as_millisecond(),
        Uuid::new_v4(),
        sanitize_file_name(file_name),
    )
}

/// Presigned PUT destination handed to a client for upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadTarget {
    pub key: String,
    pub url: String,
    pub expires_in_secs: u64,
}

/// Presigned GET link for a stored file.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadHandle {
    pub key: String,
    pub url: String,
    pub expires_in_secs: u64,
}

/// Storage backend abstraction (S3-compatible in production).
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Whether an object exists under `key`.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Presigns a PUT for `key`, valid for [`UPLOAD_URL_EXPIRY_SECS`].
    async fn presigned_put_url(&self, key: &str) -> AppResult<UploadTarget>;

    /// Presigns a GET for `key`, valid for [`DOWNLOAD_URL_EXPIRY_SECS`].
    async fn presigned_get_url(&self, key: &str) -> AppResult<DownloadHandle>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_file_name("weekly report (v2).csv"), "weekly_report_v2_.csv");
        assert_eq!(sanitize_file_name("plain-name_1.csv"), "plain-name_1.csv");
    }

    #[test]
    fn sanitize_collapses_underscore_runs() {
        assert_eq!(sanitize_file_name("a  &  b.csv"), "a_b.csv");
        assert_eq!(sanitize_file_name("x___y.csv"), "x_y.csv");
    }

    #[test]
    fn upload_key_is_scoped_and_sanitized() {
        let scope = ScheduleScope {
            app_id: Uuid::new_v4(),
            brand_id: Uuid::new_v4(),
            platform_id: Uuid::new_v4(),
        };
        let now = Timestamp::UNIX_EPOCH;
        let key = upload_key(&scope, "my file.csv", now);

        assert!(key.starts_with(&format!(
            "{}/{}/{}/bulk_uploads/0_",
            scope.app_id, scope.brand_id, scope.platform_id
        )));
        assert!(key.ends_with("_my_file.csv"));
    }
}
