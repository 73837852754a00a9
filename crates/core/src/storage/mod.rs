//! Object storage abstraction for uploaded documents.
//!
//! The handlers only ever talk to [`FileStorage`]; the real deployment puts
//! an object store behind it. [`LocalFileStorage`] keeps files under an
//! upload root on disk so the server runs and tests stay hermetic.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Descriptor of a stored upload, as exposed by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUpload {
    /// Original file name supplied by the client.
    pub file_name: String,
    /// Storage location or local path of the stored object.
    pub file_path: String,
    /// MIME type reported by the upload.
    pub content_type: String,
    /// Storage key used for later deletion; absent when the backend does
    /// not key objects.
    pub storage_key: Option<String>,
}

/// Per-key failure detail from a batch deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedDeletion {
    pub key: String,
    pub error: String,
}

/// Outcome of a batch deletion. Deletion never fails as a whole; callers
/// inspect the failed list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub successful: Vec<String>,
    pub failed: Vec<FailedDeletion>,
}

impl DeleteOutcome {
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }
}

/// Contract for storing and deleting uploaded files.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores one uploaded file and returns its descriptor.
    async fn save(
        &self,
        field_name: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<StoredUpload>;

    /// Deletes a batch of objects by storage key, best effort.
    async fn delete_many(&self, keys: &[String]) -> DeleteOutcome;
}

/// Disk-backed [`FileStorage`] rooted at a configurable directory.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

/// Strips path separators so a client-supplied name cannot escape the root.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(
        &self,
        field_name: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<StoredUpload> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let key = format!(
            "{}_{}_{}",
            stamp,
            uuid::Uuid::new_v4(),
            sanitize_file_name(file_name)
        );
        let path = self.object_path(&key);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::Storage(format!("create upload root: {}", e)))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::Storage(format!("write upload {}: {}", key, e)))?;

        log::debug!(
            "Stored upload for field '{}': {} ({} bytes)",
            field_name,
            key,
            data.len()
        );

        Ok(StoredUpload {
            file_name: file_name.to_string(),
            file_path: path.to_string_lossy().to_string(),
            content_type: content_type.to_string(),
            storage_key: Some(key),
        })
    }

    async fn delete_many(&self, keys: &[String]) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        for key in keys {
            // Keys are generated server-side, but never follow one that
            // points outside the root.
            if Path::new(key).components().count() != 1 {
                outcome.failed.push(FailedDeletion {
                    key: key.clone(),
                    error: "invalid storage key".to_string(),
                });
                continue;
            }
            match tokio::fs::remove_file(self.object_path(key)).await {
                Ok(()) => outcome.successful.push(key.clone()),
                Err(e) => outcome.failed.push(FailedDeletion {
                    key: key.clone(),
                    error: e.to_string(),
                }),
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_then_delete_round_trip() {
        let tmp = tempdir().unwrap();
        let storage = LocalFileStorage::new(tmp.path());

        let stored = storage
            .save("file", "invoice.pdf", "application/pdf", b"pdf-bytes")
            .await
            .unwrap();
        let key = stored.storage_key.clone().unwrap();
        assert!(tmp.path().join(&key).exists());
        assert_eq!(stored.file_name, "invoice.pdf");
        assert_eq!(stored.content_type, "application/pdf");

        let outcome = storage.delete_many(&[key.clone()]).await;
        assert_eq!(outcome.successful, vec![key]);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn delete_reports_missing_keys_as_failed() {
        let tmp = tempdir().unwrap();
        let storage = LocalFileStorage::new(tmp.path());

        let outcome = storage.delete_many(&["does-not-exist".to_string()]).await;
        assert!(outcome.successful.is_empty());
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].key, "does-not-exist");
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let tmp = tempdir().unwrap();
        let storage = LocalFileStorage::new(tmp.path());

        let outcome = storage.delete_many(&["../escape".to_string()]).await;
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].error, "invalid storage key");
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("a/b\\c.pdf"), "a_b_c.pdf");
        assert_eq!(sanitize_file_name(""), "unnamed");
    }
}
