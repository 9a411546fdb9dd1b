//! Filesystem object store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::issue::Attachment;
use crate::store::{validate_object_path, ObjectStore, StoreError, StoredObject};

/// Stores attachments as files under `root/bucket/`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    bucket: String,
    base_url: String,
    max_upload_bytes: u64,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`, serving objects from `base_url`.
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        bucket: impl Into<String>,
        base_url: impl Into<String>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_upload_bytes,
        }
    }

    /// Directory holding the bucket's objects.
    #[must_use]
    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    /// File path of the object at `path`.
    #[must_use]
    pub fn object_file(&self, path: &str) -> PathBuf {
        path.split('/')
            .fold(self.bucket_dir(), |dir, segment| dir.join(segment))
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn upload(
        &self,
        path: &str,
        attachment: &Attachment,
    ) -> std::result::Result<StoredObject, StoreError> {
        validate_object_path(path)?;
        let size = attachment.len() as u64;
        if size > self.max_upload_bytes {
            return Err(StoreError::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        let file = self.object_file(path);
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, attachment.bytes()).await?;

        debug!("Stored {} bytes at {}", size, file.display());
        Ok(StoredObject {
            path: path.to_string(),
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.bucket, path)
    }
}
