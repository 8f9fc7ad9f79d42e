/// Disk-based blob storage backend
use crate::{
    blob_store::{BlobRef, BlobStore},
    error::{AppError, AppResult},
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores blobs on the local filesystem, content-addressed by SHA-256 and
/// sharded by digest prefix to keep directories small.
#[derive(Clone)]
pub struct DiskBlobStore {
    base_path: PathBuf,
    /// Base URL the blob directory is served under
    public_base_url: String,
}

impl DiskBlobStore {
    pub fn new(base_path: PathBuf, public_base_url: String) -> Self {
        Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Shard layout: {base}/{first2}/{digest}{ext}
    fn blob_path(&self, name: &str) -> PathBuf {
        let shard = &name[0..2];
        self.base_path.join(shard).join(name)
    }

    fn blob_url(&self, name: &str) -> String {
        format!("{}/media/{}/{}", self.public_base_url, &name[0..2], name)
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn upload(&self, local_path: &Path) -> AppResult<BlobRef> {
        let data = fs::read(local_path).await.map_err(|e| {
            AppError::BlobStorage(format!(
                "Failed to read upload {}: {}",
                local_path.display(),
                e
            ))
        })?;

        let digest = hex::encode(Sha256::digest(&data));
        let ext = local_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default();
        let name = format!("{}{}", digest, ext);

        let blob_path = self.blob_path(&name);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::BlobStorage(format!("Failed to create blob directory: {}", e))
            })?;
        }

        fs::write(&blob_path, data)
            .await
            .map_err(|e| AppError::BlobStorage(format!("Failed to write blob {}: {}", name, e)))?;

        // Uploads are one-shot; the caller deletes its temp file
        tracing::debug!("Stored blob {}", name);

        Ok(BlobRef {
            url: self.blob_url(&name),
        })
    }
}
