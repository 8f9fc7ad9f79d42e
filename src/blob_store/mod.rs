/// Blob storage
///
/// Stores uploaded media (avatars, cover images) and hands back the URL the
/// blob is served from. The service core only depends on the trait; the
/// disk backend is the default deployment.

pub mod disk;

pub use disk::DiskBlobStore;

use crate::error::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A stored blob, addressed by the URL it is served from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobRef {
    pub url: String,
}

/// Blob storage backend trait
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload a local file and return its public URL
    async fn upload(&self, local_path: &Path) -> AppResult<BlobRef>;
}
