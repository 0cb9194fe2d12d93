//! Artifact storage for rendered invoice documents.

use aargon_core::error::AppError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::instrument;
use uuid::Uuid;

/// Where rendered documents live. Names derive from the invoice number; a
/// write never replaces an already committed artifact, so a name collision
/// surfaces as `Conflict` instead of destroying another invoice's document.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` under `name` and return the stable path to hand to the
    /// invoice record. The artifact must not be observable under its final
    /// path until the write is complete, and an existing artifact under
    /// `name` must stay untouched (`Conflict`).
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<String, AppError>;

    async fn exists(&self, path: &str) -> bool;

    /// `NotFound` when the metadata points at a payload that is gone.
    async fn read(&self, path: &str) -> Result<Vec<u8>, AppError>;

    /// Compensating cleanup for a failed create. Accepts either a path
    /// returned by `write` or a bare artifact name.
    async fn remove(&self, path: &str) -> Result<(), AppError>;
}

/// Filesystem store. Writes go to a randomly named staging file in the same
/// directory and are committed by a link that refuses to replace, so a crash
/// mid-write leaves no partial file under the final name and a concurrent
/// writer cannot clobber a committed artifact.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| AppError::StorageFailure(anyhow::anyhow!("create artifact dir: {}", e)))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths stored on invoice rows are absolute; bare artifact names (used
    /// for cleanup when the full path is unknown) resolve against the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    #[instrument(skip(self, bytes), fields(name = %name, len = bytes.len()))]
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<String, AppError> {
        let final_path = self.root.join(name);
        let staging_path = self
            .root
            .join(format!(".{}.staging", Uuid::new_v4().simple()));

        tokio::fs::write(&staging_path, bytes)
            .await
            .map_err(|e| AppError::StorageFailure(anyhow::anyhow!("artifact write: {}", e)))?;

        // Link-then-unlink commits atomically without replacing: if the final
        // name is already committed, the existing artifact stays untouched.
        let link = tokio::fs::hard_link(&staging_path, &final_path).await;
        let _ = tokio::fs::remove_file(&staging_path).await;
        match link {
            Ok(()) => Ok(final_path.to_string_lossy().into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(AppError::Conflict(
                anyhow::anyhow!("artifact {} already exists", name),
            )),
            Err(e) => Err(AppError::StorageFailure(anyhow::anyhow!(
                "artifact commit: {}",
                e
            ))),
        }
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.resolve(path))
            .await
            .unwrap_or(false)
    }

    #[instrument(skip(self))]
    async fn read(&self, path: &str) -> Result<Vec<u8>, AppError> {
        match tokio::fs::read(self.resolve(path)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(
                anyhow::anyhow!("artifact missing from storage: {}", path),
            )),
            Err(e) => Err(AppError::StorageFailure(anyhow::anyhow!(
                "artifact read: {}",
                e
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn remove(&self, path: &str) -> Result<(), AppError> {
        match tokio::fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageFailure(anyhow::anyhow!(
                "artifact remove: {}",
                e
            ))),
        }
    }
}
