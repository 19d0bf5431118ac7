//! Read-only access to proof artifacts and verification keys

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use wormhole_common::Result;

/// File name of the verification key, next to the proof artifact
pub const VERIFICATION_KEY_FILE: &str = "vk";

/// Source of proof and verification-key blobs
#[async_trait]
pub trait ArtifactReader: Send + Sync {
    /// Read an artifact. `Ok(None)` means it does not exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Whether an artifact exists at `path`
    async fn exists(&self, path: &Path) -> Result<bool>;
}

/// Location of the verification key belonging to a proof artifact
pub fn verification_key_path(proof_path: &Path) -> PathBuf {
    proof_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(VERIFICATION_KEY_FILE)
}

/// Artifacts on the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FsArtifactReader;

impl FsArtifactReader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactReader for FsArtifactReader {
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }
}
