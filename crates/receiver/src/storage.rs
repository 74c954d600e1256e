//! Destination layout and the commit-or-discard staging guard.
//!
//! Files land at `storageRoot/<identity>/<relativeName>`. The identity is
//! always the first path segment, so no two identities can collide, and
//! both segments are validated before any path is joined.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use dropgate_transfer::{TransferError, validate_relative_path};

/// Maps `(identity, relativeName)` to an absolute destination path.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves the destination path for one upload.
    ///
    /// The identity must be a single safe path component and the name a
    /// valid relative path; either failing is an invalid-argument
    /// condition for the session.
    pub fn dest_path(&self, identity: &str, name: &str) -> Result<PathBuf, TransferError> {
        validate_identity(identity)?;
        validate_relative_path(name)?;
        Ok(self.root.join(identity).join(name))
    }
}

/// The certificate CN becomes a directory name; it must stay one level.
fn validate_identity(identity: &str) -> Result<(), TransferError> {
    if identity.is_empty()
        || identity == "."
        || identity == ".."
        || identity.contains('/')
        || identity.contains('\\')
    {
        return Err(TransferError::InvalidPath(format!(
            "identity is not a safe path segment: {identity:?}"
        )));
    }
    Ok(())
}

/// Destination file that deletes itself unless committed.
///
/// The session streams chunks into the file as they arrive; the only way
/// to keep the bytes is [`commit`](Self::commit). Every other exit path,
/// including an implicit drop on error, removes the partial file.
pub struct StagingFile {
    path: PathBuf,
    file: File,
    finalized: bool,
}

impl StagingFile {
    /// Opens the destination truncate-create, creating parent directories.
    pub async fn create(path: PathBuf) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            file,
            finalized: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one chunk's bytes.
    pub async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.write_all(bytes).await
    }

    /// Keeps the file. Flushes and syncs so the acknowledgement the
    /// sender deletes its copy on is backed by durable bytes.
    pub async fn commit(mut self) -> std::io::Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        self.finalized = true;
        Ok(())
    }

    /// Deletes the partial file.
    pub async fn discard(mut self) {
        self.finalized = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), "failed to remove discarded file: {e}");
        }
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if !self.finalized {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
