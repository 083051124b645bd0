//! Contract for the remote blob store holding the project's data folders.
//!
//! The pipeline stages never touch this trait; it exists for the CLI-level
//! push/pull/flush commands. Implement [`BlobStore`] to target a concrete
//! storage API (see [`crate::dropbox::DropboxStore`]) or use the generated
//! mock in tests.
//!
//! The trait is annotated for `mockall` so consumers can generate
//! deterministic mocks; all methods are async and return boxed errors, which
//! keeps implementors free to surface their transport's own error types.

use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::BoxError;

/// What a listed remote entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEntryKind {
    File,
    Folder,
}

/// One entry in a remote folder listing.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    pub kind: RemoteEntryKind,
    /// Full remote path of the entry.
    pub path: String,
    /// Size in bytes; folders have none.
    pub size: Option<u64>,
}

/// Key-value blob store with folder listings, as the sync layer sees it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// List the entries under a remote folder, optionally recursively.
    async fn list_folder(
        &self,
        remote_folder: &str,
        recursive: bool,
    ) -> Result<Vec<RemoteEntry>, BoxError>;

    /// Upload one local file to the given remote path, overwriting.
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), BoxError>;

    /// Download one remote file to the given local path.
    async fn download(&self, remote_path: &str, local_path: &Path) -> Result<(), BoxError>;

    /// Delete a remote file or folder (recursively).
    async fn delete(&self, remote_path: &str) -> Result<(), BoxError>;
}
