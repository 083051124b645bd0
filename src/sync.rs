//! Push / pull / flush orchestration between the local data tree and the
//! remote blob store.
//!
//! Works against any [`BlobStore`]; the CLI wires in the concrete client.
//! Each operation is fail-fast and returns a report of what it transferred,
//! for display and for downstream audit.

use std::fs;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{SyncFolders, SyncRole};
use crate::error::LoomError;
use crate::pathutils;
use crate::remote::{BlobStore, RemoteEntryKind};

#[derive(Debug, Default)]
pub struct PushReport {
    /// Remote paths written, in upload order.
    pub uploaded: Vec<String>,
}

#[derive(Debug, Default)]
pub struct PullReport {
    pub folders_created: Vec<PathBuf>,
    pub downloaded: Vec<PathBuf>,
}

/// Upload the local data root into the remote project folder, skipping the
/// excluded subfolder names (by default the cache and the reproducible
/// entrypoint folder).
pub async fn push<S>(
    store: &S,
    folders: &SyncFolders,
    excludes: &[String],
) -> Result<PushReport, LoomError>
where
    S: BlobStore,
{
    let local_root = &folders.root.local;
    info!(root = %local_root.display(), "Pushing data folder to remote");

    let mut report = PushReport::default();
    let walker = WalkDir::new(local_root).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.file_type().is_dir() && excludes.iter().any(|ex| ex.as_str() == name))
    });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match entry.path().strip_prefix(local_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let remote_path = format!("{}/{}", folders.root.remote, join_slash(rel));
        store
            .upload(entry.path(), &remote_path)
            .await
            .map_err(LoomError::Remote)?;
        report.uploaded.push(remote_path);
    }

    info!(count = report.uploaded.len(), "Push complete");
    Ok(report)
}

/// Download everything under the remote project folder into the local data
/// root, recreating the remote folder structure.
pub async fn pull<S>(store: &S, folders: &SyncFolders) -> Result<PullReport, LoomError>
where
    S: BlobStore,
{
    let local_root = &folders.root.local;
    info!(root = %folders.root.remote, "Pulling data folder from remote");

    let entries = store
        .list_folder(&folders.root.remote, true)
        .await
        .map_err(LoomError::Remote)?;

    let mut report = PullReport::default();
    for entry in entries {
        let rel = match entry.path.strip_prefix(&folders.root.remote) {
            Some(rel) => rel.trim_start_matches('/'),
            None => {
                warn!(path = %entry.path, "Remote entry outside the project root, skipping");
                continue;
            }
        };
        if rel.is_empty() {
            continue;
        }
        let local_path = local_root.join(rel);
        match entry.kind {
            RemoteEntryKind::Folder => {
                debug!(path = %local_path.display(), "Creating folder");
                fs::create_dir_all(&local_path)?;
                report.folders_created.push(local_path);
            }
            RemoteEntryKind::File => {
                pathutils::ensure_parent_dir(&local_path)?;
                store
                    .download(&entry.path, &local_path)
                    .await
                    .map_err(LoomError::Remote)?;
                report.downloaded.push(local_path);
            }
        }
    }

    info!(
        folders = report.folders_created.len(),
        files = report.downloaded.len(),
        "Pull complete"
    );
    Ok(report)
}

/// Delete every entry directly under the remote folder for the given role.
/// Returns the deleted remote paths.
pub async fn flush<S>(
    store: &S,
    folders: &SyncFolders,
    role: SyncRole,
) -> Result<Vec<String>, LoomError>
where
    S: BlobStore,
{
    let pair = folders.get(role);
    info!(folder = %pair.remote, "Flushing remote folder");

    let entries = store
        .list_folder(&pair.remote, false)
        .await
        .map_err(LoomError::Remote)?;

    let deletions = entries.iter().map(|entry| store.delete(&entry.path));
    try_join_all(deletions).await.map_err(LoomError::Remote)?;

    let deleted: Vec<String> = entries.into_iter().map(|e| e.path).collect();
    info!(count = deleted.len(), "Remote folder flushed");
    Ok(deleted)
}

fn join_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
