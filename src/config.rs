//! Project directory layout and the remote/local folder pairing used by sync.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// The fixed directory layout of a project, derived from its root.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub entrypoint_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub models_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub notebooks_dir: PathBuf,
}

impl Layout {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let data_dir = root.join("data");
        Self {
            raw_dir: data_dir.join("raw"),
            entrypoint_dir: data_dir.join("entrypoint"),
            cache_dir: data_dir.join(".localcache"),
            models_dir: data_dir.join("models"),
            reports_dir: root.join("reports"),
            notebooks_dir: root.join("notebooks"),
            data_dir,
            root,
        }
    }

    pub fn trace_loaded(&self) {
        info!(root = %self.root.display(), "Resolved project layout");
        debug!(?self, "Project layout (full debug)");
    }

    /// The three syncable roles, each pairing a remote folder path with its
    /// local directory. Only the sync layer consumes these.
    pub fn sync_folders(&self, project_name: &str) -> SyncFolders {
        SyncFolders {
            root: FolderPair {
                remote: format!("/{project_name}"),
                local: self.data_dir.clone(),
            },
            raw: FolderPair {
                remote: format!("/{project_name}/raw"),
                local: self.raw_dir.clone(),
            },
            models: FolderPair {
                remote: format!("/{project_name}/models"),
                local: self.models_dir.clone(),
            },
        }
    }
}

/// A remote folder path and the local directory it mirrors.
#[derive(Debug, Clone)]
pub struct FolderPair {
    pub remote: String,
    pub local: PathBuf,
}

/// One of the three syncable subfolder roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRole {
    Root,
    Raw,
    Models,
}

/// The folder triple consumed by the sync operations.
#[derive(Debug, Clone)]
pub struct SyncFolders {
    pub root: FolderPair,
    pub raw: FolderPair,
    pub models: FolderPair,
}

impl SyncFolders {
    pub fn get(&self, role: SyncRole) -> &FolderPair {
        match role {
            SyncRole::Root => &self.root,
            SyncRole::Raw => &self.raw,
            SyncRole::Models => &self.models,
        }
    }
}

/// Fallback project name: the root directory's basename.
pub fn default_project_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "project".to_string())
}
