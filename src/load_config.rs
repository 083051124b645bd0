//! Loads project settings: an optional static `dataloom.yaml` (no secrets)
//! merged with environment variables loaded from `.env` via dotenvy.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{default_project_name, Layout};

pub const CONFIG_FILE: &str = "dataloom.yaml";
pub const ACCESS_TOKEN_VAR: &str = "DROPBOX_ACCESS_TOKEN";

/// Local subfolders never pushed to the remote store: the entrypoint is
/// always reproducible from raw, and the cache is machine-local.
pub const DEFAULT_PUSH_EXCLUDES: &[&str] = &[".localcache", "entrypoint"];

#[derive(Debug, Deserialize)]
struct StaticConfig {
    project: ProjectSection,
    #[serde(default)]
    sync: SyncSection,
}

#[derive(Debug, Deserialize)]
struct ProjectSection {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct SyncSection {
    #[serde(default)]
    excludes: Option<Vec<String>>,
}

/// Fully merged settings for one project root.
#[derive(Debug)]
pub struct Settings {
    pub project_name: String,
    pub layout: Layout,
    pub push_excludes: Vec<String>,
    /// Secret for the remote store; commands that never talk to the remote
    /// work without it.
    pub access_token: Option<String>,
}

/// Load settings for the project rooted at `root`.
///
/// A missing config file is not an error: defaults apply (project name =
/// root basename, standard excludes). A present but unparsable file is.
pub fn load_settings(root: &Path) -> Result<Settings> {
    dotenvy::from_path(root.join(".env")).ok();

    let layout = Layout::from_root(root);
    layout.trace_loaded();

    let config_path = root.join(CONFIG_FILE);
    let (project_name, excludes) = if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config file {}", config_path.display()))?;
        let static_conf: StaticConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config YAML {}", config_path.display()))?;
        info!(config_path = %config_path.display(), project = %static_conf.project.name, "Parsed config file");
        (static_conf.project.name, static_conf.sync.excludes)
    } else {
        debug!(config_path = %config_path.display(), "No config file, using defaults");
        (default_project_name(root), None)
    };

    let push_excludes = excludes.unwrap_or_else(|| {
        DEFAULT_PUSH_EXCLUDES
            .iter()
            .map(|s| s.to_string())
            .collect()
    });

    let access_token = std::env::var(ACCESS_TOKEN_VAR).ok();
    info!(
        project = %project_name,
        token_present = access_token.is_some(),
        "Settings loaded"
    );

    Ok(Settings {
        project_name,
        layout,
        push_excludes,
        access_token,
    })
}
