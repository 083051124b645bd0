//! CLI surface: thin wrappers over the pipeline and sync operations.
//!
//! `run` builds a [`DataManager`] with empty registries (bootstrap mode) for
//! the installed binary; projects embedding this crate register their tasks
//! and call [`run_with`] instead, threading their own manager through.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use crate::config::SyncRole;
use crate::dropbox::DropboxStore;
use crate::load_config::{load_settings, Settings};
use crate::pipeline::DataManager;
use crate::{reports, sync};

/// CLI for dataloom: build and synchronise a project's data folders.
#[derive(Parser)]
#[clap(
    name = "dataloom",
    version,
    about = "Build and synchronise the data folders of a data-science project"
)]
pub struct Cli {
    /// Project root directory
    #[clap(long, default_value = ".", global = true)]
    pub root: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild data/entrypoint from data/raw via the registered cleaning tasks
    BuildEntrypoint,
    /// Rebuild data/models from data/entrypoint via the registered modeling tasks
    BuildModels,
    /// Download the remote project data folder into the local data folder
    Pull,
    /// Upload the local data folder to the remote project folder
    Push,
    /// Delete the contents of the remote raw and models folders
    Flush {
        /// Actually delete; without this the command refuses to run
        #[clap(long)]
        force: bool,
    },
    /// Convert *.report.ipynb notebooks into HTML reports
    PersistNotebooks,
}

/// Entrypoint for the installed binary: no tasks are registered, so the
/// build commands run in their no-pipeline modes.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli.root)?;
    let manager = DataManager::new(&settings.layout);
    run_with(cli, settings, &manager).await
}

/// Extracted command logic, shared by `main()`, integration tests and
/// embedding projects that carry their own registered [`DataManager`].
pub async fn run_with(cli: Cli, settings: Settings, manager: &DataManager) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::BuildEntrypoint => {
            manager.update_entrypoint()?;
            println!("Entrypoint rebuilt.");
        }
        Commands::BuildModels => {
            manager.update_models()?;
            println!("Models rebuilt.");
        }
        Commands::Pull => {
            let store = DropboxStore::login(settings.access_token.clone())?;
            let folders = settings.layout.sync_folders(&settings.project_name);
            let report = sync::pull(&store, &folders).await?;
            println!(
                "Pull complete: {} file(s), {} folder(s).",
                report.downloaded.len(),
                report.folders_created.len()
            );
        }
        Commands::Push => {
            let store = DropboxStore::login(settings.access_token.clone())?;
            let folders = settings.layout.sync_folders(&settings.project_name);
            let report = sync::push(&store, &folders, &settings.push_excludes).await?;
            println!("Push complete: {} file(s).", report.uploaded.len());
        }
        Commands::Flush { force } => {
            if !force {
                bail!(
                    "this deletes the remote raw and models folders; \
                     re-run with --force to proceed (local files remain intact)"
                );
            }
            let store = DropboxStore::login(settings.access_token.clone())?;
            let folders = settings.layout.sync_folders(&settings.project_name);
            let mut deleted = sync::flush(&store, &folders, SyncRole::Raw).await?;
            deleted.extend(sync::flush(&store, &folders, SyncRole::Models).await?);
            println!("Flush complete: {} remote entr(ies) deleted.", deleted.len());
        }
        Commands::PersistNotebooks => {
            let converted = reports::persist_notebooks(
                &settings.layout.notebooks_dir,
                &settings.layout.reports_dir,
            )?;
            println!("Persisted {} notebook(s).", converted.len());
        }
    }

    Ok(())
}
