//! File-keyed pipeline registry: the build system over the data folder tree.
//!
//! [`DataManager`] owns two ordered registries of user tasks. A cleaning task
//! turns files in `data/raw/` into files in `data/entrypoint/`; a modeling
//! task turns entrypoint files into files in `data/models/`. Each task
//! declares its contract at registration time: the ordered input filenames it
//! consumes and the ordered output filenames it produces. Registration is
//! fail-fast — a declaration that cannot be satisfied is rejected before it
//! ever enters a registry.
//!
//! Stage execution is synchronous and strictly in registration order: load
//! every declared input through its format parser, invoke the task, check the
//! returned value count against the declared outputs, write the results back
//! through the parsers. A failed stage flushes the whole target folder and
//! recreates it empty (plus the `.gitkeep` marker) before the error is
//! returned, so a target folder is observably all-or-nothing per run.
//!
//! Construct one `DataManager` per process and thread it explicitly into the
//! CLI-level commands; the registries are meant to be populated once at
//! startup and treated as immutable afterwards.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, error, info};

use crate::config::Layout;
use crate::error::{BoxError, LoomError};
use crate::parsers::{self, Artifact};
use crate::pathutils;

/// Marker file recreated whenever a target folder is flushed, so the
/// directory exists even when empty.
pub const GITKEEP: &str = ".gitkeep";

/// Result of a task invocation: either a single value or an ordered sequence,
/// mirroring the declared output filenames.
pub enum TaskOutput {
    Single(Artifact),
    Many(Vec<Artifact>),
}

type TaskFn = Box<dyn Fn(Vec<Artifact>) -> Result<TaskOutput, BoxError> + Send + Sync>;

/// A pure function together with its declared positional-input count.
///
/// Rust closures cannot be introspected for arity, so the implementer states
/// it here; registration validates it against the input-filename count.
pub struct Task {
    name: String,
    arity: usize,
    func: TaskFn,
}

impl Task {
    pub fn new<F>(name: impl Into<String>, arity: usize, func: F) -> Self
    where
        F: Fn(Vec<Artifact>) -> Result<TaskOutput, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

struct RegisteredTask {
    task: Task,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

type Registry = IndexMap<String, RegisteredTask>;

/// Which readable folder a [`DataManager::fetch`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFolder {
    Entrypoint,
    Models,
}

/// Manages the data transfer between the raw, entrypoint and models folders
/// through registered cleaning and modeling tasks. Treat one instance as the
/// process-wide registry.
pub struct DataManager {
    raw_folder: PathBuf,
    entrypoint_folder: PathBuf,
    models_folder: PathBuf,
    cleaners: Registry,
    modelers: Registry,
}

impl DataManager {
    pub fn new(layout: &Layout) -> Self {
        Self::with_folders(
            layout.raw_dir.clone(),
            layout.entrypoint_dir.clone(),
            layout.models_dir.clone(),
        )
    }

    pub fn with_folders(
        raw_folder: PathBuf,
        entrypoint_folder: PathBuf,
        models_folder: PathBuf,
    ) -> Self {
        Self {
            raw_folder,
            entrypoint_folder,
            models_folder,
            cleaners: Registry::new(),
            modelers: Registry::new(),
        }
    }

    /// Register a cleaning task: `inputs` are read from the raw folder,
    /// `outputs` are written into the entrypoint folder.
    ///
    /// Fails fast when both filename lists are empty or when the task's
    /// declared arity differs from the input count. Re-registering a task
    /// name replaces the function but keeps its original execution position.
    pub fn register_cleaner(
        &mut self,
        task: Task,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<(), LoomError> {
        Self::register(&mut self.cleaners, task, inputs, outputs)
    }

    /// Register a modeling task: `inputs` are read from the entrypoint
    /// folder, `outputs` are written into the models folder.
    pub fn register_modeler(
        &mut self,
        task: Task,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<(), LoomError> {
        Self::register(&mut self.modelers, task, inputs, outputs)
    }

    fn register(
        registry: &mut Registry,
        task: Task,
        inputs: &[&str],
        outputs: &[&str],
    ) -> Result<(), LoomError> {
        if inputs.is_empty() && outputs.is_empty() {
            return Err(LoomError::Registration {
                task: task.name.clone(),
                reason: "at least one input or output filename is required".to_string(),
            });
        }
        if task.arity != inputs.len() {
            return Err(LoomError::Registration {
                task: task.name.clone(),
                reason: format!(
                    "declared arity {} does not match {} input filename(s)",
                    task.arity,
                    inputs.len()
                ),
            });
        }
        info!(
            task = %task.name,
            inputs = inputs.len(),
            outputs = outputs.len(),
            "Registered task"
        );
        registry.insert(
            task.name.clone(),
            RegisteredTask {
                task,
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
            },
        );
        Ok(())
    }

    /// Names of the registered cleaning tasks, in execution order.
    pub fn cleaning_tasks(&self) -> Vec<&str> {
        self.cleaners.values().map(|r| r.task.name()).collect()
    }

    /// Names of the registered modeling tasks, in execution order.
    pub fn modeling_tasks(&self) -> Vec<&str> {
        self.modelers.values().map(|r| r.task.name()).collect()
    }

    /// Paths of the raw files a cleaning stage can consume, sorted lexically.
    pub fn available_raw_data(&self) -> Result<Vec<PathBuf>, LoomError> {
        let mut paths = pathutils::scan(&self.raw_folder, &["*.csv", "*.json"])?;
        paths.sort();
        Ok(paths)
    }

    /// Paths of the entrypoint files a modeling stage can consume, sorted
    /// lexically.
    pub fn available_entrypoints(&self) -> Result<Vec<PathBuf>, LoomError> {
        let mut paths =
            pathutils::scan(&self.entrypoint_folder, &["*.csv", "*.json", "*data.pkl"])?;
        paths.sort();
        Ok(paths)
    }

    /// Paths of the produced model-folder files, sorted lexically.
    pub fn available_models(&self) -> Result<Vec<PathBuf>, LoomError> {
        let mut paths = pathutils::scan(
            &self.models_folder,
            &["*.csv", "*.json", "*data.pkl", "*model.pkl"],
        )?;
        paths.sort();
        Ok(paths)
    }

    /// Read one artifact from the entrypoint or models folder through its
    /// format parser.
    pub fn fetch(&self, filename: &str, folder: DataFolder) -> Result<Artifact, LoomError> {
        let folder_path = match folder {
            DataFolder::Entrypoint => &self.entrypoint_folder,
            DataFolder::Models => &self.models_folder,
        };
        let kind = parsers::resolve(filename)?;
        kind.read(&folder_path.join(filename))
    }

    /// Create or update the entrypoint folder from the raw folder.
    ///
    /// No raw files: no-op. No registered cleaning tasks: bootstrap mode —
    /// the entrypoint folder is flushed and becomes a full copy of the raw
    /// folder. Otherwise raw files not referenced by any cleaning task are
    /// copied over verbatim, then the cleaning stage runs. On any failure the
    /// entrypoint folder is flushed to empty (marker file only) and the error
    /// is returned.
    pub fn update_entrypoint(&self) -> Result<(), LoomError> {
        let raw_list = self.available_raw_data()?;
        if raw_list.is_empty() {
            info!("No raw data files found, nothing to build");
            return Ok(());
        }

        if self.cleaners.is_empty() {
            info!("No registered cleaning tasks found, copying raw data over");
            flush_folder(&self.entrypoint_folder)?;
            copy_tree(&self.raw_folder, &self.entrypoint_folder)?;
            return Ok(());
        }

        if let Err(err) = self.run_cleaning(&raw_list) {
            error!(error = %err, "Entrypoint rebuild failed, flushing entrypoint folder");
            flush_folder(&self.entrypoint_folder)?;
            return Err(err);
        }
        Ok(())
    }

    fn run_cleaning(&self, raw_list: &[PathBuf]) -> Result<(), LoomError> {
        let marker = self
            .raw_folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut raw_names = Vec::new();
        for path in raw_list {
            let (_, after) = pathutils::split_after(&path.to_string_lossy(), &marker)?;
            raw_names.push(after);
        }

        let referenced: HashSet<&str> = self
            .cleaners
            .values()
            .flat_map(|r| r.inputs.iter().map(String::as_str))
            .collect();

        let mut untouched: Vec<&String> = raw_names
            .iter()
            .filter(|name| !referenced.contains(name.as_str()))
            .collect();
        untouched.sort();
        info!(count = untouched.len(), "Raw files not referenced by any cleaning task");

        for name in untouched {
            let src = self.raw_folder.join(name);
            let dest = self.entrypoint_folder.join(name);
            debug!(file = %name, "Copying untouched raw file into entrypoint");
            pathutils::ensure_parent_dir(&dest)?;
            fs::copy(&src, &dest)?;
        }

        run_stage(&self.cleaners, &self.raw_folder, &self.entrypoint_folder)
    }

    /// Create or update the models folder from the entrypoint folder.
    ///
    /// No entrypoint files or no registered modeling tasks: no-op —
    /// unregistered entrypoint files are never auto-promoted to models. Every
    /// available entrypoint filename must carry a modelable extension before
    /// the stage runs. Failure flushes the models folder to empty and returns
    /// the error.
    pub fn update_models(&self) -> Result<(), LoomError> {
        let entrypoint_list = self.available_entrypoints()?;
        if entrypoint_list.is_empty() {
            info!("No entrypoint files found, nothing to model");
            return Ok(());
        }
        if self.modelers.is_empty() {
            info!("No registered modeling tasks found");
            return Ok(());
        }

        let run = || -> Result<(), LoomError> {
            for path in &entrypoint_list {
                let name = path.to_string_lossy();
                if !(name.ends_with(".json")
                    || name.ends_with(".csv")
                    || name.ends_with("data.pkl"))
                {
                    return Err(LoomError::InvalidEntrypointFile(name.into_owned()));
                }
            }
            run_stage(&self.modelers, &self.entrypoint_folder, &self.models_folder)
        };

        if let Err(err) = run() {
            error!(error = %err, "Model rebuild failed, flushing models folder");
            flush_folder(&self.models_folder)?;
            return Err(err);
        }
        Ok(())
    }
}

/// Run every registered task in insertion order: load declared inputs from
/// `source`, invoke, shape-check, write declared outputs into `target`.
fn run_stage(registry: &Registry, source: &Path, target: &Path) -> Result<(), LoomError> {
    for (name, registered) in registry {
        info!(
            task = %name,
            inputs = registered.inputs.len(),
            outputs = registered.outputs.len(),
            "Running task"
        );
        let inputs = load_inputs(&registered.inputs, source)?;
        let output = (registered.task.func)(inputs).map_err(|cause| LoomError::Task {
            task: name.clone(),
            cause,
        })?;
        let values = check_output(name, output, &registered.outputs)?;
        write_outputs(&registered.outputs, target, values)?;
    }
    Ok(())
}

/// Load the declared input files in declaration order.
fn load_inputs(filenames: &[String], folder: &Path) -> Result<Vec<Artifact>, LoomError> {
    let mut data = Vec::with_capacity(filenames.len());
    for filename in filenames {
        let kind = parsers::resolve(filename)?;
        let path = folder.join(filename);
        if !path.exists() {
            return Err(LoomError::MissingInput { path });
        }
        data.push(kind.read(&path)?);
    }
    Ok(data)
}

/// Check that the returned value count lines up with the declared output
/// filenames, and flatten the result into an ordered list.
fn check_output(
    task: &str,
    output: TaskOutput,
    filenames: &[String],
) -> Result<Vec<Artifact>, LoomError> {
    match output {
        TaskOutput::Many(values) => {
            if values.len() != filenames.len() {
                return Err(LoomError::OutputShape {
                    task: task.to_string(),
                    returned: values.len(),
                    expected: filenames.len(),
                });
            }
            Ok(values)
        }
        TaskOutput::Single(value) => {
            if filenames.len() != 1 {
                return Err(LoomError::OutputShape {
                    task: task.to_string(),
                    returned: 1,
                    expected: filenames.len(),
                });
            }
            Ok(vec![value])
        }
    }
}

/// Write the produced values to the declared output files in order.
fn write_outputs(
    filenames: &[String],
    folder: &Path,
    values: Vec<Artifact>,
) -> Result<(), LoomError> {
    for (filename, value) in filenames.iter().zip(values) {
        let kind = parsers::resolve(filename)?;
        kind.write(&folder.join(filename), &value)?;
    }
    Ok(())
}

/// Delete `folder` recursively and recreate it empty with the marker file.
fn flush_folder(folder: &Path) -> Result<(), LoomError> {
    match fs::remove_dir_all(folder) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    fs::create_dir_all(folder)?;
    fs::write(folder.join(GITKEEP), b"")?;
    Ok(())
}

/// Recursive copy of a directory tree into an existing destination folder.
fn copy_tree(source: &Path, dest: &Path) -> Result<(), LoomError> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            fs::create_dir_all(&target)?;
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
