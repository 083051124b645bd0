//! Error types shared across the pipeline and sync layers.
//!
//! The pipeline never swallows errors: the two stage-update operations catch
//! only to flush and recreate their target folder, then return the original
//! error to the caller. The async [`crate::remote::BlobStore`] boundary uses
//! boxed errors, mirrored here as [`BoxError`].

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error type used at the blob-store trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum LoomError {
    /// A task declaration was rejected at registration time.
    #[error("registration rejected for task '{task}': {reason}")]
    Registration { task: String, reason: String },

    /// No parser rule matched the filename suffix.
    #[error("no parser registered for filename '{0}'")]
    UnknownExtension(String),

    /// A task returned a different number of values than it declared outputs.
    #[error("task '{task}' returned {returned} value(s) but declares {expected} output filename(s)")]
    OutputShape {
        task: String,
        returned: usize,
        expected: usize,
    },

    /// A declared input file was absent from the stage's source folder.
    #[error("missing input file: {}", .path.display())]
    MissingInput { path: PathBuf },

    /// An artifact of the wrong kind was handed to a parser for writing.
    #[error("cannot write {got} artifact to '{}': expected {expected}", .path.display())]
    ArtifactMismatch {
        path: PathBuf,
        expected: &'static str,
        got: &'static str,
    },

    /// A file's content could not be decoded by its parser.
    #[error("failed to parse {}: {cause}", .path.display())]
    Parse { path: PathBuf, cause: BoxError },

    /// Rows and headers of a table disagree.
    #[error("malformed table: {0}")]
    Table(String),

    /// A registered task function returned an error.
    #[error("task '{task}' failed: {cause}")]
    Task { task: String, cause: BoxError },

    /// `split_after` did not find the marker segment in the path.
    #[error("path segment '{marker}' not found in '{path}'")]
    MarkerNotFound { marker: String, path: String },

    /// An invalid glob pattern was given to `scan`.
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },

    /// An entrypoint file does not carry one of the modelable extensions.
    #[error("entrypoint file has an unsupported extension: {0}")]
    InvalidEntrypointFile(String),

    /// No access token was provided for the remote store.
    #[error("no remote credential available: set DROPBOX_ACCESS_TOKEN")]
    MissingCredential,

    /// The remote blob store reported a failure.
    #[error("remote store error: {0}")]
    Remote(BoxError),

    /// Notebook-to-report conversion failed.
    #[error("notebook conversion failed for {}: {reason}", .notebook.display())]
    NotebookConversion { notebook: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
