//! Notebook-to-report conversion via `jupyter nbconvert`.
//!
//! Notebooks opt in by naming: anything matching `*.report.ipynb` under the
//! notebooks folder is executed and rendered to HTML in the reports folder.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{error, info};

use crate::error::LoomError;
use crate::pathutils;

/// Convert every `*.report.ipynb` notebook to an executed HTML report.
/// Returns the notebooks converted; none found is not an error.
pub fn persist_notebooks(
    notebooks_dir: &Path,
    reports_dir: &Path,
) -> Result<Vec<PathBuf>, LoomError> {
    let mut notebooks = pathutils::scan(notebooks_dir, &["*.report.ipynb"])?;
    notebooks.sort();
    if notebooks.is_empty() {
        info!(
            dir = %notebooks_dir.display(),
            "No notebooks found; notebooks to persist must end with the 'report.ipynb' extension"
        );
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(reports_dir)?;

    for notebook in &notebooks {
        info!(notebook = %notebook.display(), "Converting notebook to HTML report");
        let status = Command::new("jupyter")
            .arg("nbconvert")
            .arg(notebook)
            .arg("--to=html")
            .arg("--execute")
            .arg("--log-level=INFO")
            .arg(format!("--output-dir={}", reports_dir.display()))
            .status();
        match status {
            Ok(s) if s.success() => {}
            Ok(s) => {
                error!(notebook = %notebook.display(), status = ?s, "nbconvert exited with non-zero code");
                return Err(LoomError::NotebookConversion {
                    notebook: notebook.clone(),
                    reason: format!("nbconvert exited with {s}"),
                });
            }
            Err(e) => {
                error!(error = ?e, "Failed to launch jupyter nbconvert");
                return Err(LoomError::NotebookConversion {
                    notebook: notebook.clone(),
                    reason: format!("failed to launch jupyter: {e}"),
                });
            }
        }
    }

    info!(count = notebooks.len(), "Converted notebooks into reports");
    Ok(notebooks)
}
