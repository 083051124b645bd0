//! Format parsers for the data folder tree.
//!
//! Every file the pipeline touches belongs to one of a fixed, closed set of
//! format families, selected by filename suffix. Each family is a read/write
//! capability over one [`Artifact`] variant:
//!
//! - `.json` — a structured tree ([`serde_json::Value`])
//! - `.csv` — a tabular frame with named columns ([`Table`])
//! - `model.pkl` — an opaque fitted model ([`ModelArtifact`]), written with a
//!   `metadata.json` sidecar
//! - `data.pkl` — a raw binary payload (`Vec<u8>`)
//!
//! Resolution is an ends-with test in a fixed priority order, so the
//! multi-segment `model.pkl`/`data.pkl` rules win over any generic `.pkl`
//! reading of the name. A filename matching no rule is an error.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::LoomError;
use crate::pathutils;

/// A tabular frame with a header row of named columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), LoomError> {
        if row.len() != self.headers.len() {
            return Err(LoomError::Table(format!(
                "row has {} cell(s) but the table has {} column(s)",
                row.len(),
                self.headers.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Build a table from a JSON sequence of records (objects). Column order
    /// follows first appearance across the records; absent fields become
    /// empty cells.
    pub fn from_records(value: &Value) -> Result<Self, LoomError> {
        let records = value
            .as_array()
            .ok_or_else(|| LoomError::Table("expected a sequence of records".to_string()))?;

        let mut headers: Vec<String> = Vec::new();
        for record in records {
            let object = record
                .as_object()
                .ok_or_else(|| LoomError::Table("record is not an object".to_string()))?;
            for key in object.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.clone());
                }
            }
        }

        let mut table = Table::new(headers);
        for record in records {
            let object = record.as_object().expect("checked above");
            let row = table
                .headers
                .iter()
                .map(|h| object.get(h).map(cell_to_string).unwrap_or_default())
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// An opaque fitted model: a name plus the fitted parameter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub params: Value,
}

/// A value flowing through the pipeline, one variant per format family.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Json(Value),
    Table(Table),
    Model(ModelArtifact),
    Blob(Vec<u8>),
}

impl Artifact {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Artifact::Json(_) => "json",
            Artifact::Table(_) => "table",
            Artifact::Model(_) => "model",
            Artifact::Blob(_) => "blob",
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Artifact::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Artifact::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&ModelArtifact> {
        match self {
            Artifact::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Artifact::Blob(b) => Some(b),
            _ => None,
        }
    }
}

/// The closed set of format families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Json,
    Csv,
    Model,
    Blob,
}

/// Resolve the parser for a filename. The rules are checked in a fixed
/// priority order; no match is an error.
pub fn resolve(filename: &str) -> Result<FormatKind, LoomError> {
    if filename.ends_with(".json") {
        Ok(FormatKind::Json)
    } else if filename.ends_with(".csv") {
        Ok(FormatKind::Csv)
    } else if filename.ends_with("model.pkl") {
        Ok(FormatKind::Model)
    } else if filename.ends_with("data.pkl") {
        Ok(FormatKind::Blob)
    } else {
        Err(LoomError::UnknownExtension(filename.to_string()))
    }
}

impl FormatKind {
    pub fn read(&self, path: &Path) -> Result<Artifact, LoomError> {
        debug!(kind = ?self, path = %path.display(), "Reading artifact");
        match self {
            FormatKind::Json => {
                let text = fs::read_to_string(path)?;
                let value: Value =
                    serde_json::from_str(&text).map_err(|e| LoomError::Parse {
                        path: path.to_path_buf(),
                        cause: Box::new(e),
                    })?;
                Ok(Artifact::Json(value))
            }
            FormatKind::Csv => {
                let mut reader =
                    csv::Reader::from_path(path).map_err(|e| LoomError::Parse {
                        path: path.to_path_buf(),
                        cause: Box::new(e),
                    })?;
                let headers = reader
                    .headers()
                    .map_err(|e| LoomError::Parse {
                        path: path.to_path_buf(),
                        cause: Box::new(e),
                    })?
                    .iter()
                    .map(str::to_string)
                    .collect();
                let mut table = Table::new(headers);
                for record in reader.records() {
                    let record = record.map_err(|e| LoomError::Parse {
                        path: path.to_path_buf(),
                        cause: Box::new(e),
                    })?;
                    table.push_row(record.iter().map(str::to_string).collect())?;
                }
                Ok(Artifact::Table(table))
            }
            FormatKind::Model => {
                let bytes = fs::read(path)?;
                let model: ModelArtifact =
                    serde_json::from_slice(&bytes).map_err(|e| LoomError::Parse {
                        path: path.to_path_buf(),
                        cause: Box::new(e),
                    })?;
                Ok(Artifact::Model(model))
            }
            FormatKind::Blob => Ok(Artifact::Blob(fs::read(path)?)),
        }
    }

    pub fn write(&self, path: &Path, artifact: &Artifact) -> Result<(), LoomError> {
        debug!(kind = ?self, path = %path.display(), "Writing artifact");
        pathutils::ensure_parent_dir(path)?;
        match (self, artifact) {
            (FormatKind::Json, Artifact::Json(value)) => {
                let text = serde_json::to_string(value).map_err(|e| LoomError::Parse {
                    path: path.to_path_buf(),
                    cause: Box::new(e),
                })?;
                fs::write(path, text)?;
                Ok(())
            }
            (FormatKind::Csv, Artifact::Table(table)) => write_table(path, table),
            // Coercion kept from the reference behavior: a sequence of JSON
            // records destined for a .csv output becomes a table first.
            (FormatKind::Csv, Artifact::Json(value)) => {
                write_table(path, &Table::from_records(value)?)
            }
            (FormatKind::Model, Artifact::Model(model)) => {
                let bytes = serde_json::to_vec(model).map_err(|e| LoomError::Parse {
                    path: path.to_path_buf(),
                    cause: Box::new(e),
                })?;
                fs::write(path, bytes)?;
                write_model_sidecar(path)
            }
            (FormatKind::Blob, Artifact::Blob(bytes)) => {
                fs::write(path, bytes)?;
                Ok(())
            }
            (kind, other) => Err(LoomError::ArtifactMismatch {
                path: path.to_path_buf(),
                expected: match kind {
                    FormatKind::Json => "json",
                    FormatKind::Csv => "table",
                    FormatKind::Model => "model",
                    FormatKind::Blob => "blob",
                },
                got: other.kind_name(),
            }),
        }
    }
}

fn write_table(path: &Path, table: &Table) -> Result<(), LoomError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| LoomError::Parse {
        path: path.to_path_buf(),
        cause: Box::new(e),
    })?;
    let into_parse_err = |e: csv::Error| LoomError::Parse {
        path: path.to_path_buf(),
        cause: Box::new(e),
    };
    writer.write_record(table.headers()).map_err(into_parse_err)?;
    for row in table.rows() {
        writer.write_record(row).map_err(into_parse_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// Metadata written next to every model artifact. The model name is the
/// file's final path segment.
fn write_model_sidecar(path: &Path) -> Result<(), LoomError> {
    let path_str = path.to_string_lossy();
    let Some(stem) = path_str.strip_suffix("model.pkl") else {
        // Only paths resolved through the model.pkl rule carry a sidecar.
        return Ok(());
    };
    let sidecar = format!("{stem}metadata.json");
    let model_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let body = serde_json::json!({
        "library-version": env!("CARGO_PKG_VERSION"),
        "model-name": model_name,
    });
    fs::write(sidecar, body.to_string())?;
    Ok(())
}
