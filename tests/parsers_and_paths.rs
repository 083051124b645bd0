use std::fs;

use serde_json::json;
use tempfile::tempdir;

use dataloom::error::LoomError;
use dataloom::parsers::{self, Artifact, FormatKind, ModelArtifact, Table};
use dataloom::pathutils;

#[test]
fn resolution_follows_suffix_priority_order() {
    assert_eq!(parsers::resolve("records.json").unwrap(), FormatKind::Json);
    assert_eq!(parsers::resolve("frame.csv").unwrap(), FormatKind::Csv);
    assert_eq!(parsers::resolve("churn.model.pkl").unwrap(), FormatKind::Model);
    assert_eq!(parsers::resolve("features.data.pkl").unwrap(), FormatKind::Blob);
}

#[test]
fn unrecognized_suffixes_fail_resolution() {
    assert!(matches!(
        parsers::resolve("notes.txt").unwrap_err(),
        LoomError::UnknownExtension(_)
    ));
    // A bare .pkl is not one of the two recognised pickle families.
    assert!(matches!(
        parsers::resolve("whatever.pkl").unwrap_err(),
        LoomError::UnknownExtension(_)
    ));
}

#[test]
fn json_round_trip() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("nested/dir/tree.json");
    let value = Artifact::Json(json!({ "a": [1, 2, 3], "b": { "c": "text" } }));

    FormatKind::Json.write(&path, &value).unwrap();
    assert_eq!(FormatKind::Json.read(&path).unwrap(), value);
}

#[test]
fn csv_round_trip() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("frame.csv");

    let mut table = Table::new(vec!["name".to_string(), "score".to_string()]);
    table.push_row(vec!["alice".to_string(), "3".to_string()]).unwrap();
    table.push_row(vec!["bob".to_string(), "5".to_string()]).unwrap();
    let value = Artifact::Table(table);

    FormatKind::Csv.write(&path, &value).unwrap();
    assert_eq!(FormatKind::Csv.read(&path).unwrap(), value);
}

#[test]
fn csv_write_coerces_a_sequence_of_records() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("coerced.csv");

    let records = Artifact::Json(json!([
        { "a": 1, "b": "x" },
        { "a": 2, "b": "y" },
    ]));
    FormatKind::Csv.write(&path, &records).unwrap();

    let read = FormatKind::Csv.read(&path).unwrap();
    let table = read.as_table().unwrap();
    assert_eq!(table.headers(), ["a", "b"]);
    assert_eq!(
        table.rows(),
        [
            vec!["1".to_string(), "x".to_string()],
            vec!["2".to_string(), "y".to_string()],
        ]
    );
}

#[test]
fn model_round_trip_and_sidecar() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("churn.model.pkl");

    let value = Artifact::Model(ModelArtifact {
        name: "churn".to_string(),
        params: json!({ "alpha": 0.5 }),
    });
    FormatKind::Model.write(&path, &value).unwrap();
    assert_eq!(FormatKind::Model.read(&path).unwrap(), value);

    let sidecar: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("churn.metadata.json")).unwrap())
            .unwrap();
    assert_eq!(sidecar["model-name"], "churn.model.pkl");
}

#[test]
fn blob_round_trip_is_byte_exact() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("features.data.pkl");

    let value = Artifact::Blob(vec![0, 159, 146, 150, 255]);
    FormatKind::Blob.write(&path, &value).unwrap();
    assert_eq!(FormatKind::Blob.read(&path).unwrap(), value);
}

#[test]
fn writing_a_mismatched_artifact_kind_fails() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("tree.json");

    let err = FormatKind::Json
        .write(&path, &Artifact::Blob(vec![1]))
        .unwrap_err();
    assert!(matches!(err, LoomError::ArtifactMismatch { .. }), "got: {err}");
}

#[test]
fn scan_matches_basenames_case_insensitively_and_recursively() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("sub/deeper")).unwrap();
    fs::write(tmp.path().join("UPPER.CSV"), "a\n1\n").unwrap();
    fs::write(tmp.path().join("sub/deeper/tree.json"), "{}").unwrap();
    fs::write(tmp.path().join("sub/skip.txt"), "x").unwrap();

    let mut found = pathutils::scan(tmp.path(), &["*.csv", "*.json"]).unwrap();
    found.sort();

    let names: Vec<_> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["UPPER.CSV", "tree.json"]);
}

#[test]
fn scan_of_a_missing_folder_is_empty() {
    let tmp = tempdir().unwrap();
    let found = pathutils::scan(&tmp.path().join("not-there"), &["*.*"]).unwrap();
    assert!(found.is_empty());
}

#[test]
fn split_after_splits_at_the_marker_segment() {
    let (before, after) = pathutils::split_after("/proj/data/raw/sub/a.csv", "raw").unwrap();
    assert_eq!(before, "/proj/data/raw");
    assert_eq!(after, "sub/a.csv");
}

#[test]
fn split_after_fails_when_the_marker_is_absent() {
    let err = pathutils::split_after("/proj/data/raw/a.csv", "entrypoint").unwrap_err();
    assert!(matches!(err, LoomError::MarkerNotFound { .. }));
}

#[test]
fn ensure_parent_dir_is_idempotent_and_leaves_the_file_alone() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("a/b/c/file.json");

    pathutils::ensure_parent_dir(&path).unwrap();
    pathutils::ensure_parent_dir(&path).unwrap();

    assert!(path.parent().unwrap().is_dir());
    assert!(!path.exists());
}
