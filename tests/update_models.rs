use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::tempdir;

use dataloom::error::LoomError;
use dataloom::parsers::{Artifact, ModelArtifact};
use dataloom::pipeline::{DataFolder, DataManager, Task, TaskOutput, GITKEEP};

fn manager_for(root: &Path) -> DataManager {
    DataManager::with_folders(
        root.join("raw"),
        root.join("entrypoint"),
        root.join("models"),
    )
}

fn write_entrypoint(root: &Path, name: &str, content: &str) {
    let path = root.join("entrypoint").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fit_task(name: &str) -> Task {
    Task::new(name, 1, |inputs: Vec<Artifact>| {
        let table = inputs[0].as_table().expect("entrypoint csv should load as a table");
        Ok(TaskOutput::Single(Artifact::Model(ModelArtifact {
            name: "churn".to_string(),
            params: json!({ "rows_seen": table.rows().len() }),
        })))
    })
}

#[test]
fn empty_entrypoint_is_a_noop() {
    let tmp = tempdir().unwrap();
    let mut manager = manager_for(tmp.path());
    manager
        .register_modeler(fit_task("fit"), &["e.csv"], &["churn.model.pkl"])
        .unwrap();

    manager.update_models().expect("empty entrypoint should be a no-op");
    assert!(!tmp.path().join("models").exists());
}

#[test]
fn no_registered_modelers_is_a_noop_without_passthrough() {
    let tmp = tempdir().unwrap();
    write_entrypoint(tmp.path(), "e.csv", "v\n1\n");
    let manager = manager_for(tmp.path());

    manager.update_models().unwrap();

    // Unlike the cleaning stage there is no pass-through copy.
    assert!(!tmp.path().join("models").exists());
}

#[test]
fn modeling_stage_writes_model_with_metadata_sidecar() {
    let tmp = tempdir().unwrap();
    write_entrypoint(tmp.path(), "e.csv", "v\n1\n2\n");
    let mut manager = manager_for(tmp.path());
    manager
        .register_modeler(fit_task("fit"), &["e.csv"], &["churn.model.pkl"])
        .unwrap();

    manager.update_models().expect("modeling stage should succeed");

    let models = tmp.path().join("models");
    assert!(models.join("churn.model.pkl").exists());

    let sidecar = fs::read_to_string(models.join("churn.metadata.json")).unwrap();
    let sidecar: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
    assert_eq!(sidecar["model-name"], "churn.model.pkl");
    assert_eq!(sidecar["library-version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn fetch_reads_back_the_fitted_model() {
    let tmp = tempdir().unwrap();
    write_entrypoint(tmp.path(), "e.csv", "v\n1\n2\n");
    let mut manager = manager_for(tmp.path());
    manager
        .register_modeler(fit_task("fit"), &["e.csv"], &["churn.model.pkl"])
        .unwrap();
    manager.update_models().unwrap();

    let fetched = manager
        .fetch("churn.model.pkl", DataFolder::Models)
        .expect("model should be fetchable");
    let model = fetched.as_model().expect("fetched artifact should be a model");
    assert_eq!(model.name, "churn");
    assert_eq!(model.params, json!({ "rows_seen": 2 }));
}

#[test]
fn failure_partway_through_flushes_earlier_artifacts() {
    let tmp = tempdir().unwrap();
    write_entrypoint(tmp.path(), "e.csv", "v\n1\n");
    let mut manager = manager_for(tmp.path());

    let first = Task::new("writes_fine", 1, |_inputs| {
        Ok(TaskOutput::Single(Artifact::Blob(vec![1, 2, 3])))
    });
    manager
        .register_modeler(first, &["e.csv"], &["intermediate.data.pkl"])
        .unwrap();

    let second = Task::new("explodes", 1, |_inputs| Err("fitting diverged".into()));
    manager
        .register_modeler(second, &["e.csv"], &["never.model.pkl"])
        .unwrap();

    let err = manager.update_models().unwrap_err();
    assert!(matches!(err, LoomError::Task { .. }), "got: {err}");

    // The artifact the first task wrote must not survive the failed run.
    let mut survivors: Vec<String> = fs::read_dir(tmp.path().join("models"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    survivors.sort();
    assert_eq!(survivors, vec![GITKEEP]);
}
