use tempfile::tempdir;

use dataloom::error::LoomError;
use dataloom::parsers::Artifact;
use dataloom::pipeline::{DataManager, Task, TaskOutput};

fn manager() -> (tempfile::TempDir, DataManager) {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let manager = DataManager::with_folders(
        root.join("raw"),
        root.join("entrypoint"),
        root.join("models"),
    );
    (tmp, manager)
}

fn identity_task(name: &str, arity: usize) -> Task {
    Task::new(name, arity, |inputs: Vec<Artifact>| {
        Ok(TaskOutput::Many(inputs))
    })
}

#[test]
fn registration_rejects_arity_mismatch_and_keeps_registry_empty() {
    let (_tmp, mut manager) = manager();

    let err = manager
        .register_cleaner(identity_task("wrong_arity", 1), &["a.csv", "b.csv"], &["d.csv"])
        .unwrap_err();

    assert!(matches!(err, LoomError::Registration { .. }));
    assert!(manager.cleaning_tasks().is_empty());
}

#[test]
fn registration_rejects_empty_input_and_output_lists() {
    let (_tmp, mut manager) = manager();

    let err = manager
        .register_modeler(identity_task("nothing_declared", 0), &[], &[])
        .unwrap_err();

    assert!(matches!(err, LoomError::Registration { .. }));
    assert!(manager.modeling_tasks().is_empty());
}

#[test]
fn registration_allows_zero_inputs_when_outputs_declared() {
    let (_tmp, mut manager) = manager();

    let task = Task::new("seed", 0, |_inputs| {
        Ok(TaskOutput::Single(Artifact::Json(serde_json::json!({
            "seeded": true
        }))))
    });
    manager
        .register_cleaner(task, &[], &["seed.json"])
        .expect("zero-arity task with outputs should register");

    assert_eq!(manager.cleaning_tasks(), vec!["seed"]);
}

#[test]
fn registration_preserves_insertion_order_and_replaces_in_place() {
    let (_tmp, mut manager) = manager();

    manager
        .register_cleaner(identity_task("second_alphabetically", 1), &["b.csv"], &["b2.csv"])
        .unwrap();
    manager
        .register_cleaner(identity_task("first_alphabetically", 1), &["a.csv"], &["a2.csv"])
        .unwrap();
    assert_eq!(
        manager.cleaning_tasks(),
        vec!["second_alphabetically", "first_alphabetically"]
    );

    // Re-registering an existing name replaces the task but keeps its slot.
    manager
        .register_cleaner(
            identity_task("second_alphabetically", 2),
            &["b.csv", "c.csv"],
            &["b2.csv"],
        )
        .unwrap();
    assert_eq!(
        manager.cleaning_tasks(),
        vec!["second_alphabetically", "first_alphabetically"]
    );
}

#[test]
fn cleaning_and_modeling_registries_are_independent() {
    let (_tmp, mut manager) = manager();

    manager
        .register_cleaner(identity_task("clean", 1), &["a.csv"], &["b.csv"])
        .unwrap();
    manager
        .register_modeler(identity_task("model", 1), &["b.csv"], &["b.model.pkl"])
        .unwrap();

    assert_eq!(manager.cleaning_tasks(), vec!["clean"]);
    assert_eq!(manager.modeling_tasks(), vec!["model"]);
}
