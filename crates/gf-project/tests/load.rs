use std::fs;
use std::path::Path;

use gf_project::{
    AlgorithmDef, ProjectError, ValidationError, load_config, load_json, load_yaml, save_json,
    save_yaml,
};

fn demos() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

#[test]
fn demos_load_and_validate() {
    let yaml = load_config(&demos().join("three_bus.yaml")).unwrap();
    assert_eq!(yaml.grid.lines.len(), 2);
    assert_eq!(yaml.grid.bus_count(), 3);
    assert_eq!(yaml.grid.algorithm, AlgorithmDef::CurrentInjection);
    assert_eq!(yaml.grid.initial_setpoints[0].p, -1000.0);

    let json = load_config(&demos().join("feeder_trace.json")).unwrap();
    assert_eq!(json.grid.algorithm, AlgorithmDef::NewtonRaphson);
    assert_eq!(json.grid.bus_count(), 5);
    assert_eq!(json.grid.tolerance, 1e-10);
    assert_eq!(json.grid.service.idle_resolve_interval_s, Some(0.5));
    assert_eq!(json.grid.service.log_queue_capacity, 1024);

    // Trace path is resolved next to the configuration file
    let trace = json.grid.slack_voltage.trace_file_path.unwrap();
    assert!(trace.ends_with("slack_voltage.csv"));
    assert!(trace.exists());
}

#[test]
fn yaml_and_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let project = load_yaml(&demos().join("three_bus.yaml")).unwrap();

    let yaml_path = dir.path().join("grid.yaml");
    save_yaml(&yaml_path, &project).unwrap();
    assert_eq!(load_yaml(&yaml_path).unwrap(), project);

    let json_path = dir.path().join("grid.json");
    save_json(&json_path, &project).unwrap();
    assert_eq!(load_json(&json_path).unwrap(), project);
}

#[test]
fn short_algorithm_names_and_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.yml");
    fs::write(
        &path,
        "grid:\n  lines:\n    - { from: 0, to: 1, R: 0.1, X: 0.1 }\n  base_quantities: { S: 1000.0, V: 100.0 }\n  algorithm: CW\n  slack_voltage: { voltage_real: 100.0 }\n",
    )
    .unwrap();

    let grid = load_config(&path).unwrap().grid;
    assert_eq!(grid.algorithm, AlgorithmDef::CurrentInjection);
    assert_eq!(grid.lines[0].b, 0.0);
    assert_eq!(grid.max_iterations, 100);
    assert!(grid.service.incremental_updates);
    assert!(!grid.slack_voltage.use_trace);
}

#[test]
fn invalid_configs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.json");
    fs::write(
        &path,
        r#"{"grid": {"lines": [{"from": 0, "to": 0, "R": 0.1, "X": 0.1, "B": 0}],
            "base_quantities": {"S": 1000.0, "V": 100.0},
            "slack_voltage": {"voltage_real": 100.0}}}"#,
    )
    .unwrap();
    assert!(matches!(
        load_config(&path),
        Err(ProjectError::Validation(ValidationError::InvalidValue { .. }))
    ));

    fs::write(&path, r#"{"grid": {"lines": []}}"#).unwrap();
    assert!(matches!(load_config(&path), Err(ProjectError::Json(_))));

    let txt = dir.path().join("grid.txt");
    fs::write(&txt, "").unwrap();
    assert!(matches!(
        load_config(&txt),
        Err(ProjectError::UnsupportedFormat { .. })
    ));
}
