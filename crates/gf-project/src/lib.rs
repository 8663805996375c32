//! gf-project: grid configuration file format and validation.

pub mod schema;
pub mod validate;

use std::path::Path;

pub use schema::*;
pub use validate::{ValidationError, validate_config, validate_project};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported configuration format: {path}")]
    UnsupportedFormat { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ProjectResult<ProjectFile> {
    let content = std::fs::read_to_string(path)?;
    let project: ProjectFile = serde_yaml::from_str(&content)?;
    finish_load(project, path)
}

pub fn load_json(path: &Path) -> ProjectResult<ProjectFile> {
    let content = std::fs::read_to_string(path)?;
    let project: ProjectFile = serde_json::from_str(&content)?;
    finish_load(project, path)
}

/// Load by extension: `.yaml`/`.yml` as YAML, `.json` as JSON.
pub fn load_config(path: &Path) -> ProjectResult<ProjectFile> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => load_yaml(path),
        Some("json") => load_json(path),
        _ => Err(ProjectError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}

pub fn save_yaml(path: &Path, project: &ProjectFile) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_yaml::to_string(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn save_json(path: &Path, project: &ProjectFile) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_json::to_string_pretty(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

fn finish_load(mut project: ProjectFile, path: &Path) -> ProjectResult<ProjectFile> {
    validate_project(&project)?;
    // Relative trace paths are relative to the configuration file
    if let Some(trace) = &project.grid.slack_voltage.trace_file_path
        && trace.is_relative()
        && let Some(dir) = path.parent()
    {
        project.grid.slack_voltage.trace_file_path = Some(dir.join(trace));
    }
    Ok(project)
}
