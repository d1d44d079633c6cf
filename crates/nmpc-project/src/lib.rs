//! nmpc-project: controller and model configuration files.
//!
//! Files are flat YAML maps keyed by dotted names (`"ocp.n_shoot": 20`).
//! This crate only parses: a missing or mistyped key is reported by
//! serde_yaml with its full dotted name. Values are checked by the runtime
//! types built from them (`OcpConfig::validate`, `SimParams::new` and the
//! model constructors).

pub mod schema;

use std::path::Path;

use serde::de::DeserializeOwned;

pub use schema::*;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> ProjectResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ProjectError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

fn parse_yaml<T: DeserializeOwned>(content: &str) -> ProjectResult<T> {
    serde_yaml::from_str(content).map_err(|source| ProjectError::Yaml {
        path: "<string>".to_string(),
        source,
    })
}

pub fn load_controller(path: &Path) -> ProjectResult<ControllerFile> {
    read_yaml(path)
}

pub fn load_dipc_model(path: &Path) -> ProjectResult<DipcModelFile> {
    read_yaml(path)
}

pub fn load_cstr_model(path: &Path) -> ProjectResult<CstrModelFile> {
    read_yaml(path)
}

pub fn parse_controller(content: &str) -> ProjectResult<ControllerFile> {
    parse_yaml(content)
}

pub fn parse_dipc_model(content: &str) -> ProjectResult<DipcModelFile> {
    parse_yaml(content)
}

pub fn parse_cstr_model(content: &str) -> ProjectResult<CstrModelFile> {
    parse_yaml(content)
}
