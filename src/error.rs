//! Error types for spin_vmc.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmcError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no valid initial configuration: projected determinant vanished for every attempt")]
    NoValidConfiguration,

    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl VmcError {
    pub fn config(msg: impl Into<String>) -> Self {
        VmcError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, VmcError>;
