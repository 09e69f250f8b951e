//! Error type for scene descriptions and configuration.

use thiserror::Error;

/// Errors that can occur while loading or validating a scene description.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Invalid scene: {0}")]
    InvalidScene(String),
}

/// Result type for scene description operations.
pub type CoreResult<T> = Result<T, CoreError>;
