//! Error type for scene setup and rendering.

use thiserror::Error;
use umbra_core::CoreError;

/// Errors reported before rendering starts.
///
/// Rendering itself never fails: numeric trouble is clamped to a zero
/// contribution, and arena exhaustion is a fatal panic.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid material '{name}': {reason}")]
    InvalidMaterial { name: String, reason: String },

    #[error("Invalid light: {0}")]
    InvalidLight(String),

    #[error("Invalid surface: {0}")]
    InvalidSurface(String),

    #[error("Scene already set up; surfaces cannot be added")]
    SceneLocked,

    #[error("Scene must be set up before rendering")]
    SceneNotSetUp,
}

impl RenderError {
    pub(crate) fn material(name: &str, reason: impl Into<String>) -> Self {
        RenderError::InvalidMaterial {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for renderer setup operations.
pub type RenderResult<T> = Result<T, RenderError>;
