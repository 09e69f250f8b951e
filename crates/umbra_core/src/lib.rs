//! Umbra Core - scene description and configuration for the Umbra renderer.
//!
//! This crate provides:
//!
//! - **Configuration**: `RenderConfig`, with defaults for every setting
//! - **Scene description**: serde types for cameras, materials, surfaces and lights
//! - **Meshes**: validated triangle meshes shared by the renderer
//!
//! # Example
//!
//! ```ignore
//! use umbra_core::load_scene;
//!
//! let desc = load_scene("scene.json")?;
//! println!("Rendering {}x{}", desc.render.width, desc.render.height);
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod mesh;
pub mod scene;

// Re-export commonly used types
pub use config::{AccelKind, FilterKind, IntegratorKind, RenderConfig, SampleGenKind};
pub use error::{CoreError, CoreResult};
pub use loader::{load_scene, load_scene_from_str};
pub use mesh::Mesh;
pub use scene::{
    CameraDesc, LightDesc, MaterialDesc, MaterialKind, Param, SceneDesc, ShapeDesc, SpotDesc,
    SurfaceDesc, TexSpace, TextureDesc, TransformDesc,
};
