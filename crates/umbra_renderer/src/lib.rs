//! Umbra Renderer - CPU light transport
//!
//! Physically based rendering core:
//! - Surfaces with a two-phase intersection protocol (cheap hit record,
//!   full intersection only for the nearest hit)
//! - BVH or flat-list spatial index
//! - Materials building BSDFs in a per-sample arena, with procedural
//!   textures and bump mapping
//! - Point, area, sphere, distant and environment lights
//! - Direct-lighting and path-tracing integrators with MIS
//! - Bucketed parallel rendering with filtered reconstruction

pub mod bsdf;
pub mod bucket;
pub mod camera;
pub mod context;
pub mod desc;
pub mod direct_illum;
pub mod error;
pub mod integrator;
pub mod intersect;
pub mod light;
pub mod material;
pub mod media;
pub mod output;
pub mod renderer;
pub mod sample;
pub mod sample_gen;
pub mod sampling;
pub mod scene;
pub mod space;
pub mod surface;
pub mod texture;

#[cfg(test)]
mod testing;

pub use camera::Camera;
pub use context::{RenderContext, RenderStats};
pub use desc::{build_scene, LoadedScene};
pub use error::{RenderError, RenderResult};
pub use integrator::{Integrator, Tint};
pub use output::{ImageOutput, OutputSink};
pub use renderer::{RenderOutput, Renderer};
pub use scene::Scene;

/// Re-export the math types used throughout the API
pub use umbra_math::{Aabb, Color, Ray, Vec3};
