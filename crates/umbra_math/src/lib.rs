//! Umbra math: vector types, rays, bounding boxes and coordinate frames.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod dir;
mod frame;
mod ray;
mod transform;

pub use aabb::Aabb;
pub use dir::{cos_angle, mirror, refraction, spherical_to_dir};
pub use frame::Frame;
pub use ray::Ray;
pub use transform::Mat4Ext;

/// Color type alias (linear RGB, unbounded)
pub type Color = Vec3;

/// Perceptual-agnostic average intensity of a color.
#[inline]
pub fn intensity(color: Color) -> f32 {
    (color.x + color.y + color.z) / 3.0
}
