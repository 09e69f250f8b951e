//! Light sources.
//!
//! Lights are sampled from an intersection: `sample` picks a direction
//! toward the light and `eval` reports what the light contributes along a
//! direction chosen some other way (e.g. by the BSDF). Directions are in the
//! intersection's normal frame.

mod environ;
mod far;
mod point;
mod sphere;
mod surface_light;

pub use environ::EnvironLight;
pub use far::FarLight;
pub use point::{PointLight, Spot};
pub use sphere::SphereLight;
pub use surface_light::SurfaceLight;

use umbra_math::{Aabb, Color, Vec2, Vec3};

use crate::error::{RenderError, RenderResult};
use crate::intersect::Intersection;

/// A direction sampled toward a light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Radiance (or, for point lights, irradiance) arriving along `dir`
    pub val: Color,
    /// Density per solid angle; 1 for point lights
    pub pdf: f32,
    /// Direction toward the light, in the intersection's normal frame
    pub dir: Vec3,
    /// Distance to the light; 0 for lights at infinity
    pub dist: f32,
}

impl LightSample {
    pub const NONE: LightSample = LightSample {
        val: Color::ZERO,
        pdf: 0.0,
        dir: Vec3::ZERO,
        dist: 0.0,
    };

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.pdf > 0.0 && self.val.max_element() > 0.0
    }
}

/// What a light contributes along a given direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightValue {
    pub val: Color,
    /// Density with which `sample` would have chosen the direction
    pub pdf: f32,
    /// Distance to the light; 0 for lights at infinity
    pub dist: f32,
}

impl LightValue {
    pub const NONE: LightValue = LightValue {
        val: Color::ZERO,
        pdf: 0.0,
        dist: 0.0,
    };

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.pdf > 0.0 && self.val.max_element() > 0.0
    }
}

/// A source of illumination.
pub trait Light: Send + Sync {
    /// Sample a direction from `isec` toward this light.
    fn sample(&self, isec: &Intersection<'_>, param: Vec2) -> LightSample;

    /// Contribution along local direction `dir` from `isec`.
    fn eval(&self, isec: &Intersection<'_>, dir: Vec3) -> LightValue;

    /// Point lights have a delta distribution: no MIS and no BSDF half.
    fn is_point_light(&self) -> bool {
        false
    }

    /// Radiance this light adds to rays escaping along world direction
    /// `dir`. Only lights at infinity contribute.
    fn background(&self, _dir: Vec3) -> Color {
        Color::ZERO
    }

    /// True if `background` can be non-zero.
    fn is_environ_light(&self) -> bool {
        false
    }

    /// One-time setup once the scene's surfaces are final.
    fn scene_setup(&mut self, _scene_bbox: &Aabb) {}

    /// Check parameters.
    fn validate(&self) -> RenderResult<()> {
        Ok(())
    }
}

pub(crate) fn check_intensity(what: &str, color: Color) -> RenderResult<()> {
    if !color.is_finite() || color.min_element() < 0.0 {
        return Err(RenderError::InvalidLight(format!(
            "{} has a negative or non-finite intensity {}",
            what, color
        )));
    }
    Ok(())
}
