use umbra_math::{Aabb, Color, Frame, Vec2, Vec3};

use super::{check_intensity, Light, LightSample, LightValue};
use crate::error::{RenderError, RenderResult};
use crate::intersect::Intersection;
use crate::sampling::{uniform_cone, uniform_cone_pdf};
use crate::surface::sphere_hit;

/// A distant light such as the sun: radiance arriving from a small cone of
/// directions. With a zero angle it degenerates to a directional light whose
/// `intensity` is irradiance.
pub struct FarLight {
    /// Unit direction toward the light
    dir: Vec3,
    frame: Frame,
    cos_half: f32,
    pdf: f32,
    intensity: Color,
    /// Scene bounding sphere, which shadow rays never need to leave
    bound: Option<(Vec3, f32)>,
}

impl FarLight {
    /// `angle` is the full apparent angle in radians.
    pub fn new(dir: Vec3, angle: f32, intensity: Color) -> Self {
        let dir = dir.normalize_or_zero();
        let cos_half = (angle * 0.5).cos();
        Self {
            dir,
            frame: Frame::from_z(Vec3::ZERO, dir),
            cos_half,
            pdf: uniform_cone_pdf(cos_half),
            intensity,
            bound: None,
        }
    }

    fn is_directional(&self) -> bool {
        self.pdf <= 0.0
    }

    /// Distance from `pos` to the edge of the scene along `dir`; 0 if the
    /// scene bounds are unknown.
    fn exit_dist(&self, pos: Vec3, dir: Vec3) -> f32 {
        self.bound
            .and_then(|(center, radius)| sphere_hit(center, radius, pos, dir, 0.0, f32::INFINITY))
            .unwrap_or(0.0)
    }
}

impl Light for FarLight {
    fn sample(&self, isec: &Intersection<'_>, param: Vec2) -> LightSample {
        let pos = isec.pos();
        if self.is_directional() {
            return LightSample {
                val: self.intensity,
                pdf: 1.0,
                dir: isec.normal_frame.to(self.dir),
                dist: self.exit_dist(pos, self.dir),
            };
        }
        let dir = self.frame.from(uniform_cone(param, self.cos_half));
        LightSample {
            val: self.intensity,
            pdf: self.pdf,
            dir: isec.normal_frame.to(dir),
            dist: self.exit_dist(pos, dir),
        }
    }

    fn eval(&self, isec: &Intersection<'_>, dir: Vec3) -> LightValue {
        if self.is_directional() {
            return LightValue::NONE;
        }
        let world = isec.normal_frame.from(dir);
        if world.dot(self.dir) < self.cos_half {
            return LightValue::NONE;
        }
        LightValue {
            val: self.intensity,
            pdf: self.pdf,
            dist: self.exit_dist(isec.pos(), world),
        }
    }

    fn is_point_light(&self) -> bool {
        self.is_directional()
    }

    fn background(&self, dir: Vec3) -> Color {
        if !self.is_directional() && dir.dot(self.dir) >= self.cos_half {
            self.intensity
        } else {
            Color::ZERO
        }
    }

    fn is_environ_light(&self) -> bool {
        !self.is_directional()
    }

    fn scene_setup(&mut self, scene_bbox: &Aabb) {
        if scene_bbox.is_empty() || !scene_bbox.is_finite() {
            self.bound = None;
            return;
        }
        // A little slack so points on the boundary stay inside
        let radius = scene_bbox.diameter() * 0.5;
        self.bound = Some((scene_bbox.centroid(), radius * 1.01 + 1e-3));
    }

    fn validate(&self) -> RenderResult<()> {
        check_intensity("far light", self.intensity)?;
        if self.dir == Vec3::ZERO {
            return Err(RenderError::InvalidLight("far light has no direction".into()));
        }
        Ok(())
    }
}
