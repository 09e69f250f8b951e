use umbra_math::{Color, Vec2, Vec3};

use super::{check_intensity, Light, LightSample, LightValue};
use crate::error::RenderResult;
use crate::intersect::Intersection;
use crate::surface::SurfaceSampler;

/// Area light over an emitting surface. Emits from the front face only.
pub struct SurfaceLight {
    sampler: Box<dyn SurfaceSampler>,
    radiance: Color,
}

impl SurfaceLight {
    pub fn new(sampler: Box<dyn SurfaceSampler>, radiance: Color) -> Self {
        Self { sampler, radiance }
    }

    pub fn area(&self) -> f32 {
        self.sampler.area()
    }
}

impl Light for SurfaceLight {
    fn sample(&self, isec: &Intersection<'_>, param: Vec2) -> LightSample {
        let s = self.sampler.sample_from_viewpoint(isec.pos(), param);
        if s.pdf <= 0.0 || !s.pdf.is_finite() {
            return LightSample::NONE;
        }
        LightSample {
            val: self.radiance,
            pdf: s.pdf,
            dir: isec.normal_frame.to(s.dir),
            dist: s.dist,
        }
    }

    fn eval(&self, isec: &Intersection<'_>, dir: Vec3) -> LightValue {
        let world = isec.normal_frame.from(dir);
        let s = self.sampler.eval_from_viewpoint(isec.pos(), world);
        if s.pdf <= 0.0 || !s.pdf.is_finite() {
            return LightValue::NONE;
        }
        LightValue {
            val: self.radiance,
            pdf: s.pdf,
            dist: s.dist,
        }
    }

    fn validate(&self) -> RenderResult<()> {
        check_intensity("surface light", self.radiance)
    }
}
