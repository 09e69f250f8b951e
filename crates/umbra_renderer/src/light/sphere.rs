use umbra_math::{Color, Frame, Vec2, Vec3};

use super::{check_intensity, Light, LightSample, LightValue};
use crate::error::{RenderError, RenderResult};
use crate::intersect::Intersection;
use crate::sampling::{uniform_cone, uniform_cone_pdf, uniform_sphere, UNIFORM_SPHERE_PDF};
use crate::surface::sphere_hit;

/// Spherical light sampled over the cone it subtends, which wastes no
/// samples on its hidden side.
pub struct SphereLight {
    center: Vec3,
    radius: f32,
    radiance: Color,
}

impl SphereLight {
    pub fn new(center: Vec3, radius: f32, radiance: Color) -> Self {
        Self {
            center,
            radius,
            radiance,
        }
    }

    /// Cosine of the half-angle subtended from `pos`, or `None` from inside.
    fn cone(&self, pos: Vec3) -> Option<(Frame, f32)> {
        let delta = self.center - pos;
        let dist = delta.length();
        if dist <= self.radius {
            return None;
        }
        let sin_max = self.radius / dist;
        let cos_max = (1.0 - sin_max * sin_max).max(0.0).sqrt();
        Some((Frame::from_z(pos, delta / dist), cos_max))
    }

    fn hit_dist(&self, pos: Vec3, dir: Vec3) -> Option<f32> {
        sphere_hit(self.center, self.radius, pos, dir, 0.0, f32::INFINITY)
    }
}

impl Light for SphereLight {
    fn sample(&self, isec: &Intersection<'_>, param: Vec2) -> LightSample {
        let pos = isec.pos();
        let (dir, pdf) = match self.cone(pos) {
            Some((frame, cos_max)) => (frame.from(uniform_cone(param, cos_max)), uniform_cone_pdf(cos_max)),
            None => (uniform_sphere(param), UNIFORM_SPHERE_PDF),
        };
        if pdf <= 0.0 {
            return LightSample::NONE;
        }
        // Rays grazing the silhouette can miss numerically; use the tangent
        // distance then.
        let dist = self.hit_dist(pos, dir).unwrap_or_else(|| {
            let d2 = (self.center - pos).length_squared() - self.radius * self.radius;
            d2.max(0.0).sqrt()
        });
        LightSample {
            val: self.radiance,
            pdf,
            dir: isec.normal_frame.to(dir),
            dist,
        }
    }

    fn eval(&self, isec: &Intersection<'_>, dir: Vec3) -> LightValue {
        let pos = isec.pos();
        let world = isec.normal_frame.from(dir);
        let Some(dist) = self.hit_dist(pos, world) else {
            return LightValue::NONE;
        };
        let pdf = match self.cone(pos) {
            Some((_, cos_max)) => uniform_cone_pdf(cos_max),
            None => UNIFORM_SPHERE_PDF,
        };
        LightValue {
            val: self.radiance,
            pdf,
            dist,
        }
    }

    fn validate(&self) -> RenderResult<()> {
        check_intensity("sphere light", self.radiance)?;
        if !(self.radius > 0.0) {
            return Err(RenderError::InvalidLight(format!(
                "sphere light radius {} must be positive",
                self.radius
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderContext;
    use crate::material::Lambert;
    use crate::media::MediaStack;
    use crate::scene::Scene;
    use crate::surface::Sphere;
    use crate::testing::{assert_chi2, isec_at};
    use std::f32::consts::PI;
    use std::sync::Arc;
    use umbra_core::RenderConfig;

    #[test]
    fn test_sample_pdf_matches_eval() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Lambert::new(Color::ONE)));
        let isec = isec_at(&sphere, Vec3::Z, &MediaStack::new(), &ctx);

        let light = SphereLight::new(Vec3::new(1.0, 0.5, 2.0), 1.2, Color::ONE);
        assert_chi2(
            |p| {
                let s = light.sample(&isec, p);
                s.is_valid().then_some(s.dir)
            },
            |d| light.eval(&isec, d).pdf,
            100_000,
            5,
        );
    }

    #[test]
    fn test_solid_angle() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Lambert::new(Color::ONE)));
        let isec = isec_at(&sphere, Vec3::Z, &MediaStack::new(), &ctx);

        // sin(half-angle) = 0.5, so the cone has half-angle 30 degrees
        let light = SphereLight::new(Vec3::new(0.0, 0.0, 2.0), 1.0, Color::ONE);
        let v = light.eval(&isec, Vec3::Z);
        let solid_angle = 2.0 * PI * (1.0 - 30f32.to_radians().cos());
        assert!((v.pdf - 1.0 / solid_angle).abs() < 1e-3);
        assert!((v.dist - 1.0).abs() < 1e-4);

        // from inside, every direction sees the light
        let inside = SphereLight::new(Vec3::ZERO, 3.0, Color::ONE);
        let v = inside.eval(&isec, -Vec3::Z);
        assert!((v.pdf - UNIFORM_SPHERE_PDF).abs() < 1e-6);
        assert!((v.dist - 3.0).abs() < 1e-4);
    }
}
