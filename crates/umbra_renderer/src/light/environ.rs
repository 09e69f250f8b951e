use umbra_math::{Color, Vec2, Vec3};

use super::{check_intensity, Light, LightSample, LightValue};
use crate::error::RenderResult;
use crate::intersect::Intersection;
use crate::sampling::{uniform_sphere, UNIFORM_SPHERE_PDF};

/// Constant radiance from every direction at infinity.
pub struct EnvironLight {
    radiance: Color,
}

impl EnvironLight {
    pub fn new(radiance: Color) -> Self {
        Self { radiance }
    }
}

impl Light for EnvironLight {
    fn sample(&self, _isec: &Intersection<'_>, param: Vec2) -> LightSample {
        // Uniform in any frame, so sample directly in the local one
        LightSample {
            val: self.radiance,
            pdf: UNIFORM_SPHERE_PDF,
            dir: uniform_sphere(param),
            dist: 0.0,
        }
    }

    fn eval(&self, _isec: &Intersection<'_>, _dir: Vec3) -> LightValue {
        LightValue {
            val: self.radiance,
            pdf: UNIFORM_SPHERE_PDF,
            dist: 0.0,
        }
    }

    fn background(&self, _dir: Vec3) -> Color {
        self.radiance
    }

    fn is_environ_light(&self) -> bool {
        true
    }

    fn validate(&self) -> RenderResult<()> {
        check_intensity("environment light", self.radiance)
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
    use std::sync::Arc;
    use umbra_core::RenderConfig;

    #[test]
    fn test_uniform_sampling() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Lambert::new(Color::ONE)));
        let isec = isec_at(&sphere, Vec3::Z, &MediaStack::new(), &ctx);

        let light = EnvironLight::new(Color::splat(0.5));
        assert_chi2(
            |p| Some(light.sample(&isec, p).dir),
            |d| light.eval(&isec, d).pdf,
            50_000,
            11,
        );
        assert_eq!(light.background(Vec3::X), Color::splat(0.5));
    }
}
