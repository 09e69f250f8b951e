use umbra_math::{Color, Vec2, Vec3};

use super::{check_intensity, Light, LightSample, LightValue};
use crate::error::{RenderError, RenderResult};
use crate::intersect::Intersection;

/// Spotlight cone with a smooth edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spot {
    /// Axis of the cone, pointing away from the light
    dir: Vec3,
    cos_outer: f32,
    cos_inner: f32,
}

impl Spot {
    /// Cone of full angle `angle` (degrees) whose last `fringe` degrees fade
    /// out.
    pub fn new(dir: Vec3, angle: f32, fringe: f32) -> Self {
        let half = (angle * 0.5).to_radians();
        let inner = (half - fringe.to_radians()).max(0.0);
        Self {
            dir: dir.normalize_or_zero(),
            cos_outer: half.cos(),
            cos_inner: inner.cos(),
        }
    }

    /// Fraction of the light's intensity emitted along `dir`.
    pub fn factor(&self, dir: Vec3) -> f32 {
        let c = self.dir.dot(dir);
        if c >= self.cos_inner {
            1.0
        } else if c <= self.cos_outer {
            0.0
        } else {
            let t = (c - self.cos_outer) / (self.cos_inner - self.cos_outer);
            t * t * (3.0 - 2.0 * t)
        }
    }
}

/// Infinitesimal light, optionally restricted to a cone.
pub struct PointLight {
    pos: Vec3,
    intensity: Color,
    spot: Option<Spot>,
}

impl PointLight {
    pub fn new(pos: Vec3, intensity: Color) -> Self {
        Self {
            pos,
            intensity,
            spot: None,
        }
    }

    pub fn with_spot(mut self, spot: Spot) -> Self {
        self.spot = Some(spot);
        self
    }
}

impl Light for PointLight {
    fn sample(&self, isec: &Intersection<'_>, _param: Vec2) -> LightSample {
        let delta = self.pos - isec.pos();
        let dist2 = delta.length_squared();
        if dist2 <= 0.0 {
            return LightSample::NONE;
        }
        let dist = dist2.sqrt();
        let dir = delta / dist;

        let spot = self.spot.map_or(1.0, |s| s.factor(-dir));
        if spot <= 0.0 {
            return LightSample::NONE;
        }

        LightSample {
            val: self.intensity * (spot / dist2),
            pdf: 1.0,
            dir: isec.normal_frame.to(dir),
            dist,
        }
    }

    fn eval(&self, _isec: &Intersection<'_>, _dir: Vec3) -> LightValue {
        LightValue::NONE
    }

    fn is_point_light(&self) -> bool {
        true
    }

    fn validate(&self) -> RenderResult<()> {
        check_intensity("point light", self.intensity)?;
        if !self.pos.is_finite() {
            return Err(RenderError::InvalidLight(format!(
                "point light position {} is not finite",
                self.pos
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
    use crate::testing::isec_at;
    use std::sync::Arc;
    use umbra_core::RenderConfig;

    #[test]
    fn test_inverse_square() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Lambert::new(Color::ONE)));
        let isec = isec_at(&sphere, Vec3::Z, &MediaStack::new(), &ctx);

        let light = PointLight::new(Vec3::new(0.0, 0.0, 2.0), Color::splat(8.0));
        let s = light.sample(&isec, Vec2::ZERO);
        assert_eq!(s.pdf, 1.0);
        assert!((s.val - Color::splat(2.0)).length() < 1e-5);
        assert!((s.dir - Vec3::Z).length() < 1e-5);
        assert!((s.dist - 2.0).abs() < 1e-5);
        assert!(!light.eval(&isec, s.dir).is_valid());
    }

    #[test]
    fn test_spot_cone() {
        let spot = Spot::new(-Vec3::Z, 60.0, 10.0);
        assert_eq!(spot.factor(-Vec3::Z), 1.0);
        assert_eq!(spot.factor(Vec3::X), 0.0);
        // inside the 20..30 degree fringe
        let edge = Vec3::new(25f32.to_radians().sin(), 0.0, -25f32.to_radians().cos());
        let f = spot.factor(edge);
        assert!(f > 0.0 && f < 1.0, "{}", f);
    }

    #[test]
    fn test_spot_outside_cone_is_dark() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Lambert::new(Color::ONE)));
        let isec = isec_at(&sphere, Vec3::Z, &MediaStack::new(), &ctx);

        // spot pointing away from the origin
        let light = PointLight::new(Vec3::new(0.0, 0.0, 2.0), Color::ONE)
            .with_spot(Spot::new(Vec3::Z, 40.0, 0.0));
        assert!(!light.sample(&isec, Vec2::ZERO).is_valid());
    }
}
