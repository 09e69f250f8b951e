use std::sync::Arc;

use umbra_math::Color;

use super::{check_color, Material};
use crate::bsdf::Bsdf;
use crate::context::RenderContext;
use crate::error::RenderResult;
use crate::intersect::Intersection;
use crate::media::Medium;
use crate::texture::BumpMap;

/// Light-emitting material. Emits `color` from front faces and otherwise
/// behaves like its underlying material, if any.
pub struct Glow {
    pub color: Color,
    underlying: Option<Arc<dyn Material>>,
}

impl Glow {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            underlying: None,
        }
    }

    pub fn with_underlying(color: Color, underlying: Arc<dyn Material>) -> Self {
        Self {
            color,
            underlying: Some(underlying),
        }
    }
}

impl Material for Glow {
    fn get_bsdf<'a>(
        &'a self,
        isec: &Intersection<'a>,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn Bsdf> {
        self.underlying.as_ref().and_then(|m| m.get_bsdf(isec, ctx))
    }

    fn le(&self, isec: &Intersection<'_>) -> Color {
        if isec.back {
            Color::ZERO
        } else {
            self.color
        }
    }

    fn emission(&self) -> Option<Color> {
        Some(self.color)
    }

    fn bump_map(&self) -> Option<&BumpMap> {
        self.underlying.as_ref().and_then(|m| m.bump_map())
    }

    fn fully_occluding(&self) -> bool {
        self.underlying.as_ref().map_or(true, |m| m.fully_occluding())
    }

    fn transmittance(&self, isec: &Intersection<'_>, medium: &Medium) -> Color {
        self.underlying
            .as_ref()
            .map_or(Color::ZERO, |m| m.transmittance(isec, medium))
    }

    fn medium(&self) -> Option<&Medium> {
        self.underlying.as_ref().and_then(|m| m.medium())
    }

    fn validate(&self) -> RenderResult<()> {
        check_color("glow", "color", self.color)?;
        match &self.underlying {
            Some(m) => m.validate(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Lambert;
    use crate::media::MediaStack;
    use crate::scene::Scene;
    use crate::surface::{Sphere, Surface};
    use crate::testing::isec_at;
    use umbra_core::RenderConfig;
    use umbra_math::Vec3;

    #[test]
    fn test_emits_from_front_only() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Glow::new(Color::splat(3.0))));

        let front = isec_at(&sphere, Vec3::Z, &MediaStack::new(), &ctx);
        assert_eq!(front.le(), Color::splat(3.0));
        assert!(front.bsdf.is_none());

        let back = isec_at(&sphere, -Vec3::Z, &MediaStack::new(), &ctx);
        assert!(back.back);
        assert_eq!(back.le(), Color::ZERO);
    }

    #[test]
    fn test_underlying_scatters() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let glow = Glow::with_underlying(Color::ONE, Arc::new(Lambert::new(Color::splat(0.5))));
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(glow));

        let isec = isec_at(&sphere, Vec3::Z, &MediaStack::new(), &ctx);
        assert!(isec.bsdf.is_some());
        assert!(sphere.material().emission().is_some());
        assert!(sphere.material().fully_occluding());
    }
}
