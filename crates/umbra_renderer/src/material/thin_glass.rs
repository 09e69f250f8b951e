//! Infinitely thin glass sheet: reflects or passes light straight through.

use umbra_math::{intensity, mirror, Color, Vec2, Vec3};

use super::{alloc_bsdf, check_color, check_ior, Fresnel, Material};
use crate::bsdf::{Bsdf, BsdfFlags, BsdfSample, BsdfValue};
use crate::context::RenderContext;
use crate::error::RenderResult;
use crate::intersect::Intersection;
use crate::media::Medium;

#[derive(Debug, Clone)]
pub struct ThinGlass {
    /// Tint applied to transmitted light
    pub color: Color,
    pub ior: f32,
}

impl ThinGlass {
    pub fn new(color: Color, ior: f32) -> Self {
        Self { color, ior }
    }
}

impl Material for ThinGlass {
    fn get_bsdf<'a>(
        &'a self,
        isec: &Intersection<'a>,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn Bsdf> {
        Some(alloc_bsdf(
            ctx,
            ThinGlassBsdf {
                v: isec.v,
                color: self.color,
                fres: Fresnel::new(isec.medium.ior, self.ior),
            },
        ))
    }

    fn fully_occluding(&self) -> bool {
        false
    }

    fn transmittance(&self, isec: &Intersection<'_>, medium: &Medium) -> Color {
        let refl = Fresnel::new(medium.ior, self.ior).reflectance(isec.v.z);
        self.color * (1.0 - refl)
    }

    fn validate(&self) -> RenderResult<()> {
        check_color("thin_glass", "color", self.color)?;
        check_ior("thin_glass", self.ior)
    }
}

struct ThinGlassBsdf {
    v: Vec3,
    color: Color,
    fres: Fresnel,
}

impl Bsdf for ThinGlassBsdf {
    fn sample(&self, param: Vec2, flags: BsdfFlags) -> BsdfSample {
        let want_refl = flags.contains(BsdfFlags::REFLECTIVE);
        let want_xmit = flags.contains(BsdfFlags::TRANSMISSIVE);
        let cos_v = self.v.z;
        if !flags.contains(BsdfFlags::SPECULAR) || !(want_refl || want_xmit) || cos_v <= 0.0 {
            return BsdfSample::NONE;
        }

        let refl = self.fres.reflectance(cos_v);
        let xmit = self.color * (1.0 - refl);
        let xmit_intens = intensity(xmit);

        let xmit_prob = match (want_refl, want_xmit) {
            (false, true) => 1.0,
            (true, false) => 0.0,
            _ if xmit_intens + refl > 0.0 => xmit_intens / (xmit_intens + refl),
            _ => 0.0,
        };

        if param.x < xmit_prob {
            BsdfSample::new(
                xmit / cos_v,
                xmit_prob,
                -self.v,
                BsdfFlags::SPECULAR | BsdfFlags::TRANSMISSIVE,
            )
        } else {
            BsdfSample::new(
                Color::splat(refl / cos_v),
                1.0 - xmit_prob,
                mirror(self.v, Vec3::Z),
                BsdfFlags::SPECULAR | BsdfFlags::REFLECTIVE,
            )
        }
    }

    fn eval(&self, _dir: Vec3, _flags: BsdfFlags) -> BsdfValue {
        BsdfValue::NONE
    }

    fn supports(&self, limit: BsdfFlags) -> BsdfFlags {
        if limit.contains(BsdfFlags::SPECULAR) {
            (BsdfFlags::SPECULAR | BsdfFlags::REFLECTIVE | BsdfFlags::TRANSMISSIVE) & limit
        } else {
            BsdfFlags::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaStack, VACUUM};
    use crate::scene::Scene;
    use crate::surface::Sphere;
    use crate::testing::isec_at;
    use std::sync::Arc;
    use umbra_core::RenderConfig;

    #[test]
    fn test_passes_straight_through() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let material = ThinGlass::new(Color::new(1.0, 0.5, 0.5), 1.5);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(material.clone()));
        let view = Vec3::new(0.3, 0.1, 1.0).normalize();
        let isec = isec_at(&sphere, view, &MediaStack::new(), &ctx);
        let bsdf = isec.bsdf.expect("scatters");

        let s = bsdf.sample(Vec2::new(0.0, 0.5), BsdfFlags::ALL);
        assert_eq!(s.flags, BsdfFlags::SPECULAR | BsdfFlags::TRANSMISSIVE);
        assert!((s.dir + isec.v).length() < 1e-6);

        let r = bsdf.sample(Vec2::new(0.9999, 0.5), BsdfFlags::ALL);
        assert_eq!(r.flags, BsdfFlags::SPECULAR | BsdfFlags::REFLECTIVE);

        assert!(!material.fully_occluding());
        let t = material.transmittance(&isec, &VACUUM);
        assert!(t.x > 0.9 && t.x < 1.0);
        assert!((t.y - t.x * 0.5).abs() < 1e-6);
    }
}
