//! Partially transparent cut-out over another material.

use std::sync::Arc;

use umbra_math::{intensity, Color, Vec2, Vec3};

use super::{alloc_bsdf, check_color, Material};
use crate::bsdf::{Bsdf, BsdfFlags, BsdfSample, BsdfValue};
use crate::context::RenderContext;
use crate::error::{RenderError, RenderResult};
use crate::intersect::Intersection;
use crate::media::Medium;
use crate::texture::BumpMap;

pub struct Stencil {
    /// Per-channel opacity in `[0, 1]`
    pub opacity: Color,
    underlying: Arc<dyn Material>,
}

impl Stencil {
    pub fn new(opacity: Color, underlying: Arc<dyn Material>) -> Self {
        Self {
            opacity,
            underlying,
        }
    }
}

impl Material for Stencil {
    fn get_bsdf<'a>(
        &'a self,
        isec: &Intersection<'a>,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn Bsdf> {
        let mut opacity_intens = intensity(self.opacity);
        if opacity_intens < 0.001 {
            opacity_intens = 0.0;
        } else if opacity_intens > 0.999 {
            opacity_intens = 1.0;
        }

        let underlying = if opacity_intens > 0.0 {
            self.underlying.get_bsdf(isec, ctx)
        } else {
            None
        };
        if opacity_intens >= 1.0 {
            return underlying;
        }

        Some(alloc_bsdf(
            ctx,
            StencilBsdf {
                v: isec.v,
                opacity: self.opacity,
                opacity_intens,
                underlying,
            },
        ))
    }

    fn bump_map(&self) -> Option<&BumpMap> {
        self.underlying.bump_map()
    }

    fn fully_occluding(&self) -> bool {
        false
    }

    fn transmittance(&self, _isec: &Intersection<'_>, _medium: &Medium) -> Color {
        (Color::ONE - self.opacity).max(Color::ZERO)
    }

    fn validate(&self) -> RenderResult<()> {
        check_color("stencil", "opacity", self.opacity)?;
        if self.opacity.max_element() > 1.0 {
            return Err(RenderError::material(
                "stencil",
                format!("opacity {:?} exceeds 1", self.opacity),
            ));
        }
        self.underlying.validate()
    }
}

struct StencilBsdf<'a> {
    v: Vec3,
    opacity: Color,
    opacity_intens: f32,
    underlying: Option<&'a dyn Bsdf>,
}

impl StencilBsdf<'_> {
    const THROUGH: BsdfFlags = BsdfFlags::SPECULAR
        .union(BsdfFlags::TRANSMISSIVE)
        .union(BsdfFlags::TRANSLUCENT);

    fn underlying_ok(&self, flags: BsdfFlags) -> Option<&dyn Bsdf> {
        self.underlying
            .filter(|u| self.opacity_intens > 0.0 && !u.supports(flags).is_empty())
    }
}

impl Bsdf for StencilBsdf<'_> {
    fn sample(&self, param: Vec2, flags: BsdfFlags) -> BsdfSample {
        let thru_ok = self.opacity_intens < 1.0
            && flags.contains(BsdfFlags::TRANSMISSIVE | BsdfFlags::SPECULAR);
        let underlying = self.underlying_ok(flags);

        if thru_ok && (underlying.is_none() || param.x >= self.opacity_intens) {
            let cos_v = self.v.z;
            if cos_v <= 0.0 {
                return BsdfSample::NONE;
            }
            let pdf = if underlying.is_some() {
                1.0 - self.opacity_intens
            } else {
                1.0
            };
            return BsdfSample::new((Color::ONE - self.opacity) / cos_v, pdf, -self.v, Self::THROUGH);
        }

        match underlying {
            Some(u) => {
                // only reached with param.x < opacity_intens when the through
                // branch is possible
                let (u_param, weight) = if thru_ok {
                    (Vec2::new(param.x / self.opacity_intens, param.y), self.opacity_intens)
                } else {
                    (param, 1.0)
                };
                let mut samp = u.sample(u_param, flags);
                samp.val *= self.opacity;
                samp.pdf *= weight;
                samp
            }
            None => BsdfSample::NONE,
        }
    }

    fn eval(&self, dir: Vec3, flags: BsdfFlags) -> BsdfValue {
        match self.underlying_ok(flags) {
            Some(u) => {
                let thru_ok = self.opacity_intens < 1.0
                    && flags.contains(BsdfFlags::TRANSMISSIVE | BsdfFlags::SPECULAR);
                let mut value = u.eval(dir, flags);
                value.val *= self.opacity;
                if thru_ok {
                    value.pdf *= self.opacity_intens;
                }
                value
            }
            None => BsdfValue::NONE,
        }
    }

    fn supports(&self, limit: BsdfFlags) -> BsdfFlags {
        let mut flags = BsdfFlags::empty();
        if self.opacity_intens < 1.0 && limit.contains(BsdfFlags::TRANSMISSIVE | BsdfFlags::SPECULAR) {
            flags |= Self::THROUGH & limit;
        }
        if let Some(u) = self.underlying {
            flags |= u.supports(limit);
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Lambert;
    use crate::media::{MediaStack, VACUUM};
    use crate::scene::Scene;
    use crate::surface::Sphere;
    use crate::testing::{assert_chi2, isec_at};
    use umbra_core::RenderConfig;

    fn stencil(opacity: f32) -> Stencil {
        Stencil::new(Color::splat(opacity), Arc::new(Lambert::new(Color::splat(0.5))))
    }

    #[test]
    fn test_half_transparent() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let material = stencil(0.25);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(stencil(0.25)));
        let isec = isec_at(&sphere, Vec3::new(0.2, 0.0, 1.0), &MediaStack::new(), &ctx);
        let bsdf = isec.bsdf.expect("scatters");

        let through = bsdf.sample(Vec2::new(0.9, 0.5), BsdfFlags::ALL);
        assert!(through.flags.contains(BsdfFlags::TRANSMISSIVE));
        assert!((through.dir + isec.v).length() < 1e-6);
        assert!((through.pdf - 0.75).abs() < 1e-6);

        let diffuse = bsdf.sample(Vec2::new(0.1, 0.5), BsdfFlags::ALL);
        assert!(diffuse.flags.contains(BsdfFlags::DIFFUSE));
        assert!((diffuse.val.x - 0.5 * 0.25 / std::f32::consts::PI).abs() < 1e-6);

        assert_eq!(material.transmittance(&isec, &VACUUM), Color::splat(0.75));
        assert!(!material.fully_occluding());

        // the diffuse part of the mixture against eval
        assert_chi2(
            |p| {
                let s = bsdf.sample(p, BsdfFlags::ALL);
                (s.is_valid() && s.flags.contains(BsdfFlags::DIFFUSE)).then_some(s.dir)
            },
            |d| bsdf.eval(d, BsdfFlags::ALL).pdf,
            200_000,
            3,
        );
    }

    #[test]
    fn test_opaque_stencil_is_underlying() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(stencil(1.0)));
        let isec = isec_at(&sphere, Vec3::Z, &MediaStack::new(), &ctx);
        let bsdf = isec.bsdf.expect("scatters");
        assert!(!bsdf.supports(BsdfFlags::ALL).contains(BsdfFlags::TRANSMISSIVE));

        let clear = Sphere::new(Vec3::ZERO, 1.0, Arc::new(stencil(0.0)));
        let isec = isec_at(&clear, Vec3::Z, &MediaStack::new(), &ctx);
        let bsdf = isec.bsdf.expect("pass-through bsdf");
        let s = bsdf.sample(Vec2::new(0.3, 0.3), BsdfFlags::ALL);
        assert_eq!(s.pdf, 1.0);
        assert!(s.flags.contains(BsdfFlags::TRANSMISSIVE));
        assert!(!bsdf.sample(Vec2::new(0.3, 0.3), BsdfFlags::NON_SPECULAR).is_valid());
    }
}
