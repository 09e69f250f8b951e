//! Mirror coating over an optional diffuse base.

use std::sync::Arc;

use umbra_math::{intensity, mirror, Color, Vec2, Vec3};

use super::{alloc_bsdf, check_ior, check_tex_color, Fresnel, Ior, Lambert, Material};
use crate::bsdf::{Bsdf, BsdfFlags, BsdfSample, BsdfValue};
use crate::context::RenderContext;
use crate::error::RenderResult;
use crate::intersect::{Intersection, ShadingGeometry};
use crate::texture::{BumpMap, TexVal};

const EPS: f32 = 1e-4;

/// Specular reflector whose Fresnel-weighted reflection is layered over an
/// underlying material.
pub struct Mirror {
    pub ior: Ior,
    pub reflectance: TexVal<Color>,
    underlying: Option<Arc<dyn Material>>,
    bump: Option<BumpMap>,
}

impl Mirror {
    /// A mirror over a Lambertian base of `color`; a constant black base is
    /// omitted.
    pub fn new(
        ior: Ior,
        reflectance: impl Into<TexVal<Color>>,
        color: impl Into<TexVal<Color>>,
    ) -> Self {
        let color = color.into();
        let black = color.as_const().is_some_and(|c| c.max_element() < EPS);
        let underlying = (!black).then(|| Arc::new(Lambert::new(color)) as Arc<dyn Material>);
        Self {
            ior,
            reflectance: reflectance.into(),
            underlying,
            bump: None,
        }
    }

    pub fn with_underlying(
        ior: Ior,
        reflectance: impl Into<TexVal<Color>>,
        underlying: Arc<dyn Material>,
    ) -> Self {
        Self {
            ior,
            reflectance: reflectance.into(),
            underlying: Some(underlying),
            bump: None,
        }
    }

    pub fn with_bump(mut self, bump: BumpMap) -> Self {
        self.bump = Some(bump);
        self
    }
}

impl Material for Mirror {
    fn get_bsdf<'a>(
        &'a self,
        isec: &Intersection<'a>,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn Bsdf> {
        let underlying = self.underlying.as_ref().and_then(|m| m.get_bsdf(isec, ctx));
        Some(alloc_bsdf(
            ctx,
            MirrorBsdf {
                geom: ShadingGeometry::of(isec),
                fres: Fresnel::with_ior(isec.medium.ior, self.ior),
                reflectance: self.reflectance.eval(&isec.tex_coords()),
                underlying,
            },
        ))
    }

    fn bump_map(&self) -> Option<&BumpMap> {
        self.bump.as_ref()
    }

    fn validate(&self) -> RenderResult<()> {
        check_tex_color("mirror", "reflectance", &self.reflectance)?;
        check_ior("mirror", self.ior.n)?;
        match &self.underlying {
            Some(m) => m.validate(),
            None => Ok(()),
        }
    }
}

struct MirrorBsdf<'a> {
    geom: ShadingGeometry,
    fres: Fresnel,
    reflectance: Color,
    underlying: Option<&'a dyn Bsdf>,
}

impl MirrorBsdf<'_> {
    const SPECULAR: BsdfFlags = BsdfFlags::SPECULAR.union(BsdfFlags::REFLECTIVE);

    /// Specular reflectance for a direction with z = `cos`.
    fn refl(&self, cos: f32) -> Color {
        self.reflectance * self.fres.reflectance(cos)
    }

    /// Probability of taking the specular branch when sampling with `flags`.
    fn specular_prob(&self, flags: BsdfFlags) -> f32 {
        if !flags.contains(Self::SPECULAR) || self.geom.cos_geom_n(self.geom.v) <= 0.0 {
            return 0.0;
        }
        match self.underlying {
            Some(u) if !u.supports(flags).is_empty() => {
                intensity(self.refl(self.geom.v.z)).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }
}

impl Bsdf for MirrorBsdf<'_> {
    fn sample(&self, param: Vec2, flags: BsdfFlags) -> BsdfSample {
        let spec_prob = self.specular_prob(flags);
        let cos_v = self.geom.v.z;

        if param.x < spec_prob {
            if cos_v <= 0.0 {
                return BsdfSample::NONE;
            }
            let refl = self.refl(cos_v);
            return BsdfSample::new(refl / cos_v, spec_prob, mirror(self.geom.v, Vec3::Z), Self::SPECULAR);
        }

        match self.underlying {
            Some(u) => {
                let u_param = Vec2::new((param.x - spec_prob) / (1.0 - spec_prob), param.y);
                let mut samp = u.sample(u_param, flags);
                samp.val *= Color::ONE - self.refl(samp.dir.z);
                samp.pdf *= 1.0 - spec_prob;
                samp
            }
            None => BsdfSample::NONE,
        }
    }

    fn eval(&self, dir: Vec3, flags: BsdfFlags) -> BsdfValue {
        match self.underlying {
            Some(u) => {
                let mut value = u.eval(dir, flags);
                value.val *= Color::ONE - self.refl(dir.z);
                value.pdf *= 1.0 - self.specular_prob(flags);
                value
            }
            None => BsdfValue::NONE,
        }
    }

    fn supports(&self, limit: BsdfFlags) -> BsdfFlags {
        let mut flags = BsdfFlags::empty();
        if limit.contains(Self::SPECULAR) {
            flags |= Self::SPECULAR;
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
    use crate::media::MediaStack;
    use crate::scene::Scene;
    use crate::surface::Sphere;
    use crate::testing::{assert_chi2, hemisphere_integral, isec_at};
    use umbra_core::RenderConfig;

    #[test]
    fn test_pure_mirror_reflects() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let material = Mirror::new(Ior::new(0.15, 3.6), Color::ONE, Color::ZERO);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(material));
        let view = Vec3::new(1.0, 0.0, 1.0).normalize();
        let isec = isec_at(&sphere, view, &MediaStack::new(), &ctx);
        let bsdf = isec.bsdf.expect("mirror scatters");

        let s = bsdf.sample(Vec2::new(0.99, 0.3), BsdfFlags::ALL);
        assert!(s.is_valid());
        assert_eq!(s.flags, BsdfFlags::SPECULAR | BsdfFlags::REFLECTIVE);
        assert_eq!(s.pdf, 1.0);
        assert!((s.dir - Vec3::new(-view.x, 0.0, view.z)).length() < 1e-5);
        // val * cos is the Fresnel reflectance
        assert!(s.val.x * s.dir.z > 0.9 && s.val.x * s.dir.z <= 1.0);

        assert!(!bsdf.sample(Vec2::splat(0.5), BsdfFlags::NON_SPECULAR).is_valid());
        assert!(!bsdf.eval(s.dir, BsdfFlags::ALL).is_valid());
    }

    #[test]
    fn test_coated_diffuse_is_consistent() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let material = Mirror::new(Ior::dielectric(1.5), Color::ONE, Color::splat(0.6));
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(material));
        let isec = isec_at(&sphere, Vec3::new(0.5, 0.0, 1.0), &MediaStack::new(), &ctx);
        let bsdf = isec.bsdf.expect("scatters");

        // the diffuse part of the mixture, sampled with all flags
        assert_chi2(
            |p| {
                let s = bsdf.sample(p, BsdfFlags::ALL);
                (s.is_valid() && !s.flags.contains(BsdfFlags::SPECULAR)).then_some(s.dir)
            },
            |d| bsdf.eval(d, BsdfFlags::ALL).pdf,
            200_000,
            21,
        );

        let albedo = hemisphere_integral(|d| bsdf.eval(d, BsdfFlags::ALL).val);
        assert!(albedo.x < 0.6 && albedo.x > 0.45, "albedo {}", albedo);
    }
}
