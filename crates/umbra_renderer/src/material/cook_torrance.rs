//! Cook-Torrance: a diffuse layer under a microfacet gloss layer.

use std::f32::consts::FRAC_1_PI;

use umbra_math::{intensity, mirror, Color, Vec2, Vec3};

use super::{alloc_bsdf, check_ior, check_tex_color, Fresnel, Ior, Material};
use crate::bsdf::{Bsdf, BsdfFlags, BsdfSample, BsdfValue};
use crate::context::RenderContext;
use crate::error::{RenderError, RenderResult};
use crate::intersect::{Intersection, ShadingGeometry};
use crate::sampling::{cosine_hemisphere, cosine_hemisphere_pdf, Beckmann};
use crate::texture::{BumpMap, TexVal};

/// Roughness above which the gloss layer is treated as diffuse.
const GLOSSY_M: f32 = 0.5;

const EPS: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct CookTorrance {
    pub color: TexVal<Color>,
    pub gloss_color: TexVal<Color>,
    /// RMS microfacet slope
    pub m: f32,
    pub ior: Ior,
    bump: Option<BumpMap>,
}

impl CookTorrance {
    pub fn new(
        color: impl Into<TexVal<Color>>,
        gloss_color: impl Into<TexVal<Color>>,
        m: f32,
        ior: Ior,
    ) -> Self {
        Self {
            color: color.into(),
            gloss_color: gloss_color.into(),
            m,
            ior,
            bump: None,
        }
    }

    pub fn with_bump(mut self, bump: BumpMap) -> Self {
        self.bump = Some(bump);
        self
    }
}

impl Material for CookTorrance {
    fn get_bsdf<'a>(
        &'a self,
        isec: &Intersection<'a>,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn Bsdf> {
        Some(alloc_bsdf(ctx, CookTorranceBsdf::new(self, isec)))
    }

    fn bump_map(&self) -> Option<&BumpMap> {
        self.bump.as_ref()
    }

    fn validate(&self) -> RenderResult<()> {
        check_tex_color("cook_torrance", "color", &self.color)?;
        check_tex_color("cook_torrance", "gloss_color", &self.gloss_color)?;
        check_ior("cook_torrance", self.ior.n)?;
        if !(self.m.is_finite() && self.m > 0.0) {
            return Err(RenderError::material(
                "cook_torrance",
                format!("roughness m must be positive, got {}", self.m),
            ));
        }
        Ok(())
    }
}

struct CookTorranceBsdf {
    geom: ShadingGeometry,
    gloss_dist: Beckmann,
    diff_col: Color,
    gloss_col: Color,
    /// Probability of sampling the diffuse layer
    diff_weight: f32,
    fres: Fresnel,
    nv: f32,
    gloss_layer: BsdfFlags,
    have_layers: BsdfFlags,
}

impl CookTorranceBsdf {
    fn new(ct: &CookTorrance, isec: &Intersection<'_>) -> Self {
        let coords = isec.tex_coords();
        let diff_col = ct.color.eval(&coords);
        let gloss_col = ct.gloss_color.eval(&coords);
        let diff_intens = intensity(diff_col);
        let gloss_intens = intensity(gloss_col);
        let total = diff_intens + gloss_intens;
        let diff_weight = if total == 0.0 { 0.0 } else { diff_intens / total };

        let gloss_layer = if ct.m < GLOSSY_M {
            BsdfFlags::GLOSSY
        } else {
            BsdfFlags::DIFFUSE
        };
        let mut have_layers = BsdfFlags::empty();
        if diff_weight > 0.0 {
            have_layers |= BsdfFlags::DIFFUSE;
        }
        if diff_weight < 1.0 {
            have_layers |= gloss_layer;
        }

        Self {
            geom: ShadingGeometry::of(isec),
            gloss_dist: Beckmann::new(ct.m),
            diff_col,
            gloss_col,
            diff_weight,
            fres: Fresnel::with_ior(isec.medium.ior, ct.ior),
            nv: isec.v.z,
            gloss_layer,
            have_layers,
        }
    }

    /// Probability of choosing the diffuse layer when sampling `layers`.
    fn layer_weight(&self, layers: BsdfFlags) -> f32 {
        if layers == BsdfFlags::DIFFUSE | self.gloss_layer {
            self.diff_weight
        } else if layers == BsdfFlags::DIFFUSE {
            1.0
        } else {
            0.0
        }
    }

    /// Combined value and pdf of the lobes in `layers` for light direction
    /// `l` and half-vector `h`.
    fn value(&self, l: Vec3, h: Vec3, layers: BsdfFlags, diff_weight: f32) -> BsdfValue {
        let nl = l.z;
        let mut col = Color::ZERO;
        let mut pdf = 0.0;

        if layers.contains(BsdfFlags::DIFFUSE) {
            pdf += cosine_hemisphere_pdf(nl) * diff_weight;
            col += self.diff_col * FRAC_1_PI;
        }

        if layers.intersects(self.gloss_layer) {
            let nh = h.z;
            let vh = self.geom.v.dot(h);
            if nh > 0.0 && vh > 0.0 && nl > 0.0 && self.nv > 0.0 {
                let d = self.gloss_dist.d(nh);
                let f = self.fres.reflectance(vh);
                let g = (2.0 * nh * self.nv.min(nl) / vh).min(1.0);
                let gloss = f * d * g / (4.0 * self.nv * nl);
                pdf += self.gloss_dist.pdf(nh) / (4.0 * vh) * (1.0 - diff_weight);
                col += self.gloss_col * gloss;
            }
        }

        BsdfValue::new(col, pdf)
    }
}

impl Bsdf for CookTorranceBsdf {
    fn sample(&self, param: Vec2, flags: BsdfFlags) -> BsdfSample {
        if !flags.contains(BsdfFlags::REFLECTIVE) {
            return BsdfSample::NONE;
        }
        let layers = flags & self.have_layers;
        if layers.is_empty() || self.geom.v.z < 0.0 {
            return BsdfSample::NONE;
        }

        let diff_weight = self.layer_weight(layers);
        let v = self.geom.v;
        let (l, h, layer) = if param.x < diff_weight {
            let u = if layers != BsdfFlags::DIFFUSE {
                param.x / diff_weight
            } else {
                param.x
            };
            let l = cosine_hemisphere(Vec2::new(u, param.y));
            (l, (v + l).normalize_or_zero(), BsdfFlags::DIFFUSE)
        } else {
            let u = (param.x - diff_weight) / (1.0 - diff_weight);
            let mut h = self.gloss_dist.sample(Vec2::new(u, param.y));
            if v.dot(h) < 0.0 {
                h = -h;
            }
            (mirror(v, h), h, self.gloss_layer)
        };

        if l.z > EPS && self.geom.cos_geom_n(l) > EPS {
            let value = self.value(l, h, layers, diff_weight);
            BsdfSample::new(value.val, value.pdf, l, BsdfFlags::REFLECTIVE | layer)
        } else {
            BsdfSample::NONE
        }
    }

    fn eval(&self, dir: Vec3, flags: BsdfFlags) -> BsdfValue {
        if !flags.contains(BsdfFlags::REFLECTIVE) || dir.z <= 0.0 {
            return BsdfValue::NONE;
        }
        let layers = flags & self.have_layers;
        if layers.is_empty() {
            return BsdfValue::NONE;
        }
        let h = (self.geom.v + dir).normalize_or_zero();
        self.value(dir, h, layers, self.layer_weight(layers))
    }

    fn supports(&self, limit: BsdfFlags) -> BsdfFlags {
        if limit.contains(BsdfFlags::REFLECTIVE) && limit.intersects(self.have_layers) {
            (BsdfFlags::REFLECTIVE | self.have_layers) & limit
        } else {
            BsdfFlags::empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaStack;
    use crate::scene::Scene;
    use crate::surface::Sphere;
    use crate::testing::{assert_chi2, hemisphere_integral, isec_at};
    use std::sync::Arc;
    use umbra_core::RenderConfig;

    fn plastic(m: f32) -> Arc<CookTorrance> {
        Arc::new(CookTorrance::new(
            Color::splat(0.4),
            Color::splat(0.4),
            m,
            Ior::dielectric(1.5),
        ))
    }

    #[test]
    fn test_pdf_matches_sampling() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, plastic(0.3));
        let isec = isec_at(&sphere, Vec3::new(0.2, 0.0, 1.0), &MediaStack::new(), &ctx);
        let bsdf = isec.bsdf.expect("scatters");

        assert_chi2(
            |p| {
                let s = bsdf.sample(p, BsdfFlags::ALL);
                s.is_valid().then_some(s.dir)
            },
            |d| bsdf.eval(d, BsdfFlags::ALL).pdf,
            300_000,
            5,
        );
    }

    #[test]
    fn test_energy_conservation() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        for m in [0.1, 0.3, 0.7] {
            let sphere = Sphere::new(Vec3::ZERO, 1.0, plastic(m));
            for view in [Vec3::Z, Vec3::new(1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.2)] {
                let isec = isec_at(&sphere, view, &MediaStack::new(), &ctx);
                let bsdf = isec.bsdf.expect("scatters");
                let albedo = hemisphere_integral(|d| bsdf.eval(d, BsdfFlags::ALL).val);
                assert!(albedo.max_element() <= 1.0, "m {} view {} albedo {}", m, view, albedo);
            }
        }
    }

    #[test]
    fn test_rough_gloss_is_diffuse_layer() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let rough = Sphere::new(Vec3::ZERO, 1.0, plastic(0.8));
        let isec = isec_at(&rough, Vec3::Z, &MediaStack::new(), &ctx);
        let bsdf = isec.bsdf.expect("scatters");
        assert_eq!(
            bsdf.supports(BsdfFlags::ALL),
            BsdfFlags::REFLECTIVE | BsdfFlags::DIFFUSE
        );

        let shiny = Sphere::new(Vec3::ZERO, 1.0, plastic(0.1));
        let isec = isec_at(&shiny, Vec3::Z, &MediaStack::new(), &ctx);
        let bsdf = isec.bsdf.expect("scatters");
        assert!(bsdf.supports(BsdfFlags::ALL).contains(BsdfFlags::GLOSSY));
        assert_eq!(bsdf.supports(BsdfFlags::TRANSMISSIVE | BsdfFlags::ALL_LAYERS), BsdfFlags::empty());
    }

    #[test]
    fn test_rejects_zero_roughness() {
        let ct = CookTorrance::new(Color::ONE, Color::ONE, 0.0, Ior::dielectric(1.5));
        assert!(ct.validate().is_err());
        assert!(plastic(0.2).validate().is_ok());
    }
}
