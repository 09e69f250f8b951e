use std::f32::consts::FRAC_1_PI;

use umbra_math::{Color, Vec2, Vec3};

use super::{alloc_bsdf, check_tex_color, Material};
use crate::bsdf::{Bsdf, BsdfFlags, BsdfSample, BsdfValue};
use crate::context::RenderContext;
use crate::error::RenderResult;
use crate::intersect::{Intersection, ShadingGeometry};
use crate::sampling::{cosine_hemisphere, cosine_hemisphere_pdf};
use crate::texture::{BumpMap, TexVal};

/// Ideal diffuse reflector.
#[derive(Debug, Clone)]
pub struct Lambert {
    pub color: TexVal<Color>,
    bump: Option<BumpMap>,
}

impl Lambert {
    pub fn new(color: impl Into<TexVal<Color>>) -> Self {
        Self {
            color: color.into(),
            bump: None,
        }
    }

    pub fn with_bump(mut self, bump: BumpMap) -> Self {
        self.bump = Some(bump);
        self
    }
}

impl Material for Lambert {
    fn get_bsdf<'a>(
        &'a self,
        isec: &Intersection<'a>,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn Bsdf> {
        let color = self.color.eval(&isec.tex_coords());
        Some(alloc_bsdf(ctx, LambertBsdf::new(color, ShadingGeometry::of(isec))))
    }

    fn bump_map(&self) -> Option<&BumpMap> {
        self.bump.as_ref()
    }

    fn validate(&self) -> RenderResult<()> {
        check_tex_color("lambert", "color", &self.color)
    }
}

/// Cosine-distributed diffuse reflection.
pub(crate) struct LambertBsdf {
    geom: ShadingGeometry,
    color: Color,
}

impl LambertBsdf {
    pub(crate) fn new(color: Color, geom: ShadingGeometry) -> Self {
        Self { geom, color }
    }

    const FLAGS: BsdfFlags = BsdfFlags::REFLECTIVE.union(BsdfFlags::DIFFUSE);
}

impl Bsdf for LambertBsdf {
    fn sample(&self, param: Vec2, flags: BsdfFlags) -> BsdfSample {
        if flags.contains(Self::FLAGS) {
            let dir = cosine_hemisphere(param);
            if dir.z > 0.0 && self.geom.cos_geom_n(dir) > 0.0 {
                return BsdfSample::new(
                    self.color * FRAC_1_PI,
                    cosine_hemisphere_pdf(dir.z),
                    dir,
                    Self::FLAGS,
                );
            }
        }
        BsdfSample::NONE
    }

    fn eval(&self, dir: Vec3, flags: BsdfFlags) -> BsdfValue {
        if flags.contains(Self::FLAGS) && dir.z > 0.0 {
            BsdfValue::new(self.color * FRAC_1_PI, cosine_hemisphere_pdf(dir.z))
        } else {
            BsdfValue::NONE
        }
    }

    fn supports(&self, limit: BsdfFlags) -> BsdfFlags {
        if limit.contains(BsdfFlags::REFLECTIVE) {
            Self::FLAGS & limit
        } else {
            BsdfFlags::empty()
        }
    }
}
