//! Solid refractive dielectric.

use umbra_math::{mirror, refraction, Color, Vec2, Vec3};

use super::{alloc_bsdf, check_color, check_ior, Fresnel, Material};
use crate::bsdf::{Bsdf, BsdfFlags, BsdfSample, BsdfValue};
use crate::context::RenderContext;
use crate::error::RenderResult;
use crate::intersect::Intersection;
use crate::media::Medium;

/// Glass filled with `medium`; rays refracted into it push the medium on
/// their media stack.
#[derive(Debug, Clone)]
pub struct Glass {
    pub medium: Medium,
}

impl Glass {
    pub fn new(ior: f32, absorption: Color) -> Self {
        Self {
            medium: Medium::new(ior, absorption),
        }
    }
}

impl Material for Glass {
    fn get_bsdf<'a>(
        &'a self,
        isec: &Intersection<'a>,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn Bsdf> {
        let entering = !isec.back;
        let (old_ior, new_ior) = if entering {
            (isec.medium.ior, self.medium.ior)
        } else {
            (self.medium.ior, isec.enclosing_medium.ior)
        };
        Some(alloc_bsdf(
            ctx,
            GlassBsdf {
                v: isec.v,
                old_ior,
                new_ior,
            },
        ))
    }

    fn medium(&self) -> Option<&Medium> {
        Some(&self.medium)
    }

    fn validate(&self) -> RenderResult<()> {
        check_ior("glass", self.medium.ior)?;
        check_color("glass", "absorption", self.medium.absorption)
    }
}

struct GlassBsdf {
    v: Vec3,
    old_ior: f32,
    new_ior: f32,
}

impl Bsdf for GlassBsdf {
    fn sample(&self, param: Vec2, flags: BsdfFlags) -> BsdfSample {
        if !flags.contains(BsdfFlags::SPECULAR) {
            return BsdfSample::NONE;
        }
        let want_refl = flags.contains(BsdfFlags::REFLECTIVE);
        let want_xmit = flags.contains(BsdfFlags::TRANSMISSIVE);
        if !(want_refl || want_xmit) {
            return BsdfSample::NONE;
        }

        let cos_refl = self.v.z.abs();
        let refl = Fresnel::new(self.old_ior, self.new_ior).reflectance(cos_refl);
        let xmit_dir = refraction(-self.v, Vec3::Z, self.old_ior, self.new_ior);
        let (xmit, cos_xmit) = match xmit_dir {
            Some(d) => {
                let cos_xmit = -d.z;
                (1.0 - Fresnel::new(self.new_ior, self.old_ior).reflectance(cos_xmit), cos_xmit)
            }
            None => (0.0, 0.0),
        };

        let xmit_prob = match (want_refl, want_xmit) {
            (false, true) => 1.0,
            (true, false) => 0.0,
            _ if xmit + refl > 0.0 => xmit / (xmit + refl),
            _ => 0.0,
        };

        if param.x < xmit_prob {
            match xmit_dir {
                Some(dir) if cos_xmit > 0.0 => BsdfSample::new(
                    Color::splat(xmit / cos_xmit),
                    xmit_prob,
                    dir,
                    BsdfFlags::SPECULAR | BsdfFlags::TRANSMISSIVE,
                ),
                _ => BsdfSample::NONE,
            }
        } else if cos_refl > 0.0 {
            BsdfSample::new(
                Color::splat(refl / cos_refl),
                1.0 - xmit_prob,
                mirror(self.v, Vec3::Z),
                BsdfFlags::SPECULAR | BsdfFlags::REFLECTIVE,
            )
        } else {
            BsdfSample::NONE
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
