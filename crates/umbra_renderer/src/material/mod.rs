//! Materials and the BSDFs they build.
//!
//! A material is shared, immutable scene data. For each shaded hit it builds
//! a [`Bsdf`] in the per-sample arena; the BSDF copies whatever it needs
//! from the intersection so it never borrows it.

mod cook_torrance;
mod fresnel;
mod glass;
mod glow;
mod lambert;
mod mirror;
mod stencil;
mod thin_glass;

pub use cook_torrance::CookTorrance;
pub use fresnel::{Fresnel, Ior};
pub use glass::Glass;
pub use glow::Glow;
pub use lambert::Lambert;
pub use mirror::Mirror;
pub use stencil::Stencil;
pub use thin_glass::ThinGlass;

use umbra_math::Color;

use crate::bsdf::Bsdf;
use crate::context::RenderContext;
use crate::error::{RenderError, RenderResult};
use crate::intersect::Intersection;
use crate::media::Medium;
use crate::texture::{BumpMap, TexVal};

/// Surface appearance.
pub trait Material: Send + Sync {
    /// Build the BSDF for `isec`, or `None` if the surface does not scatter.
    fn get_bsdf<'a>(
        &'a self,
        isec: &Intersection<'a>,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn Bsdf>;

    /// Radiance emitted toward the viewer at `isec`.
    fn le(&self, _isec: &Intersection<'_>) -> Color {
        Color::ZERO
    }

    /// The emitted radiance if this material is a light source.
    fn emission(&self) -> Option<Color> {
        None
    }

    /// Height field perturbing the shading normal, if any.
    fn bump_map(&self) -> Option<&BumpMap> {
        None
    }

    /// True if shadow rays can never pass through this material.
    fn fully_occluding(&self) -> bool {
        true
    }

    /// Fraction of light passing straight through `isec`, for shadow rays
    /// travelling in `medium`.
    fn transmittance(&self, _isec: &Intersection<'_>, _medium: &Medium) -> Color {
        Color::ZERO
    }

    /// Medium filling the inside of surfaces with this material.
    fn medium(&self) -> Option<&Medium> {
        None
    }

    /// Check parameters, called once during scene setup.
    fn validate(&self) -> RenderResult<()> {
        Ok(())
    }
}

/// Place a BSDF in the arena and count it.
pub(crate) fn alloc_bsdf<'a, B: Bsdf + 'a>(ctx: &'a RenderContext<'_>, bsdf: B) -> &'a dyn Bsdf {
    ctx.count_bsdf();
    ctx.alloc(bsdf)
}

pub(crate) fn check_color(material: &str, what: &str, color: Color) -> RenderResult<()> {
    if color.is_finite() && color.min_element() >= 0.0 {
        Ok(())
    } else {
        Err(RenderError::material(
            material,
            format!("{} {:?} has negative or non-finite components", what, color),
        ))
    }
}

/// Check a possibly textured color; textures are checked when built.
pub(crate) fn check_tex_color(material: &str, what: &str, color: &TexVal<Color>) -> RenderResult<()> {
    match color.as_const() {
        Some(c) => check_color(material, what, c),
        None => Ok(()),
    }
}

pub(crate) fn check_ior(material: &str, ior: f32) -> RenderResult<()> {
    if ior.is_finite() && ior > 0.0 {
        Ok(())
    } else {
        Err(RenderError::material(material, format!("ior must be positive, got {}", ior)))
    }
}
