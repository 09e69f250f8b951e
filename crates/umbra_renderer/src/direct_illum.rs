//! Direct lighting: light sampling combined with BSDF sampling by multiple
//! importance sampling.

use umbra_math::{Color, Ray, Vec2, Vec3};

use crate::bsdf::{Bsdf, BsdfFlags};
use crate::context::RenderContext;
use crate::intersect::Intersection;
use crate::light::Light;
use crate::sample::{Sample, SampleLayout, UvChannel};
use crate::scene::Scene;

/// End of shadow rays toward lights at infinity.
pub const HORIZON: f32 = 1e10;

/// Power-heuristic (exponent 2) weight for a sample drawn from a strategy
/// with density `pdf` taking `n` samples, against one with `other_pdf` and
/// `other_n`.
pub fn mis_sample_weight(pdf: f32, n: f32, other_pdf: f32, other_n: f32) -> f32 {
    let term = pdf * n;
    let other = other_pdf * other_n;
    if term > 1e10 {
        1.0
    } else if other > 1e10 {
        0.0
    } else {
        let denom = term * term + other * other;
        if denom > 0.0 {
            term * pdf / denom
        } else {
            0.0
        }
    }
}

/// Transmittance from `isec` toward world direction `dir` up to `dist`
/// (0 for lights at infinity), or `None` if the light is blocked.
fn shadow(isec: &Intersection<'_>, dir: Vec3, dist: f32, ctx: &RenderContext<'_>) -> Option<Color> {
    let min_trace = ctx.params.min_trace;
    let end = if dist > 0.0 { dist - min_trace } else { HORIZON };
    if end <= min_trace {
        return Some(Color::ONE);
    }
    let ray = Ray::new(isec.pos(), dir, min_trace, end);
    let through = ctx.scene.shadow(&ray, &isec.medium, isec.shadow_ignore(), ctx)?;
    let travelled = if dist > 0.0 { dist } else { HORIZON };
    Some(through * isec.medium.transmittance(travelled))
}

/// Radiance reflected from `light` toward the viewer at `isec`, estimated
/// from one light sample and one BSDF sample.
pub fn sample_light(
    isec: &Intersection<'_>,
    bsdf: &dyn Bsdf,
    light: &dyn Light,
    light_param: Vec2,
    bsdf_param: Vec2,
    flags: BsdfFlags,
    ctx: &RenderContext<'_>,
) -> Color {
    let point = light.is_point_light();
    let mut radiance = Color::ZERO;

    let ls = light.sample(isec, light_param);
    if ls.is_valid() {
        let bv = bsdf.eval(ls.dir, flags);
        if bv.val.max_element() > 0.0 {
            let world = isec.normal_frame.from(ls.dir);
            if let Some(trans) = shadow(isec, world, ls.dist, ctx) {
                let weight = if point {
                    1.0
                } else {
                    mis_sample_weight(ls.pdf, 1.0, bv.pdf, 1.0)
                };
                radiance += ls.val * trans * bv.val * (isec.cos_n(ls.dir).abs() * weight / ls.pdf);
            }
        }
    }

    if !point {
        let bs = bsdf.sample(bsdf_param, flags);
        if bs.is_valid() && !bs.flags.contains(BsdfFlags::SPECULAR) {
            let lv = light.eval(isec, bs.dir);
            if lv.is_valid() {
                let world = isec.normal_frame.from(bs.dir);
                if let Some(trans) = shadow(isec, world, lv.dist, ctx) {
                    let weight = mis_sample_weight(bs.pdf, 1.0, lv.pdf, 1.0);
                    radiance += lv.val * trans * bs.val * (isec.cos_n(bs.dir).abs() * weight / bs.pdf);
                }
            }
        }
    }

    if radiance.is_finite() {
        radiance
    } else {
        Color::ZERO
    }
}

/// Direct lighting from every light in the scene, using two sample
/// channels per light.
pub struct DirectIllum {
    light_channels: Vec<UvChannel>,
    bsdf_channels: Vec<UvChannel>,
    num_samples: u32,
}

impl DirectIllum {
    /// Reserve `num_samples` light and BSDF values per light in `layout`.
    pub fn new(layout: &mut SampleLayout, scene: &Scene, num_samples: u32) -> Self {
        let count = if num_samples > 0 { scene.lights().len() } else { 0 };
        let light_channels = (0..count).map(|_| layout.add_uv_channel(num_samples)).collect();
        let bsdf_channels = (0..count).map(|_| layout.add_uv_channel(num_samples)).collect();
        Self {
            light_channels,
            bsdf_channels,
            num_samples,
        }
    }

    /// Light sampling without channels, for use with
    /// [`sample_all_lights_random`](Self::sample_all_lights_random) only.
    pub fn random(num_samples: u32) -> Self {
        Self {
            light_channels: Vec::new(),
            bsdf_channels: Vec::new(),
            num_samples,
        }
    }

    /// True if light sampling is enabled.
    pub fn enabled(&self) -> bool {
        self.num_samples > 0
    }

    /// Sum over lights of the average of `num_samples` estimates, with
    /// parameters from the pre-generated channels.
    pub fn sample_all_lights(
        &self,
        isec: &Intersection<'_>,
        sample: &Sample<'_>,
        flags: BsdfFlags,
        ctx: &RenderContext<'_>,
    ) -> Color {
        let Some(bsdf) = isec.bsdf else {
            return Color::ZERO;
        };
        if !self.enabled() || bsdf.supports(flags).is_empty() {
            return Color::ZERO;
        }

        let scale = 1.0 / self.num_samples as f32;
        ctx.scene
            .lights()
            .iter()
            .zip(self.light_channels.iter().zip(&self.bsdf_channels))
            .map(|(light, (&lch, &bch))| {
                let light_params = sample.uvs(lch);
                let bsdf_params = sample.uvs(bch);
                let sum: Color = light_params
                    .iter()
                    .zip(bsdf_params)
                    .map(|(&lp, &bp)| sample_light(isec, bsdf, light.as_ref(), lp, bp, flags, ctx))
                    .sum();
                sum * scale
            })
            .sum()
    }

    /// Same as [`sample_all_lights`](Self::sample_all_lights) with fresh
    /// random parameters, for path vertices past the pre-generated ones.
    pub fn sample_all_lights_random(
        &self,
        isec: &Intersection<'_>,
        flags: BsdfFlags,
        ctx: &RenderContext<'_>,
    ) -> Color {
        let Some(bsdf) = isec.bsdf else {
            return Color::ZERO;
        };
        if !self.enabled() || bsdf.supports(flags).is_empty() {
            return Color::ZERO;
        }

        let scale = 1.0 / self.num_samples as f32;
        let mut total = Color::ZERO;
        for light in ctx.scene.lights() {
            for _ in 0..self.num_samples {
                let lp = Vec2::new(ctx.random(), ctx.random());
                let bp = Vec2::new(ctx.random(), ctx.random());
                total += sample_light(isec, bsdf, light.as_ref(), lp, bp, flags, ctx) * scale;
            }
        }
        total
    }
}
