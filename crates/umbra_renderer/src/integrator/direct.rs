use umbra_core::RenderConfig;
use umbra_math::{Color, Ray, Vec2};

use super::{sanitize, Integrator, Tint};
use crate::bsdf::{Bsdf, BsdfFlags};
use crate::context::RenderContext;
use crate::direct_illum::{DirectIllum, HORIZON};
use crate::intersect::Intersection;
use crate::media::MediaStack;
use crate::sample::{Sample, SampleLayout};
use crate::scene::Scene;

/// Depth after which russian roulette may end the recursion.
const RR_DEPTH: u32 = 5;
const RR_TERMINATE_PROB: f32 = 0.5;

/// Direct lighting at each hit, plus recursion along perfectly specular
/// reflection and transmission.
pub struct DirectIntegrator {
    direct: DirectIllum,
    max_depth: u32,
    min_trace: f32,
    background_alpha: f32,
}

impl DirectIntegrator {
    pub fn new(layout: &mut SampleLayout, scene: &Scene, params: &RenderConfig) -> Self {
        Self {
            direct: DirectIllum::new(layout, scene, params.direct_samples),
            max_depth: params.max_depth,
            min_trace: params.min_trace,
            background_alpha: params.background_alpha,
        }
    }

    fn li_depth(
        &self,
        ray: Ray,
        media: &MediaStack,
        sample: &Sample<'_>,
        depth: u32,
        ctx: &RenderContext<'_>,
    ) -> Color {
        let mut rr_scale = 1.0;
        if depth > RR_DEPTH {
            if ctx.random() < RR_TERMINATE_PROB {
                return Color::ZERO;
            }
            rr_scale = 1.0 / (1.0 - RR_TERMINATE_PROB);
        }

        let mut isec_ray = ray.with_t1(HORIZON);
        let radiance = match ctx.scene.intersect(&mut isec_ray, ctx) {
            Some(info) => {
                let isec = info.make_intersect(media, ctx);
                self.lo(&isec, media, sample, depth, ctx)
            }
            None => ctx.scene.background(isec_ray.dir),
        };

        radiance * media.medium().transmittance(isec_ray.t1) * rr_scale
    }

    /// Light leaving `isec` toward the viewer.
    fn lo(
        &self,
        isec: &Intersection<'_>,
        media: &MediaStack,
        sample: &Sample<'_>,
        depth: u32,
        ctx: &RenderContext<'_>,
    ) -> Color {
        let mut radiance = isec.le();
        let Some(bsdf) = isec.bsdf else {
            return radiance;
        };

        radiance += self
            .direct
            .sample_all_lights(isec, sample, BsdfFlags::NON_SPECULAR, ctx);

        if depth < self.max_depth {
            radiance += self.specular(isec, bsdf, BsdfFlags::REFLECTIVE, media, sample, depth, ctx);
            radiance += self.specular(isec, bsdf, BsdfFlags::TRANSMISSIVE, media, sample, depth, ctx);
        }
        radiance
    }

    /// Radiance arriving along the single specular direction of kind
    /// `direction`, if the BSDF has one.
    #[allow(clippy::too_many_arguments)]
    fn specular(
        &self,
        isec: &Intersection<'_>,
        bsdf: &dyn Bsdf,
        direction: BsdfFlags,
        media: &MediaStack,
        sample: &Sample<'_>,
        depth: u32,
        ctx: &RenderContext<'_>,
    ) -> Color {
        // Only one possible direction, so the parameter does not matter
        let samp = bsdf.sample(Vec2::ZERO, BsdfFlags::SPECULAR | direction);
        if !samp.is_valid() || !samp.flags.contains(BsdfFlags::SPECULAR) {
            return Color::ZERO;
        }

        let ray = Ray::new(
            isec.pos(),
            isec.normal_frame.from(samp.dir),
            self.min_trace,
            HORIZON,
        );
        let incoming = if samp.flags.contains(BsdfFlags::TRANSMISSIVE) {
            let inner = media.transmitted(isec.material.medium(), isec.back);
            self.li_depth(ray, &inner, sample, depth + 1, ctx)
        } else {
            self.li_depth(ray, media, sample, depth + 1, ctx)
        };

        incoming * samp.val * isec.cos_n(samp.dir).abs()
    }
}

impl Integrator for DirectIntegrator {
    fn li(&self, ray: Ray, media: &MediaStack, sample: &Sample<'_>, ctx: &RenderContext<'_>) -> Tint {
        let mut isec_ray = Ray::new(ray.origin, ray.dir, self.min_trace, HORIZON);
        let (radiance, alpha) = match ctx.scene.intersect(&mut isec_ray, ctx) {
            Some(info) => {
                let isec = info.make_intersect(media, ctx);
                (self.lo(&isec, media, sample, 0, ctx), 1.0)
            }
            None => (ctx.scene.background(isec_ray.dir), self.background_alpha),
        };

        let radiance = sanitize(radiance * media.medium().transmittance(isec_ray.t1));
        let alpha = if radiance != Color::ZERO { 1.0 } else { alpha };
        Tint::new(radiance, alpha)
    }
}
