use umbra_core::RenderConfig;
use umbra_math::{intensity, Color, Ray, Vec2};

use super::{sanitize, Integrator, Tint};
use crate::bsdf::BsdfFlags;
use crate::context::RenderContext;
use crate::direct_illum::{DirectIllum, HORIZON};
use crate::media::MediaStack;
use crate::sample::{FloatChannel, Sample, SampleLayout, UvChannel};
use crate::scene::Scene;

/// Unidirectional path tracer.
///
/// The first `min_path_len` vertices draw their light and BSDF parameters
/// from stratified sample channels; later vertices use plain random
/// numbers and are subject to russian roulette. Each roulette decision draws
/// from its own 1D channel, stratified over the pixel's samples.
pub struct PathIntegrator {
    vertex_direct: Vec<DirectIllum>,
    bsdf_channels: Vec<UvChannel>,
    roulette_channels: Vec<FloatChannel>,
    random_direct: DirectIllum,
    min_path_len: u32,
    max_path_len: u32,
    min_trace: f32,
    background_alpha: f32,
}

impl PathIntegrator {
    pub fn new(layout: &mut SampleLayout, scene: &Scene, params: &RenderConfig) -> Self {
        let vertex_direct = (0..params.min_path_len)
            .map(|_| DirectIllum::new(layout, scene, params.direct_samples))
            .collect();
        let bsdf_channels = (0..params.min_path_len)
            .map(|_| layout.add_uv_channel(1))
            .collect();
        // roulette runs for path_len in (min_path_len, max_path_len]
        let roulette_channels = (params.min_path_len..params.max_path_len)
            .map(|_| layout.add_float_channel(1))
            .collect();
        Self {
            vertex_direct,
            bsdf_channels,
            roulette_channels,
            random_direct: DirectIllum::random(params.direct_samples),
            min_path_len: params.min_path_len,
            max_path_len: params.max_path_len,
            min_trace: params.min_trace,
            background_alpha: params.background_alpha,
        }
    }

    fn direct_enabled(&self) -> bool {
        self.random_direct.enabled()
    }

    fn roulette_value(&self, path_len: u32, sample: &Sample<'_>, ctx: &RenderContext<'_>) -> f32 {
        let index = (path_len - self.min_path_len - 1) as usize;
        match self.roulette_channels.get(index) {
            Some(&channel) => sample.float(channel, 0),
            None => ctx.random(),
        }
    }
}

impl Integrator for PathIntegrator {
    fn li(&self, ray: Ray, media: &MediaStack, sample: &Sample<'_>, ctx: &RenderContext<'_>) -> Tint {
        let scene = ctx.scene;
        let mut media = media.clone();
        let mut isec_ray = Ray::new(ray.origin, ray.dir, self.min_trace, HORIZON);

        let mut path_len = 0;
        let mut throughput = Color::ONE;
        let mut after_specular = false;
        let mut radiance = Color::ZERO;
        let mut alpha = 1.0;

        loop {
            let info = scene.intersect(&mut isec_ray, ctx);
            throughput *= media.medium().transmittance(isec_ray.t1);

            // With light sampling on, emitters reached by a diffuse bounce
            // were already counted by the previous vertex.
            let include_emitters = path_len == 0 || after_specular || !self.direct_enabled();

            let Some(info) = info else {
                if include_emitters {
                    radiance += scene.background(isec_ray.dir) * throughput;
                }
                if path_len == 0 && radiance == Color::ZERO {
                    alpha = self.background_alpha;
                }
                break;
            };

            let isec = info.make_intersect(&media, ctx);
            if include_emitters {
                radiance += isec.le() * throughput;
            }

            let Some(bsdf) = isec.bsdf else {
                break;
            };

            if self.direct_enabled() {
                let direct = match self.vertex_direct.get(path_len as usize) {
                    Some(di) => di.sample_all_lights(&isec, sample, BsdfFlags::NON_SPECULAR, ctx),
                    None => self
                        .random_direct
                        .sample_all_lights_random(&isec, BsdfFlags::NON_SPECULAR, ctx),
                };
                radiance += direct * throughput;
            }

            let param = match self.bsdf_channels.get(path_len as usize) {
                Some(&channel) => sample.uv(channel, 0),
                None => Vec2::new(ctx.random(), ctx.random()),
            };
            let samp = bsdf.sample(param, BsdfFlags::ALL);
            if !samp.is_valid() {
                break;
            }
            throughput *= samp.val * (isec.cos_n(samp.dir).abs() / samp.pdf);

            if path_len > self.min_path_len {
                let continue_prob = intensity(throughput).min(1.0);
                if self.roulette_value(path_len, sample, ctx) > continue_prob {
                    break;
                }
                throughput /= continue_prob;
            }
            if path_len >= self.max_path_len {
                break;
            }

            isec_ray = Ray::new(isec.pos(), isec.normal_frame.from(samp.dir), self.min_trace, HORIZON);
            after_specular = samp.flags.contains(BsdfFlags::SPECULAR);
            if samp.flags.contains(BsdfFlags::TRANSMISSIVE) {
                media.transmit(isec.material.medium(), isec.back);
            }
            path_len += 1;
        }

        Tint::new(sanitize(radiance), alpha)
    }
}
