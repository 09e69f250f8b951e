//! The render driver: buckets rendered in parallel, merged into one image.

use std::time::Instant;

use rayon::prelude::*;
use umbra_core::RenderConfig;
use umbra_math::Vec2;

use crate::bucket::{generate_buckets, Bucket};
use crate::camera::Camera;
use crate::context::{pixel_seed, RenderContext, RenderStats};
use crate::error::{RenderError, RenderResult};
use crate::integrator::{build_integrator, Integrator};
use crate::media::MediaStack;
use crate::output::{Filter, ImageOutput, OutputSink};
use crate::sample::{SampleLayout, SampleSet, UvChannel};
use crate::sample_gen::{sample_gen, SampleGen};
use crate::scene::Scene;

/// A finished render.
pub struct RenderOutput {
    pub image: ImageOutput,
    pub stats: RenderStats,
}

/// Everything shared read-only by the render workers.
pub struct Renderer<'s> {
    scene: &'s Scene,
    camera: &'s Camera,
    params: &'s RenderConfig,
    integrator: Box<dyn Integrator>,
    gen: Box<dyn SampleGen>,
    layout: SampleLayout,
    film_channel: UvChannel,
    lens_channel: UvChannel,
    filter: Filter,
}

impl<'s> Renderer<'s> {
    /// Prepare to render `scene`, which must already be set up.
    pub fn new(scene: &'s Scene, camera: &'s Camera, params: &'s RenderConfig) -> RenderResult<Self> {
        params.validate()?;
        if !scene.is_set_up() {
            return Err(RenderError::SceneNotSetUp);
        }

        let mut layout = SampleLayout::new();
        let film_channel = layout.add_uv_channel(1);
        let lens_channel = layout.add_uv_channel(1);
        let integrator = build_integrator(params, scene, &mut layout);
        log::debug!(
            "Sample layout: {} 2D channels, {} 1D channels",
            layout.num_uv_channels(),
            layout.num_float_channels()
        );

        Ok(Self {
            scene,
            camera,
            params,
            integrator,
            gen: sample_gen(params.sample_gen),
            layout,
            film_channel,
            lens_channel,
            filter: Filter::new(params.filter, params.filter_radius),
        })
    }

    /// Render the whole image.
    pub fn render(&self) -> RenderOutput {
        let (width, height) = (self.params.width, self.params.height);
        let buckets = generate_buckets(width, height, self.params.bucket_size);

        // Build the index before the workers race for it
        self.scene.space();

        log::info!(
            "Rendering {}x{} at {} samples per pixel ({:?} integrator): {} buckets on {} threads",
            width,
            height,
            self.params.samples_per_pixel,
            self.params.integrator,
            buckets.len(),
            rayon::current_num_threads()
        );
        let start = Instant::now();

        let tiles: Vec<(ImageOutput, RenderStats)> = buckets
            .par_iter()
            .map(|bucket| self.render_bucket(bucket))
            .collect();

        let mut image = ImageOutput::new(width, height, self.filter);
        let mut stats = RenderStats::default();
        for (tile, tile_stats) in &tiles {
            image.merge(tile);
            stats += *tile_stats;
        }

        let elapsed = start.elapsed();
        let samples = width as u64 * height as u64 * self.params.samples_per_pixel as u64;
        log::info!(
            "Rendered in {:.2?} ({:.0} samples/s)",
            elapsed,
            samples as f64 / elapsed.as_secs_f64().max(1e-9)
        );
        log::info!(
            "Trace stats: {} scene intersects, {} hit records, {} intersections, {} BSDFs, {} shadow rays",
            stats.scene_intersects,
            stats.isec_infos,
            stats.intersections,
            stats.bsdfs,
            stats.shadow_rays
        );

        RenderOutput { image, stats }
    }

    /// Render one bucket into its own filter-extended tile.
    pub fn render_bucket(&self, bucket: &Bucket) -> (ImageOutput, RenderStats) {
        let (width, height) = (self.params.width as f32, self.params.height as f32);
        let mut ctx = RenderContext::new(self.scene, self.params);
        let mut set = SampleSet::new(&self.layout, self.params.samples_per_pixel);
        let mut tile = bucket.output_tile(self.filter);
        let media = MediaStack::new();

        for (x, y) in bucket.pixels() {
            ctx.reseed(pixel_seed(self.params.seed, x, y));
            set.generate(self.gen.as_ref(), ctx.rng_mut());

            for sample in set.samples() {
                let film = sample.uv(self.film_channel, 0);
                let (fx, fy) = (x as f32 + film.x, y as f32 + film.y);
                let ray = self
                    .camera
                    .eye_ray(Vec2::new(fx / width, fy / height), sample.uv(self.lens_channel, 0));

                let tint = self.integrator.li(ray, &media, &sample, &ctx);
                tile.add_sample(fx, fy, tint);
                ctx.reset_arena();
            }
        }

        log::trace!("Bucket {} done", bucket.index);
        (tile, ctx.stats())
    }
}
