//! Per-thread render state.
//!
//! Every worker owns one [`RenderContext`]: a random number generator, a bump
//! arena for per-sample scratch objects (`IsecInfo`s, BSDFs), and trace
//! counters. Arena allocations borrow the context immutably while a reset
//! needs `&mut`, so nothing allocated for one sample can outlive it.

use std::cell::{Cell, RefCell};
use std::ops::AddAssign;

use bumpalo::Bump;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use umbra_core::RenderConfig;

use crate::scene::Scene;

/// Counters gathered while tracing, summed over workers for the render log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Calls to `Scene::intersect`
    pub scene_intersects: u64,
    /// Deferred hit records created by primitives
    pub isec_infos: u64,
    /// Full intersections materialized from a hit record
    pub intersections: u64,
    /// BSDFs built by materials
    pub bsdfs: u64,
    /// Occlusion queries
    pub shadow_rays: u64,
    /// Per-sample arena resets
    pub arena_resets: u64,
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: Self) {
        self.scene_intersects += other.scene_intersects;
        self.isec_infos += other.isec_infos;
        self.intersections += other.intersections;
        self.bsdfs += other.bsdfs;
        self.shadow_rays += other.shadow_rays;
        self.arena_resets += other.arena_resets;
    }
}

#[derive(Debug, Default)]
struct Counters {
    scene_intersects: Cell<u64>,
    isec_infos: Cell<u64>,
    intersections: Cell<u64>,
    bsdfs: Cell<u64>,
    shadow_rays: Cell<u64>,
    arena_resets: Cell<u64>,
}

#[inline]
fn bump(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

/// Private per-thread state threaded through every trace call.
pub struct RenderContext<'s> {
    /// The scene being rendered
    pub scene: &'s Scene,
    /// Render settings
    pub params: &'s RenderConfig,
    arena: Bump,
    rng: RefCell<StdRng>,
    generation: u64,
    counters: Counters,
}

impl<'s> RenderContext<'s> {
    /// Create a context seeded from `params.seed`.
    pub fn new(scene: &'s Scene, params: &'s RenderConfig) -> Self {
        let arena = Bump::with_capacity(64 * 1024);
        arena.set_allocation_limit(Some(params.arena_limit));

        Self {
            scene,
            params,
            arena,
            rng: RefCell::new(StdRng::seed_from_u64(params.seed)),
            generation: 0,
            counters: Counters::default(),
        }
    }

    /// Allocate a per-sample object in the arena.
    ///
    /// # Panics
    ///
    /// Panics when the arena limit is exceeded, which means a sample loop is
    /// not calling [`reset_arena`](Self::reset_arena).
    pub fn alloc<T>(&self, val: T) -> &T {
        match self.arena.try_alloc(val) {
            Ok(slot) => slot,
            Err(_) => {
                log::error!(
                    "Render arena exhausted: {} bytes in use, limit {} bytes (generation {})",
                    self.arena.allocated_bytes(),
                    self.params.arena_limit,
                    self.generation
                );
                panic!(
                    "render arena exceeded its {} byte limit",
                    self.params.arena_limit
                );
            }
        }
    }

    /// Free everything allocated since the last reset.
    ///
    /// Requires exclusive access, so no arena reference can survive it.
    pub fn reset_arena(&mut self) {
        self.arena.reset();
        self.generation += 1;
        bump(&self.counters.arena_resets);
    }

    /// Number of arena resets so far.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bytes currently held by the arena.
    pub fn arena_bytes(&self) -> usize {
        self.arena.allocated_bytes()
    }

    /// A uniform random number in `[0, 1)`.
    #[inline]
    pub fn random(&self) -> f32 {
        self.rng.borrow_mut().gen()
    }

    /// Direct access to the generator, e.g. to fill a sample set.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        self.rng.get_mut()
    }

    /// Restart the random stream; the renderer does this per pixel so
    /// results do not depend on which thread rendered a pixel.
    pub fn reseed(&mut self, seed: u64) {
        *self.rng.get_mut() = StdRng::seed_from_u64(seed);
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> RenderStats {
        let c = &self.counters;
        RenderStats {
            scene_intersects: c.scene_intersects.get(),
            isec_infos: c.isec_infos.get(),
            intersections: c.intersections.get(),
            bsdfs: c.bsdfs.get(),
            shadow_rays: c.shadow_rays.get(),
            arena_resets: c.arena_resets.get(),
        }
    }

    #[inline]
    pub(crate) fn count_scene_intersect(&self) {
        bump(&self.counters.scene_intersects);
    }

    #[inline]
    pub(crate) fn count_isec_info(&self) {
        bump(&self.counters.isec_infos);
    }

    #[inline]
    pub(crate) fn count_intersection(&self) {
        bump(&self.counters.intersections);
    }

    #[inline]
    pub(crate) fn count_bsdf(&self) {
        bump(&self.counters.bsdfs);
    }

    #[inline]
    pub(crate) fn count_shadow_ray(&self) {
        bump(&self.counters.shadow_rays);
    }
}

/// Seed for pixel `(x, y)`: a SplitMix64 finalizer over the render seed and
/// pixel coordinates.
pub fn pixel_seed(seed: u64, x: u32, y: u32) -> u64 {
    let mut z = seed ^ ((x as u64) << 32 | y as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_reset_bumps_generation() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let mut ctx = RenderContext::new(&scene, &params);

        let value = ctx.alloc([1.0_f32; 16]);
        assert_eq!(value[3], 1.0);
        assert!(ctx.arena_bytes() > 0);

        ctx.reset_arena();
        assert_eq!(ctx.generation(), 1);
        assert_eq!(ctx.stats().arena_resets, 1);
    }

    #[test]
    #[should_panic(expected = "byte limit")]
    fn test_arena_limit_is_fatal() {
        let scene = Scene::new();
        let params = RenderConfig {
            arena_limit: 4096,
            ..Default::default()
        };
        let ctx = RenderContext::new(&scene, &params);
        for _ in 0..10_000 {
            ctx.alloc([0u8; 64]);
        }
    }

    #[test]
    fn test_reseed_is_deterministic() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let mut ctx = RenderContext::new(&scene, &params);

        ctx.reseed(pixel_seed(7, 3, 4));
        let a: Vec<f32> = (0..4).map(|_| ctx.random()).collect();
        ctx.reseed(pixel_seed(7, 3, 4));
        let b: Vec<f32> = (0..4).map(|_| ctx.random()).collect();

        assert_eq!(a, b);
        assert_ne!(pixel_seed(7, 3, 4), pixel_seed(7, 4, 3));
    }
}
