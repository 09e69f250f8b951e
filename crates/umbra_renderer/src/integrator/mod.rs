//! Surface integrators: estimate the radiance arriving along a camera ray.

mod direct;
mod path;

use std::ops::{Add, AddAssign, Mul};

use umbra_core::{IntegratorKind, RenderConfig};
use umbra_math::{Color, Ray};

use crate::context::RenderContext;
use crate::media::MediaStack;
use crate::sample::{Sample, SampleLayout};
use crate::scene::Scene;

pub use direct::DirectIntegrator;
pub use path::PathIntegrator;

/// Radiance plus coverage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint {
    pub color: Color,
    pub alpha: f32,
}

impl Tint {
    pub const ZERO: Tint = Tint {
        color: Color::ZERO,
        alpha: 0.0,
    };

    pub fn new(color: Color, alpha: f32) -> Self {
        Self { color, alpha }
    }

    pub fn opaque(color: Color) -> Self {
        Self { color, alpha: 1.0 }
    }
}

impl Add for Tint {
    type Output = Tint;

    fn add(self, other: Tint) -> Tint {
        Tint::new(self.color + other.color, self.alpha + other.alpha)
    }
}

impl AddAssign for Tint {
    fn add_assign(&mut self, other: Tint) {
        self.color += other.color;
        self.alpha += other.alpha;
    }
}

impl Mul<f32> for Tint {
    type Output = Tint;

    fn mul(self, scale: f32) -> Tint {
        Tint::new(self.color * scale, self.alpha * scale)
    }
}

/// Estimates incoming radiance for one camera sample.
///
/// Integrators are shared read-only between workers; everything mutable
/// lives in the [`RenderContext`].
pub trait Integrator: Send + Sync {
    /// Radiance arriving at the origin of `ray` from the direction it
    /// points, for a ray travelling through `media`.
    fn li(&self, ray: Ray, media: &MediaStack, sample: &Sample<'_>, ctx: &RenderContext<'_>) -> Tint;
}

/// Create the configured integrator, declaring its sample channels in
/// `layout`.
pub fn build_integrator(
    params: &RenderConfig,
    scene: &Scene,
    layout: &mut SampleLayout,
) -> Box<dyn Integrator> {
    match params.integrator {
        IntegratorKind::Direct => Box::new(DirectIntegrator::new(layout, scene, params)),
        IntegratorKind::Path => Box::new(PathIntegrator::new(layout, scene, params)),
    }
}

/// Replace NaN or infinite estimates with black.
#[inline]
pub(crate) fn sanitize(color: Color) -> Color {
    if color.is_finite() {
        color.max(Color::ZERO)
    } else {
        Color::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::PointLight;
    use crate::material::Lambert;
    use crate::sample::SampleSet;
    use crate::sample_gen::GridGen;
    use crate::surface::{Sphere, Tripar};
    use crate::testing::assert_close;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use umbra_math::Vec3;

    #[test]
    fn test_tint_ops() {
        let mut t = Tint::opaque(Color::ONE) * 0.5;
        t += Tint::new(Color::splat(0.25), 0.25);
        assert_eq!(t, Tint::new(Color::splat(0.75), 0.75));
        assert_eq!(sanitize(Color::new(f32::NAN, 1.0, 1.0)), Color::ZERO);
        assert_eq!(sanitize(Color::new(-1.0, 1.0, 1.0)), Color::new(0.0, 1.0, 1.0));
    }

    /// Unit sphere at the origin lit by a point light above it, seen from
    /// (0, 3, -4).
    #[test]
    fn test_lit_sphere_both_integrators() {
        let mut scene = Scene::new();
        scene
            .add_surface(Arc::new(Sphere::new(
                Vec3::ZERO,
                1.0,
                Arc::new(Lambert::new(Color::splat(0.8))),
            )))
            .expect("add");
        scene
            .add_light(Box::new(PointLight::new(Vec3::new(0.0, 5.0, 0.0), Color::splat(25.0))))
            .expect("add");
        scene.setup().expect("setup");

        for kind in [IntegratorKind::Direct, IntegratorKind::Path] {
            let params = RenderConfig {
                integrator: kind,
                ..Default::default()
            };
            let mut layout = SampleLayout::new();
            let integ = build_integrator(&params, &scene, &mut layout);
            let mut set = SampleSet::new(&layout, 1);
            set.generate(&GridGen, &mut StdRng::seed_from_u64(5));
            let ctx = RenderContext::new(&scene, &params);

            let origin = Vec3::new(0.0, 3.0, -4.0);
            let mut ray = Ray::new(origin, -origin.normalize(), 0.0, f32::INFINITY);
            let hit = scene.intersect(&mut ray, &ctx).expect("hits the sphere");
            assert!((ray.at(hit.t()).length() - 1.0).abs() < 1e-4);

            let ray = Ray::new(origin, -origin.normalize(), 0.0, f32::INFINITY);
            let tint = integ.li(ray, &MediaStack::new(), &set.sample(0), &ctx);
            assert!(tint.color.x > 0.0 && tint.color.x < 25.0, "{:?}: {}", kind, tint.color);
            assert_eq!(tint.alpha, 1.0);

            // looking away from everything
            let miss = Ray::new(origin, Vec3::Y, 0.0, f32::INFINITY);
            let tint = integ.li(miss, &MediaStack::new(), &set.sample(0), &ctx);
            assert_eq!(tint, Tint::new(Color::ZERO, params.background_alpha));
        }
    }

    fn average_li(scene: &Scene, params: &RenderConfig, ray: Ray, n: u32) -> f32 {
        let mut layout = SampleLayout::new();
        let integ = build_integrator(params, scene, &mut layout);
        let mut set = SampleSet::new(&layout, 1);
        let mut rng = StdRng::seed_from_u64(17);
        let mut ctx = RenderContext::new(scene, params);

        let mut sum = 0.0;
        for _ in 0..n {
            set.generate(&GridGen, &mut rng);
            sum += integ.li(ray, &MediaStack::new(), &set.sample(0), &ctx).color.x;
            ctx.reset_arena();
        }
        sum / n as f32
    }

    /// A white sky over a Lambert(0.5) floor reflects 0.5 no matter how
    /// the estimate is split between light and BSDF sampling.
    #[test]
    fn test_constant_background_lights_surfaces() {
        let mut scene = Scene::new().with_background(Color::ONE);
        scene
            .add_surface(Arc::new(Tripar::parallelogram(
                Vec3::new(-50.0, 0.0, -50.0),
                Vec3::Z * 100.0,
                Vec3::X * 100.0,
                Arc::new(Lambert::new(Color::splat(0.5))),
            )))
            .expect("add");
        scene.setup().expect("setup");

        let down = Ray::new(Vec3::Y, -Vec3::Y, 0.0, f32::INFINITY);
        for (integrator, direct_samples) in [
            (IntegratorKind::Path, 0),
            (IntegratorKind::Path, 1),
            (IntegratorKind::Path, 4),
            (IntegratorKind::Direct, 1),
        ] {
            let params = RenderConfig {
                integrator,
                direct_samples,
                ..Default::default()
            };
            let value = average_li(&scene, &params, down, 4_000);
            assert_close(value, 0.5, 0.05);
        }
    }
}
