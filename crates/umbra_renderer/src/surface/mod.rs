//! Geometric primitives.
//!
//! A surface answers ray queries in two phases: `intersect` records a cheap
//! [`IsecInfo`] in the per-sample arena and narrows the ray, and only the
//! nearest hit is later expanded into a full intersection.

mod cylinder;
mod ellipse;
mod instance;
mod mesh;
mod sphere;
mod tripar;

pub use cylinder::Cylinder;
pub use ellipse::Ellipse;
pub use instance::Instance;
pub use mesh::{MeshSurface, MeshTriangle};
pub use sphere::Sphere;
pub(crate) use sphere::sphere_hit;
pub use tripar::Tripar;

use umbra_math::{Aabb, Color, Ray, Vec2, Vec3};

use crate::context::RenderContext;
use crate::intersect::IsecInfo;
use crate::material::Material;
use crate::media::{MediaStack, Medium};

/// Transmittance below which a partially transparent stack counts as opaque.
pub const OPAQUE_EPS: f32 = 1e-4;

/// A primitive with a material.
pub trait Surface: Send + Sync {
    /// Find the nearest hit in `[ray.t0, ray.t1)`; on success `ray.t1` is
    /// narrowed to the hit distance.
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>>;

    /// True if anything blocks `ray`, ignoring material transparency.
    fn intersects(&self, ray: &Ray, ctx: &RenderContext<'_>) -> bool;

    /// True if this surface completely blocks `ray`. Partially transparent
    /// hits multiply their transmittance into `total` and the search
    /// continues past them.
    fn occludes(
        &self,
        ray: &Ray,
        medium: &Medium,
        total: &mut Color,
        ctx: &RenderContext<'_>,
    ) -> bool {
        let material = self.material();
        if material.fully_occluding() {
            return self.intersects(ray, ctx);
        }

        let media = MediaStack::single(*medium);
        let mut remaining = *ray;
        while remaining.t0 < remaining.t1 {
            let mut probe = remaining;
            let Some(info) = self.intersect(&mut probe, ctx) else {
                return false;
            };
            let isec = info.make_intersect(&media, ctx);
            *total *= material.transmittance(&isec, medium);
            if total.max_element() < OPAQUE_EPS {
                return true;
            }
            let t = info.t();
            remaining.t0 = t + 1e-4 * t.abs().max(1.0);
        }
        false
    }

    /// World-space bounds.
    fn bbox(&self) -> Aabb;

    fn material(&self) -> &dyn Material;

    /// A sampler for area lighting, if the shape supports one.
    fn sampler(&self) -> Option<Box<dyn SurfaceSampler>> {
        None
    }
}

/// Place an `IsecInfo` in the arena and count it.
pub(crate) fn alloc_isec<'a, I: IsecInfo<'a> + 'a>(
    ctx: &'a RenderContext<'_>,
    info: I,
) -> &'a dyn IsecInfo<'a> {
    ctx.count_isec_info();
    ctx.alloc(info)
}

/// A point sampled uniformly over a surface's area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaSample {
    pub pos: Vec3,
    /// Outward (front-face) normal at `pos`
    pub normal: Vec3,
    /// Density per unit area
    pub pdf: f32,
}

/// A surface point as seen from a viewpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularSample {
    /// Unit world direction from the viewpoint to the point
    pub dir: Vec3,
    pub normal: Vec3,
    /// Density per unit solid angle; 0 when the point is invalid or seen
    /// from behind
    pub pdf: f32,
    pub dist: f32,
}

impl AngularSample {
    pub const NONE: AngularSample = AngularSample {
        dir: Vec3::ZERO,
        normal: Vec3::ZERO,
        pdf: 0.0,
        dist: 0.0,
    };

    /// Convert an area sample to a solid-angle density around `viewpoint`.
    ///
    /// Only the front face is visible.
    pub fn from_area(sample: AreaSample, viewpoint: Vec3) -> Self {
        let delta = sample.pos - viewpoint;
        let dist = delta.length();
        if dist <= 0.0 || !dist.is_finite() {
            return Self::NONE;
        }
        let dir = delta / dist;
        let cos_light = -dir.dot(sample.normal);
        if cos_light <= 0.0 {
            return Self::NONE;
        }
        Self {
            dir,
            normal: sample.normal,
            pdf: sample.pdf * dist * dist / cos_light,
            dist,
        }
    }
}

/// Uniform area sampling for surface lights.
pub trait SurfaceSampler: Send + Sync {
    /// A uniformly distributed point on the surface.
    fn sample(&self, param: Vec2) -> AreaSample;

    /// A point chosen for lighting `viewpoint`.
    fn sample_from_viewpoint(&self, viewpoint: Vec3, param: Vec2) -> AngularSample {
        AngularSample::from_area(self.sample(param), viewpoint)
    }

    /// The point seen from `viewpoint` in direction `dir` and the density
    /// with which `sample_from_viewpoint` would have chosen it.
    fn eval_from_viewpoint(&self, viewpoint: Vec3, dir: Vec3) -> AngularSample;

    /// Total area.
    fn area(&self) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Lambert, ThinGlass};
    use crate::scene::Scene;
    use std::sync::Arc;
    use umbra_core::RenderConfig;

    #[test]
    fn test_opaque_occludes() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Lambert::new(Color::ONE)));

        let ray = Ray::between(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 5.0), 1e-3);
        let mut total = Color::ONE;
        assert!(sphere.occludes(&ray, &Medium::default(), &mut total, &ctx));

        let miss = Ray::between(Vec3::new(2.0, 0.0, -5.0), Vec3::new(2.0, 0.0, 5.0), 1e-3);
        assert!(!sphere.occludes(&miss, &Medium::default(), &mut total, &ctx));
        // a fully opaque test builds no intersections
        assert_eq!(ctx.stats().intersections, 0);
    }

    #[test]
    fn test_partial_occluder_multiplies_both_hits() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let glass = ThinGlass::new(Color::splat(0.5), 1.0);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(glass));

        let ray = Ray::between(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 5.0), 1e-3);
        let mut total = Color::ONE;
        assert!(!sphere.occludes(&ray, &Medium::default(), &mut total, &ctx));
        // ior 1 reflects nothing, so each wall passes half
        assert!((total - Color::splat(0.25)).length() < 1e-4, "{}", total);
    }

    #[test]
    fn test_area_to_solid_angle() {
        let sample = AreaSample {
            pos: Vec3::new(0.0, 0.0, 2.0),
            normal: -Vec3::Z,
            pdf: 0.5,
        };
        let ang = AngularSample::from_area(sample, Vec3::ZERO);
        assert!((ang.pdf - 2.0).abs() < 1e-6);
        assert!((ang.dist - 2.0).abs() < 1e-6);

        let behind = AreaSample {
            normal: Vec3::Z,
            ..sample
        };
        assert_eq!(AngularSample::from_area(behind, Vec3::ZERO).pdf, 0.0);
    }
}
