//! Triangles and parallelograms.

use std::sync::Arc;

use umbra_math::{Aabb, Frame, Ray, Vec2, Vec3};

use super::{alloc_isec, AngularSample, AreaSample, Surface, SurfaceSampler};
use crate::context::RenderContext;
use crate::intersect::{Intersection, IsecInfo, LocalGeometry};
use crate::material::Material;
use crate::media::MediaStack;

/// Möller-Trumbore test against the triangle (or parallelogram) spanned by
/// `e1` and `e2` at `v0`. Returns `(t, u, v)` with `t` in `[t0, t1)`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn tripar_hit(
    v0: Vec3,
    e1: Vec3,
    e2: Vec3,
    parallelogram: bool,
    origin: Vec3,
    dir: Vec3,
    t0: f32,
    t1: f32,
) -> Option<(f32, f32, f32)> {
    let pvec = dir.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(e1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || v > 1.0 || (!parallelogram && u + v > 1.0) {
        return None;
    }

    let t = e2.dot(qvec) * inv_det;
    (t >= t0 && t < t1).then_some((t, u, v))
}

/// A triangle, or the parallelogram completing it, with corner `v0` and
/// edges `e1`, `e2`. The front face is the side `e1 x e2` points to.
pub struct Tripar {
    v0: Vec3,
    e1: Vec3,
    e2: Vec3,
    parallelogram: bool,
    normal: Vec3,
    material: Arc<dyn Material>,
}

impl Tripar {
    pub fn new(v0: Vec3, e1: Vec3, e2: Vec3, parallelogram: bool, material: Arc<dyn Material>) -> Self {
        Self {
            v0,
            e1,
            e2,
            parallelogram,
            normal: e1.cross(e2).normalize_or_zero(),
            material,
        }
    }

    /// Triangle with vertices in counter-clockwise order.
    pub fn triangle(v0: Vec3, v1: Vec3, v2: Vec3, material: Arc<dyn Material>) -> Self {
        Self::new(v0, v1 - v0, v2 - v0, false, material)
    }

    pub fn parallelogram(corner: Vec3, e1: Vec3, e2: Vec3, material: Arc<dyn Material>) -> Self {
        Self::new(corner, e1, e2, true, material)
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    fn hit(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        tripar_hit(
            self.v0,
            self.e1,
            self.e2,
            self.parallelogram,
            ray.origin,
            ray.dir,
            ray.t0,
            ray.t1,
        )
    }
}

struct TriparIsec<'a> {
    tripar: &'a Tripar,
    ray: Ray,
    uv: Vec2,
}

impl<'a> IsecInfo<'a> for TriparIsec<'a> {
    fn t(&self) -> f32 {
        self.ray.t1
    }

    fn surface(&self) -> &'a dyn Surface {
        self.tripar
    }

    fn geometry(&self) -> LocalGeometry {
        let tp = self.tripar;
        let frame = Frame::from_z_tangent(self.ray.end(), tp.normal, tp.e1);
        LocalGeometry::flat(frame, self.uv, tp.e1, tp.e2)
    }

    fn make_intersect(&self, media: &MediaStack, ctx: &'a RenderContext<'_>) -> Intersection<'a> {
        Intersection::new(
            &self.ray,
            self.geometry(),
            self.tripar,
            self.tripar.material.as_ref(),
            media,
            ctx,
        )
        .with_no_self_shadowing(true)
    }
}

impl Surface for Tripar {
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        let (t, u, v) = self.hit(ray)?;
        ray.t1 = t;
        Some(alloc_isec(
            ctx,
            TriparIsec {
                tripar: self,
                ray: *ray,
                uv: Vec2::new(u, v),
            },
        ))
    }

    fn intersects(&self, ray: &Ray, _ctx: &RenderContext<'_>) -> bool {
        self.hit(ray).is_some()
    }

    fn bbox(&self) -> Aabb {
        let mut points = vec![self.v0, self.v0 + self.e1, self.v0 + self.e2];
        if self.parallelogram {
            points.push(self.v0 + self.e1 + self.e2);
        }
        Aabb::enclosing(points)
    }

    fn material(&self) -> &dyn Material {
        self.material.as_ref()
    }

    fn sampler(&self) -> Option<Box<dyn SurfaceSampler>> {
        let sampler = TriparSampler {
            v0: self.v0,
            e1: self.e1,
            e2: self.e2,
            parallelogram: self.parallelogram,
            normal: self.normal,
        };
        (sampler.area() > 0.0).then(|| Box::new(sampler) as Box<dyn SurfaceSampler>)
    }
}

/// Uniform area sampling of a triangle or parallelogram.
pub(crate) struct TriparSampler {
    pub(crate) v0: Vec3,
    pub(crate) e1: Vec3,
    pub(crate) e2: Vec3,
    pub(crate) parallelogram: bool,
    pub(crate) normal: Vec3,
}

impl SurfaceSampler for TriparSampler {
    fn sample(&self, param: Vec2) -> AreaSample {
        let (mut u, mut v) = (param.x, param.y);
        if !self.parallelogram && u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        AreaSample {
            pos: self.v0 + self.e1 * u + self.e2 * v,
            normal: self.normal,
            pdf: 1.0 / self.area(),
        }
    }

    fn eval_from_viewpoint(&self, viewpoint: Vec3, dir: Vec3) -> AngularSample {
        let hit = tripar_hit(
            self.v0,
            self.e1,
            self.e2,
            self.parallelogram,
            viewpoint,
            dir,
            0.0,
            f32::INFINITY,
        );
        match hit {
            Some((t, _, _)) => AngularSample::from_area(
                AreaSample {
                    pos: viewpoint + dir * t,
                    normal: self.normal,
                    pdf: 1.0 / self.area(),
                },
                viewpoint,
            ),
            None => AngularSample::NONE,
        }
    }

    fn area(&self) -> f32 {
        let area = self.e1.cross(self.e2).length();
        if self.parallelogram {
            area
        } else {
            area * 0.5
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Lambert;
    use crate::scene::Scene;
    use crate::testing::assert_chi2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use umbra_core::RenderConfig;
    use umbra_math::Color;

    fn gray() -> Arc<dyn Material> {
        Arc::new(Lambert::new(Color::splat(0.5)))
    }

    #[test]
    fn test_triangle_hit_and_miss() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let tri = Tripar::triangle(Vec3::ZERO, Vec3::X, Vec3::Y, gray());
        assert!((tri.normal() - Vec3::Z).length() < 1e-6);

        let mut ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), -Vec3::Z, 0.0, 10.0);
        let info = tri.intersect(&mut ray, &ctx).expect("inside triangle");
        assert!((info.t() - 1.0).abs() < 1e-5);
        let isec = info.make_intersect(&MediaStack::new(), &ctx);
        assert!(!isec.back);
        assert!(isec.no_self_shadowing);
        assert!((isec.uv - Vec2::new(0.25, 0.25)).length() < 1e-5);

        // outside the triangle but inside the parallelogram
        let ray = Ray::new(Vec3::new(0.75, 0.75, 1.0), -Vec3::Z, 0.0, 10.0);
        assert!(!tri.intersects(&ray, &ctx));
        let quad = Tripar::parallelogram(Vec3::ZERO, Vec3::X, Vec3::Y, gray());
        assert!(quad.intersects(&ray, &ctx));
    }

    #[test]
    fn test_back_face_hit() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let quad = Tripar::parallelogram(Vec3::ZERO, Vec3::X, Vec3::Y, gray());

        let mut ray = Ray::new(Vec3::new(0.5, 0.5, -1.0), Vec3::Z, 0.0, 10.0);
        let info = quad.intersect(&mut ray, &ctx).expect("hit");
        let isec = info.make_intersect(&MediaStack::new(), &ctx);
        assert!(isec.back);
        assert!((isec.normal_frame.z + Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_samples_inside_bbox() {
        let tri = Tripar::triangle(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 1.0),
            Vec3::new(-1.0, 0.5, 3.0),
            gray(),
        );
        let sampler = tri.sampler().expect("sampler");
        let bbox = tri.bbox();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..1000 {
            let s = sampler.sample(Vec2::new(rng.gen(), rng.gen()));
            assert!(bbox.contains(s.pos, 1e-4));
        }
    }

    #[test]
    fn test_sampler_pdf_matches_eval() {
        let quad = Tripar::parallelogram(
            Vec3::new(-1.0, -0.5, 1.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            gray(),
        );
        // front face toward the viewpoint below
        let quad = Tripar::new(quad.v0 + quad.e2, quad.e1, -quad.e2, true, gray());
        let sampler = quad.sampler().expect("sampler");

        assert_chi2(
            |p| {
                let s = sampler.sample_from_viewpoint(Vec3::ZERO, p);
                (s.pdf > 0.0).then_some(s.dir)
            },
            |d| sampler.eval_from_viewpoint(Vec3::ZERO, d).pdf,
            100_000,
            13,
        );
    }
}
