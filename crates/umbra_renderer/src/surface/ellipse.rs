use std::f32::consts::PI;
use std::sync::Arc;

use umbra_math::{Aabb, Frame, Ray, Vec2, Vec3};

use super::{alloc_isec, AngularSample, AreaSample, Surface, SurfaceSampler};
use crate::context::RenderContext;
use crate::intersect::{Intersection, IsecInfo, LocalGeometry};
use crate::material::Material;
use crate::media::MediaStack;
use crate::sampling::concentric_disk;

/// Flat elliptical disk inscribed in the parallelogram `corner`, `edge1`,
/// `edge2`. The front face is the side `edge1 x edge2` points to.
pub struct Ellipse {
    corner: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    normal: Vec3,
    material: Arc<dyn Material>,
}

impl Ellipse {
    pub fn new(corner: Vec3, edge1: Vec3, edge2: Vec3, material: Arc<dyn Material>) -> Self {
        Self {
            corner,
            edge1,
            edge2,
            normal: edge1.cross(edge2).normalize_or_zero(),
            material,
        }
    }

    /// Disk of `radius` around `center`, facing `normal`.
    pub fn disk(center: Vec3, normal: Vec3, radius: f32, material: Arc<dyn Material>) -> Self {
        let frame = Frame::from_z(center, normal.normalize());
        let edge1 = frame.x * (2.0 * radius);
        let edge2 = frame.y * (2.0 * radius);
        Self::new(center - (edge1 + edge2) * 0.5, edge1, edge2, material)
    }

    /// Parallelogram coordinates of the hit, if inside the ellipse.
    fn hit(&self, origin: Vec3, dir: Vec3, t0: f32, t1: f32) -> Option<(f32, Vec2)> {
        let (t, u, v) = super::tripar::tripar_hit(
            self.corner,
            self.edge1,
            self.edge2,
            true,
            origin,
            dir,
            t0,
            t1,
        )?;
        let (du, dv) = (2.0 * u - 1.0, 2.0 * v - 1.0);
        (du * du + dv * dv <= 1.0).then_some((t, Vec2::new(u, v)))
    }

    fn area(&self) -> f32 {
        self.edge1.cross(self.edge2).length() * PI / 4.0
    }
}

struct EllipseIsec<'a> {
    ellipse: &'a Ellipse,
    ray: Ray,
    uv: Vec2,
}

impl<'a> IsecInfo<'a> for EllipseIsec<'a> {
    fn t(&self) -> f32 {
        self.ray.t1
    }

    fn surface(&self) -> &'a dyn Surface {
        self.ellipse
    }

    fn geometry(&self) -> LocalGeometry {
        let e = self.ellipse;
        let frame = Frame::from_z_tangent(self.ray.end(), e.normal, e.edge1);
        LocalGeometry::flat(frame, self.uv, e.edge1, e.edge2)
    }

    fn make_intersect(&self, media: &MediaStack, ctx: &'a RenderContext<'_>) -> Intersection<'a> {
        Intersection::new(
            &self.ray,
            self.geometry(),
            self.ellipse,
            self.ellipse.material.as_ref(),
            media,
            ctx,
        )
        .with_no_self_shadowing(true)
    }
}

impl Surface for Ellipse {
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        let (t, uv) = self.hit(ray.origin, ray.dir, ray.t0, ray.t1)?;
        ray.t1 = t;
        Some(alloc_isec(
            ctx,
            EllipseIsec {
                ellipse: self,
                ray: *ray,
                uv,
            },
        ))
    }

    fn intersects(&self, ray: &Ray, _ctx: &RenderContext<'_>) -> bool {
        self.hit(ray.origin, ray.dir, ray.t0, ray.t1).is_some()
    }

    fn bbox(&self) -> Aabb {
        let c = self.corner;
        Aabb::enclosing([c, c + self.edge1, c + self.edge2, c + self.edge1 + self.edge2])
    }

    fn material(&self) -> &dyn Material {
        self.material.as_ref()
    }

    fn sampler(&self) -> Option<Box<dyn SurfaceSampler>> {
        (self.area() > 0.0).then(|| {
            Box::new(EllipseSampler {
                ellipse: Ellipse {
                    material: self.material.clone(),
                    ..*self
                },
            }) as Box<dyn SurfaceSampler>
        })
    }
}

struct EllipseSampler {
    ellipse: Ellipse,
}

impl SurfaceSampler for EllipseSampler {
    fn sample(&self, param: Vec2) -> AreaSample {
        let e = &self.ellipse;
        let d = concentric_disk(param) * 0.5 + Vec2::splat(0.5);
        AreaSample {
            pos: e.corner + e.edge1 * d.x + e.edge2 * d.y,
            normal: e.normal,
            pdf: 1.0 / e.area(),
        }
    }

    fn eval_from_viewpoint(&self, viewpoint: Vec3, dir: Vec3) -> AngularSample {
        let e = &self.ellipse;
        match e.hit(viewpoint, dir, 0.0, f32::INFINITY) {
            Some((t, _)) => AngularSample::from_area(
                AreaSample {
                    pos: viewpoint + dir * t,
                    normal: e.normal,
                    pdf: 1.0 / e.area(),
                },
                viewpoint,
            ),
            None => AngularSample::NONE,
        }
    }

    fn area(&self) -> f32 {
        self.ellipse.area()
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
    fn test_corners_are_outside() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let disk = Ellipse::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::X * 2.0, Vec3::Y * 2.0, gray());

        let center = Ray::new(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z, 0.0, 5.0);
        assert!(disk.intersects(&center, &ctx));
        let corner = Ray::new(Vec3::new(0.9, 0.9, 1.0), -Vec3::Z, 0.0, 5.0);
        assert!(!disk.intersects(&corner, &ctx));

        let mut ray = center;
        let isec = disk
            .intersect(&mut ray, &ctx)
            .expect("hit")
            .make_intersect(&MediaStack::new(), &ctx);
        assert!(isec.no_self_shadowing);
        assert!((isec.uv - Vec2::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_samples_lie_on_disk() {
        let disk = Ellipse::disk(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y, 0.5, gray());
        let sampler = disk.sampler().expect("sampler");
        assert!((sampler.area() - PI * 0.25).abs() < 1e-5);

        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..1000 {
            let s = sampler.sample(Vec2::new(rng.gen(), rng.gen()));
            assert!((s.pos - Vec3::new(0.0, 2.0, 0.0)).length() <= 0.5 + 1e-5);
            assert!(disk.bbox().contains(s.pos, 1e-4));
        }
    }

    #[test]
    fn test_sampler_pdf_matches_eval() {
        let disk = Ellipse::disk(Vec3::new(0.3, 0.0, 1.0), -Vec3::Z, 0.8, gray());
        let sampler = disk.sampler().expect("sampler");

        assert_chi2(
            |p| {
                let s = sampler.sample_from_viewpoint(Vec3::ZERO, p);
                (s.pdf > 0.0).then_some(s.dir)
            },
            |d| sampler.eval_from_viewpoint(Vec3::ZERO, d).pdf,
            100_000,
            8,
        );
    }
}
