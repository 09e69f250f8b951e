//! Sphere primitive.

use std::f32::consts::{FRAC_1_PI, PI, TAU};
use std::sync::Arc;

use umbra_math::{Aabb, Frame, Ray, Vec2, Vec3};

use super::{alloc_isec, AngularSample, AreaSample, Surface, SurfaceSampler};
use crate::context::RenderContext;
use crate::intersect::{Intersection, IsecInfo, LocalGeometry};
use crate::material::Material;
use crate::media::MediaStack;
use crate::sampling::uniform_sphere;

/// A sphere primitive.
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: Arc<dyn Material>,
    bbox: Aabb,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Vec3, radius: f32, material: Arc<dyn Material>) -> Self {
        let radius = radius.max(0.0);
        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Self {
            center,
            radius,
            material,
            bbox,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Nearest root in `[t0, t1)`.
    fn hit_t(&self, ray: &Ray) -> Option<f32> {
        sphere_hit(self.center, self.radius, ray.origin, ray.dir, ray.t0, ray.t1)
    }
}

/// Nearest intersection of a ray with a sphere in `[t0, t1)`.
pub(crate) fn sphere_hit(
    center: Vec3,
    radius: f32,
    origin: Vec3,
    dir: Vec3,
    t0: f32,
    t1: f32,
) -> Option<f32> {
    let oc = center - origin;
    let a = dir.length_squared();
    let h = dir.dot(oc);
    let c = oc.length_squared() - radius * radius;

    let discriminant = h * h - a * c;
    if discriminant < 0.0 || a == 0.0 {
        return None;
    }
    let sqrtd = discriminant.sqrt();

    let near = (h - sqrtd) / a;
    if near >= t0 && near < t1 {
        return Some(near);
    }
    let far = (h + sqrtd) / a;
    (far >= t0 && far < t1).then_some(far)
}

/// Texture coordinates and the u-tangent for a point on the unit sphere:
/// u is the azimuth around z, v the latitude.
fn sphere_uv(p: Vec3) -> (Vec2, Vec3) {
    let mut phi = p.y.atan2(p.x);
    if phi < 0.0 {
        phi += TAU;
    }
    let theta = p.z.clamp(-1.0, 1.0).asin();
    let uv = Vec2::new(phi / TAU, theta * FRAC_1_PI + 0.5);
    (uv, Vec3::new(-p.y, p.x, 0.0))
}

struct SphereIsec<'a> {
    sphere: &'a Sphere,
    ray: Ray,
}

impl<'a> IsecInfo<'a> for SphereIsec<'a> {
    fn t(&self) -> f32 {
        self.ray.t1
    }

    fn surface(&self) -> &'a dyn Surface {
        self.sphere
    }

    fn geometry(&self) -> LocalGeometry {
        let sphere = self.sphere;
        let pos = self.ray.end();
        let unit = ((pos - sphere.center) / sphere.radius).normalize_or_zero();
        let (uv, tangent) = sphere_uv(unit);
        let frame = Frame::from_z_tangent(pos, unit, tangent);
        let dpdu = tangent * TAU * sphere.radius;
        let dpdv = frame.z.cross(frame.x) * PI * sphere.radius;
        LocalGeometry::flat(frame, uv, dpdu, dpdv)
    }

    fn make_intersect(&self, media: &MediaStack, ctx: &'a RenderContext<'_>) -> Intersection<'a> {
        let isec = Intersection::new(
            &self.ray,
            self.geometry(),
            self.sphere,
            self.sphere.material.as_ref(),
            media,
            ctx,
        );
        let front = !isec.back;
        isec.with_no_self_shadowing(front)
    }
}

impl Surface for Sphere {
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        let t = self.hit_t(ray)?;
        ray.t1 = t;
        Some(alloc_isec(ctx, SphereIsec { sphere: self, ray: *ray }))
    }

    fn intersects(&self, ray: &Ray, _ctx: &RenderContext<'_>) -> bool {
        self.hit_t(ray).is_some()
    }

    fn bbox(&self) -> Aabb {
        self.bbox
    }

    fn material(&self) -> &dyn Material {
        self.material.as_ref()
    }

    fn sampler(&self) -> Option<Box<dyn SurfaceSampler>> {
        (self.radius > 0.0).then(|| {
            Box::new(SphereSampler {
                center: self.center,
                radius: self.radius,
            }) as Box<dyn SurfaceSampler>
        })
    }
}

/// Uniform area sampling of a sphere.
struct SphereSampler {
    center: Vec3,
    radius: f32,
}

impl SurfaceSampler for SphereSampler {
    fn sample(&self, param: Vec2) -> AreaSample {
        let normal = uniform_sphere(param);
        AreaSample {
            pos: self.center + normal * self.radius,
            normal,
            pdf: 1.0 / self.area(),
        }
    }

    fn eval_from_viewpoint(&self, viewpoint: Vec3, dir: Vec3) -> AngularSample {
        match sphere_hit(self.center, self.radius, viewpoint, dir, 0.0, f32::INFINITY) {
            Some(t) => {
                let pos = viewpoint + dir * t;
                let sample = AreaSample {
                    pos,
                    normal: (pos - self.center) / self.radius,
                    pdf: 1.0 / self.area(),
                };
                AngularSample::from_area(sample, viewpoint)
            }
            None => AngularSample::NONE,
        }
    }

    fn area(&self) -> f32 {
        4.0 * PI * self.radius * self.radius
    }
}
