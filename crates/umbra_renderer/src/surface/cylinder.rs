//! Open cylindrical tube.

use std::f32::consts::TAU;
use std::sync::Arc;

use umbra_math::{Aabb, Frame, Mat4, Mat4Ext, Quat, Ray, Vec2, Vec3};

use super::{alloc_isec, Surface};
use crate::context::RenderContext;
use crate::intersect::{Intersection, IsecInfo, LocalGeometry};
use crate::material::Material;
use crate::media::MediaStack;

/// A tube of radius 1 around the z axis, `-1 <= z <= 1`, in object space,
/// placed in the world by `xform`. The ends are open.
pub struct Cylinder {
    local_to_world: Mat4,
    world_to_local: Mat4,
    material: Arc<dyn Material>,
    bbox: Aabb,
}

impl Cylinder {
    /// Create a cylinder from its object-to-world transform.
    pub fn new(xform: Mat4, material: Arc<dyn Material>) -> Self {
        let unit = Aabb::from_points(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        Self {
            local_to_world: xform,
            world_to_local: xform.inverse(),
            material,
            bbox: xform.transform_aabb(&unit),
        }
    }

    /// Cylinder of `radius` whose axis runs from `base` to `base + axis`.
    pub fn from_axis(base: Vec3, axis: Vec3, radius: f32, material: Arc<dyn Material>) -> Self {
        let height = axis.length();
        let rotation = Quat::from_rotation_arc(Vec3::Z, axis / height);
        let xform = Mat4::from_scale_rotation_translation(
            Vec3::new(radius, radius, height * 0.5),
            rotation,
            base + axis * 0.5,
        );
        Self::new(xform, material)
    }

    /// Nearest hit in object space.
    fn hit(&self, ray: &Ray) -> Option<f32> {
        let local = self.world_to_local.transform_ray(ray);
        let (o, d) = (local.origin, local.dir);

        let a = d.x * d.x + d.y * d.y;
        if a == 0.0 {
            return None;
        }
        let b = o.x * d.x + o.y * d.y;
        let c = o.x * o.x + o.y * o.y - 1.0;
        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();

        [(-b - root) / a, (-b + root) / a]
            .into_iter()
            .find(|&t| local.contains(t) && (o.z + d.z * t).abs() <= 1.0)
    }
}

struct CylinderIsec<'a> {
    cylinder: &'a Cylinder,
    ray: Ray,
}

impl<'a> IsecInfo<'a> for CylinderIsec<'a> {
    fn t(&self) -> f32 {
        self.ray.t1
    }

    fn surface(&self) -> &'a dyn Surface {
        self.cylinder
    }

    fn geometry(&self) -> LocalGeometry {
        let cyl = self.cylinder;
        let pos = self.ray.end();
        let p = cyl.world_to_local.transform_point3(pos);

        let mut phi = p.y.atan2(p.x);
        if phi < 0.0 {
            phi += TAU;
        }
        let uv = Vec2::new(phi / TAU, (p.z + 1.0) * 0.5);

        let normal = cyl
            .world_to_local
            .transform_normal_by_inverse(Vec3::new(p.x, p.y, 0.0));
        let dpdu = cyl.local_to_world.transform_vector3(Vec3::new(-p.y, p.x, 0.0) * TAU);
        let dpdv = cyl.local_to_world.transform_vector3(Vec3::new(0.0, 0.0, 2.0));
        let frame = Frame::from_z_tangent(pos, normal, dpdu);
        LocalGeometry::flat(frame, uv, dpdu, dpdv)
    }

    fn make_intersect(&self, media: &MediaStack, ctx: &'a RenderContext<'_>) -> Intersection<'a> {
        Intersection::new(
            &self.ray,
            self.geometry(),
            self.cylinder,
            self.cylinder.material.as_ref(),
            media,
            ctx,
        )
    }
}

impl Surface for Cylinder {
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        let t = self.hit(ray)?;
        ray.t1 = t;
        Some(alloc_isec(
            ctx,
            CylinderIsec {
                cylinder: self,
                ray: *ray,
            },
        ))
    }

    fn intersects(&self, ray: &Ray, _ctx: &RenderContext<'_>) -> bool {
        self.hit(ray).is_some()
    }

    fn bbox(&self) -> Aabb {
        self.bbox
    }

    fn material(&self) -> &dyn Material {
        self.material.as_ref()
    }
}
