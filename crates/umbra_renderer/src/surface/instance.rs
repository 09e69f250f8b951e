use std::sync::Arc;

use umbra_math::{Aabb, Frame, Mat4, Mat4Ext, Ray};

use super::Surface;
use crate::context::RenderContext;
use crate::intersect::{Intersection, IsecInfo, LocalGeometry};
use crate::material::Material;
use crate::media::MediaStack;

/// A surface placed in the world by an object-to-world transform.
///
/// Rays are carried into object space with their parameter range intact, so
/// hit distances need no conversion.
pub struct Instance {
    local_to_world: Mat4,
    world_to_local: Mat4,
    surface: Arc<dyn Surface>,
    bbox: Aabb,
}

impl Instance {
    pub fn new(xform: Mat4, surface: Arc<dyn Surface>) -> Self {
        let bbox = xform.transform_aabb(&surface.bbox());
        Self {
            local_to_world: xform,
            world_to_local: xform.inverse(),
            surface,
            bbox,
        }
    }
}

struct InstanceIsec<'a> {
    instance: &'a Instance,
    inner: &'a dyn IsecInfo<'a>,
    ray: Ray,
}

impl<'a> IsecInfo<'a> for InstanceIsec<'a> {
    fn t(&self) -> f32 {
        self.inner.t()
    }

    fn surface(&self) -> &'a dyn Surface {
        self.instance
    }

    fn geometry(&self) -> LocalGeometry {
        let inst = self.instance;
        let local = self.inner.geometry();
        let frame = |f: Frame| {
            let z = inst.world_to_local.transform_normal_by_inverse(f.z);
            let x = inst.local_to_world.transform_vector3(f.x);
            Frame::from_z_tangent(inst.local_to_world.transform_point3(f.origin), z, x)
        };
        LocalGeometry {
            normal_frame: frame(local.normal_frame),
            geom_frame: frame(local.geom_frame),
            uv: local.uv,
            dpdu: inst.local_to_world.transform_vector3(local.dpdu),
            dpdv: inst.local_to_world.transform_vector3(local.dpdv),
        }
    }

    fn make_intersect(&self, media: &MediaStack, ctx: &'a RenderContext<'_>) -> Intersection<'a> {
        // The instanced surface may be shared; shadow rays must not skip
        // every copy of it.
        Intersection::new(
            &self.ray,
            self.geometry(),
            self.instance,
            self.inner.surface().material(),
            media,
            ctx,
        )
    }
}

impl Surface for Instance {
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        let mut local = self.world_to_local.transform_ray(ray);
        let inner = self.surface.intersect(&mut local, ctx)?;
        ray.t1 = local.t1;
        Some(super::alloc_isec(
            ctx,
            InstanceIsec {
                instance: self,
                inner,
                ray: *ray,
            },
        ))
    }

    fn intersects(&self, ray: &Ray, ctx: &RenderContext<'_>) -> bool {
        self.surface
            .intersects(&self.world_to_local.transform_ray(ray), ctx)
    }

    fn bbox(&self) -> Aabb {
        self.bbox
    }

    fn material(&self) -> &dyn Material {
        self.surface.material()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Lambert;
    use crate::scene::Scene;
    use crate::surface::Sphere;
    use umbra_core::RenderConfig;
    use umbra_math::{Color, Vec3};

    fn instanced_sphere() -> Instance {
        let sphere: Arc<dyn Surface> = Arc::new(Sphere::new(
            Vec3::ZERO,
            1.0,
            Arc::new(Lambert::new(Color::splat(0.5))),
        ));
        let xform = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0))
            * Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        Instance::new(xform, sphere)
    }

    #[test]
    fn test_hit_in_world_space() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let inst = instanced_sphere();

        let mut ray = Ray::new(Vec3::new(0.0, 0.0, 0.0), Vec3::X, 0.0, 100.0);
        let info = inst.intersect(&mut ray, &ctx).expect("hit");
        assert!((info.t() - 3.0).abs() < 1e-4);
        assert_eq!(ray.t1, info.t());

        let isec = info.make_intersect(&MediaStack::new(), &ctx);
        assert!((isec.pos() - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-4);
        assert!((isec.normal_frame.z + Vec3::X).length() < 1e-4);
        assert!(!isec.back);
        assert!(!isec.no_self_shadowing);
    }

    #[test]
    fn test_normals_use_inverse_transpose() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let inst = instanced_sphere();

        // ellipsoid with semi-axes (2, 1, 1) around (5, 0, 0)
        let p = Vec3::new(2.0f32.sqrt(), 1.0 / 2.0f32.sqrt(), 0.0);
        let origin = Vec3::new(5.0, 0.0, 0.0) + p * 3.0;
        let target = Vec3::new(5.0, 0.0, 0.0) + p;
        let mut ray = Ray::between(origin, target, 0.0).with_t1(100.0);
        let isec = inst
            .intersect(&mut ray, &ctx)
            .expect("hit")
            .make_intersect(&MediaStack::new(), &ctx);

        let expected = Vec3::new(p.x / 4.0, p.y, 0.0).normalize();
        assert!((isec.normal_frame.z - expected).length() < 1e-3);
    }

    #[test]
    fn test_bbox_and_occlusion() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let inst = instanced_sphere();
        let bbox = inst.bbox();
        assert!((bbox.min - Vec3::new(3.0, -1.0, -1.0)).length() < 1e-4);
        assert!((bbox.max - Vec3::new(7.0, 1.0, 1.0)).length() < 1e-4);

        let ray = Ray::between(Vec3::new(5.0, 0.0, -5.0), Vec3::new(5.0, 0.0, 5.0), 1e-3);
        assert!(inst.intersects(&ray, &ctx));
        let ray = Ray::between(Vec3::new(7.5, 0.0, -5.0), Vec3::new(7.5, 0.0, 5.0), 1e-3);
        assert!(!inst.intersects(&ray, &ctx));
    }
}
