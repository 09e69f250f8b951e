// Transform utilities for Mat4
//
// Extends glam::Mat4 with the operations instanced and canonical-space
// surfaces need. glam::Mat4 already provides transform_point3,
// transform_vector3 and inverse().

use crate::{Aabb, Ray};
use glam::{Mat4, Vec3};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform a surface normal. `self` must be the inverse of the matrix
    /// that transforms points; the result is normalized.
    fn transform_normal_by_inverse(&self, normal: Vec3) -> Vec3;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Transform a ray, keeping its parametric range.
    ///
    /// The direction is not renormalized, so a `t` in the source space maps
    /// to the same `t` in the destination space.
    fn transform_ray(&self, ray: &Ray) -> Ray;
}

impl Mat4Ext for Mat4 {
    fn transform_normal_by_inverse(&self, normal: Vec3) -> Vec3 {
        // Normals transform by the inverse transpose
        self.transpose().transform_vector3(normal).normalize()
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }
        Aabb::enclosing(aabb.corners().into_iter().map(|c| self.transform_point3(c)))
    }

    fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.transform_point3(ray.origin),
            self.transform_vector3(ray.dir),
            ray.t0,
            ray.t1,
        )
    }
}
