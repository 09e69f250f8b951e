//! Triangle meshes.
//!
//! A [`MeshSurface`] owns the vertex buffers; the space indexes one
//! [`MeshTriangle`] per face, each pointing back into the shared mesh.

use std::sync::Arc;

use umbra_core::Mesh;
use umbra_math::{Aabb, Frame, Ray, Vec2, Vec3};

use super::tripar::{tripar_hit, TriparSampler};
use super::{alloc_isec, Surface, SurfaceSampler};
use crate::context::RenderContext;
use crate::intersect::{Intersection, IsecInfo, LocalGeometry};
use crate::material::Material;
use crate::media::MediaStack;

/// Shared vertex data and material of a mesh.
pub struct MeshSurface {
    mesh: Mesh,
    material: Arc<dyn Material>,
}

impl MeshSurface {
    pub fn new(mesh: Mesh, material: Arc<dyn Material>) -> Arc<Self> {
        Arc::new(Self { mesh, material })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// One surface per face.
    pub fn triangles(self: &Arc<Self>) -> Vec<MeshTriangle> {
        (0..self.mesh.triangle_count())
            .map(|index| MeshTriangle {
                mesh: Arc::clone(self),
                index,
            })
            .collect()
    }
}

/// A single face of a [`MeshSurface`].
pub struct MeshTriangle {
    mesh: Arc<MeshSurface>,
    index: usize,
}

impl MeshTriangle {
    fn corners(&self) -> (Vec3, Vec3, Vec3) {
        let [a, b, c] = self.mesh.mesh.triangle(self.index);
        let p = &self.mesh.mesh.positions;
        (p[a], p[b], p[c])
    }

    fn hit(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        let (v0, v1, v2) = self.corners();
        tripar_hit(v0, v1 - v0, v2 - v0, false, ray.origin, ray.dir, ray.t0, ray.t1)
    }
}

struct MeshTriangleIsec<'a> {
    tri: &'a MeshTriangle,
    ray: Ray,
    u: f32,
    v: f32,
}

impl<'a> IsecInfo<'a> for MeshTriangleIsec<'a> {
    fn t(&self) -> f32 {
        self.ray.t1
    }

    fn surface(&self) -> &'a dyn Surface {
        self.tri
    }

    fn geometry(&self) -> LocalGeometry {
        let (v0, v1, v2) = self.tri.corners();
        let (e1, e2) = (v1 - v0, v2 - v0);
        let pos = self.ray.end();
        let face_n = e1.cross(e2).normalize_or_zero();
        let geom_frame = Frame::from_z_tangent(pos, face_n, e1);

        let uv = Vec2::new(self.u, self.v);
        let normal_frame = match &self.tri.mesh.mesh.normals {
            Some(normals) => {
                let [a, b, c] = self.tri.mesh.mesh.triangle(self.tri.index);
                let w = 1.0 - self.u - self.v;
                let n = (normals[a] * w + normals[b] * self.u + normals[c] * self.v)
                    .normalize_or_zero();
                if n == Vec3::ZERO {
                    geom_frame
                } else {
                    Frame::from_z_tangent(pos, n, e1)
                }
            }
            None => geom_frame,
        };

        LocalGeometry {
            normal_frame,
            geom_frame,
            uv,
            dpdu: e1,
            dpdv: e2,
        }
    }

    fn make_intersect(&self, media: &MediaStack, ctx: &'a RenderContext<'_>) -> Intersection<'a> {
        Intersection::new(
            &self.ray,
            self.geometry(),
            self.tri,
            self.tri.mesh.material.as_ref(),
            media,
            ctx,
        )
        .with_no_self_shadowing(true)
    }
}

impl Surface for MeshTriangle {
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        let (t, u, v) = self.hit(ray)?;
        ray.t1 = t;
        Some(alloc_isec(
            ctx,
            MeshTriangleIsec {
                tri: self,
                ray: *ray,
                u,
                v,
            },
        ))
    }

    fn intersects(&self, ray: &Ray, _ctx: &RenderContext<'_>) -> bool {
        self.hit(ray).is_some()
    }

    fn bbox(&self) -> Aabb {
        let (v0, v1, v2) = self.corners();
        Aabb::enclosing([v0, v1, v2])
    }

    fn material(&self) -> &dyn Material {
        self.mesh.material.as_ref()
    }

    fn sampler(&self) -> Option<Box<dyn SurfaceSampler>> {
        let (v0, v1, v2) = self.corners();
        let (e1, e2) = (v1 - v0, v2 - v0);
        let sampler = TriparSampler {
            v0,
            e1,
            e2,
            parallelogram: false,
            normal: e1.cross(e2).normalize_or_zero(),
        };
        (sampler.area() > 0.0).then(|| Box::new(sampler) as Box<dyn SurfaceSampler>)
    }
}
