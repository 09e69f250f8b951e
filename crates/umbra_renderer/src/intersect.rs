//! The two-phase intersection protocol.
//!
//! A primitive's `intersect` only records what it learned during the hit test
//! in a small [`IsecInfo`] allocated in the per-sample arena. Only the globally
//! nearest hit is turned into a full [`Intersection`], with shading frames and
//! a BSDF, by calling [`IsecInfo::make_intersect`].

use umbra_math::{cos_angle, Color, Frame, Ray, Vec2, Vec3};

use crate::bsdf::Bsdf;
use crate::context::RenderContext;
use crate::material::Material;
use crate::media::{MediaStack, Medium};
use crate::surface::Surface;
use crate::texture::TexCoords;

/// Deferred hit record produced by `Surface::intersect`.
pub trait IsecInfo<'a> {
    /// Ray parameter of the hit.
    fn t(&self) -> f32;

    /// The surface that was hit.
    fn surface(&self) -> &'a dyn Surface;

    /// Geometry at the hit, in the coordinate space of the ray the surface
    /// was tested against.
    fn geometry(&self) -> LocalGeometry;

    /// Build the full intersection. Called at most once per hit record.
    fn make_intersect(&self, media: &MediaStack, ctx: &'a RenderContext<'_>) -> Intersection<'a>;
}

/// Surface geometry at a hit point, as reported by a primitive.
///
/// Frames are in world space with z along the outward normal; the
/// intersection flips them for back-face hits.
#[derive(Debug, Clone, Copy)]
pub struct LocalGeometry {
    /// Shading frame (z = interpolated normal, x = tangent)
    pub normal_frame: Frame,
    /// Frame of the true geometric surface
    pub geom_frame: Frame,
    /// Surface parameterization at the hit
    pub uv: Vec2,
    /// Partial derivatives of position with respect to u and v
    pub dpdu: Vec3,
    pub dpdv: Vec3,
}

impl LocalGeometry {
    /// Geometry whose shading and geometric frames coincide.
    pub fn flat(frame: Frame, uv: Vec2, dpdu: Vec3, dpdv: Vec3) -> Self {
        Self {
            normal_frame: frame,
            geom_frame: frame,
            uv,
            dpdu,
            dpdv,
        }
    }
}

/// Full description of a ray/surface hit, scoped to one shading evaluation.
pub struct Intersection<'a> {
    /// Shading frame; origin is the hit position
    pub normal_frame: Frame,
    /// Geometric frame, flipped along with the shading frame
    pub geom_frame: Frame,
    /// Direction toward the viewer, in the normal frame (`v.z >= 0`)
    pub v: Vec3,
    /// Geometric normal, in the normal frame
    pub geom_n: Vec3,
    pub uv: Vec2,
    pub dpdu: Vec3,
    pub dpdv: Vec3,
    /// True if the ray hit the back (inside) of the surface
    pub back: bool,
    /// Shadow rays from here skip the surface that was hit
    pub no_self_shadowing: bool,
    pub surface: &'a dyn Surface,
    pub material: &'a dyn Material,
    /// Scattering function; `None` for pure emitters
    pub bsdf: Option<&'a dyn Bsdf>,
    /// Medium the incoming ray travelled through
    pub medium: Medium,
    /// Medium surrounding `medium`
    pub enclosing_medium: Medium,
}

impl<'a> Intersection<'a> {
    /// Materialize an intersection and build its BSDF.
    pub fn new(
        ray: &Ray,
        geom: LocalGeometry,
        surface: &'a dyn Surface,
        material: &'a dyn Material,
        media: &MediaStack,
        ctx: &'a RenderContext<'_>,
    ) -> Self {
        ctx.count_intersection();

        let view = -ray.dir.normalize_or_zero();
        let mut normal_frame = match material.bump_map() {
            Some(bump) => bump.perturb(&geom),
            None => geom.normal_frame,
        };
        let mut geom_frame = geom.geom_frame;

        let back = geom_frame.z.dot(view) < 0.0;
        if back {
            normal_frame = normal_frame.flipped();
            geom_frame = geom_frame.flipped();
        }

        let mut v = normal_frame.to(view);
        if v.z < 0.0 {
            // Interpolated normal faces away from the viewer; shading with it
            // would leak light, so fall back to the true surface.
            normal_frame = Frame {
                origin: normal_frame.origin,
                ..geom_frame
            };
            v = normal_frame.to(view);
        }
        let geom_n = normal_frame.to(geom_frame.z);

        let mut isec = Self {
            normal_frame,
            geom_frame,
            v,
            geom_n,
            uv: geom.uv,
            dpdu: geom.dpdu,
            dpdv: geom.dpdv,
            back,
            no_self_shadowing: false,
            surface,
            material,
            bsdf: None,
            medium: media.medium(),
            enclosing_medium: media.enclosing(),
        };
        isec.bsdf = material.get_bsdf(&isec, ctx);
        isec
    }

    /// Set the self-shadowing flag.
    pub fn with_no_self_shadowing(mut self, no_self_shadowing: bool) -> Self {
        self.no_self_shadowing = no_self_shadowing;
        self
    }

    /// World-space hit position.
    #[inline]
    pub fn pos(&self) -> Vec3 {
        self.normal_frame.origin
    }

    /// Texture lookup coordinates of the hit.
    pub fn tex_coords(&self) -> TexCoords {
        TexCoords::new(self.pos(), self.uv)
    }

    /// Cosine between the shading normal and local direction `dir`.
    #[inline]
    pub fn cos_n(&self, dir: Vec3) -> f32 {
        dir.z
    }

    /// Cosine between the geometric normal and local direction `dir`.
    #[inline]
    pub fn cos_geom_n(&self, dir: Vec3) -> f32 {
        cos_angle(dir, self.geom_n)
    }

    /// Radiance emitted toward the viewer.
    pub fn le(&self) -> Color {
        self.material.le(self)
    }

    /// The surface shadow rays from here should ignore.
    pub fn shadow_ignore(&self) -> Option<&'a dyn Surface> {
        self.no_self_shadowing.then_some(self.surface)
    }
}

/// Geometry a BSDF keeps from its intersection.
///
/// BSDFs copy this instead of borrowing the intersection that owns them.
#[derive(Debug, Clone, Copy)]
pub struct ShadingGeometry {
    pub v: Vec3,
    pub geom_n: Vec3,
    pub back: bool,
}

impl ShadingGeometry {
    pub fn of(isec: &Intersection<'_>) -> Self {
        Self {
            v: isec.v,
            geom_n: isec.geom_n,
            back: isec.back,
        }
    }

    #[inline]
    pub fn cos_geom_n(&self, dir: Vec3) -> f32 {
        cos_angle(dir, self.geom_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Lambert;
    use crate::scene::Scene;
    use crate::surface::Sphere;
    use std::sync::Arc;
    use umbra_core::RenderConfig;

    #[test]
    fn test_back_face_flips_frame() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Lambert::new(Color::splat(0.5))));

        // from inside the sphere
        let mut ray = Ray::new(Vec3::ZERO, Vec3::X, 0.0, f32::INFINITY);
        let info = sphere.intersect(&mut ray, &ctx).expect("hit from inside");
        let isec = info.make_intersect(&MediaStack::new(), &ctx);

        assert!(isec.back);
        assert!((isec.normal_frame.z + Vec3::X).length() < 1e-5);
        assert!(isec.v.z > 0.99);
        assert!(isec.geom_n.z > 0.99);
        assert!((isec.pos() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_shading_normal_fallback() {
        let scene = Scene::new();
        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let sphere = Sphere::new(Vec3::ZERO, 1.0, Arc::new(Lambert::new(Color::splat(0.5))));

        // Shading normal tilted past the grazing view direction
        let geom_frame = Frame::from_z(Vec3::ZERO, Vec3::Z);
        let normal_frame = Frame::from_z(Vec3::ZERO, Vec3::new(0.9, 0.0, 0.1).normalize());
        let geom = LocalGeometry {
            normal_frame,
            geom_frame,
            uv: Vec2::ZERO,
            dpdu: Vec3::X,
            dpdv: Vec3::Y,
        };
        let ray = Ray::new(Vec3::new(-1.0, 0.0, 0.2), Vec3::new(1.0, 0.0, -0.2).normalize(), 0.0, 10.0);
        let isec = Intersection::new(
            &ray,
            geom,
            &sphere,
            sphere.material(),
            &MediaStack::new(),
            &ctx,
        );

        assert!(!isec.back);
        assert!(isec.v.z >= 0.0);
        assert!((isec.normal_frame.z - Vec3::Z).length() < 1e-6);
        assert_eq!(ctx.stats().intersections, 1);
        assert_eq!(ctx.stats().bsdfs, 1);
    }
}
