//! Spatial indexes over the scene's surfaces.

mod bvh;
mod list;

pub use bvh::BvhSpace;
pub use list::ListSpace;

use std::sync::Arc;

use umbra_core::AccelKind;
use umbra_math::{Aabb, Color, Ray};

use crate::context::RenderContext;
use crate::intersect::IsecInfo;
use crate::media::Medium;
use crate::surface::Surface;

/// Nearest-hit and any-hit queries over a set of surfaces.
pub trait Space: Send + Sync {
    /// Nearest hit in `[ray.t0, ray.t1)`; narrows `ray.t1` to it.
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>>;

    /// True if any surface other than `ignore` intersects `ray`.
    fn intersects_any(&self, ray: &Ray, ignore: Option<&dyn Surface>, ctx: &RenderContext<'_>) -> bool;

    /// True if `ray` is completely blocked. Partial occluders along the way
    /// multiply their transmittance into `total`.
    fn occludes(
        &self,
        ray: &Ray,
        medium: &Medium,
        total: &mut Color,
        ignore: Option<&dyn Surface>,
        ctx: &RenderContext<'_>,
    ) -> bool;

    fn bbox(&self) -> Aabb;
}

/// Build the index selected by `kind`.
pub fn build_space(kind: AccelKind, surfaces: Vec<Arc<dyn Surface>>) -> Box<dyn Space> {
    match kind {
        AccelKind::Bvh => Box::new(BvhSpace::new(surfaces)),
        AccelKind::List => Box::new(ListSpace::new(surfaces)),
    }
}

/// Identity test for the surface a shadow ray should skip.
#[inline]
pub(crate) fn is_ignored(surface: &dyn Surface, ignore: Option<&dyn Surface>) -> bool {
    ignore.is_some_and(|ig| std::ptr::addr_eq(surface, ig))
}

/// Nearest hit among `surfaces`, narrowing `ray` as hits are found.
pub(crate) fn intersect_all<'a>(
    surfaces: &'a [Arc<dyn Surface>],
    ray: &mut Ray,
    ctx: &'a RenderContext<'_>,
) -> Option<&'a dyn IsecInfo<'a>> {
    let mut closest = None;
    for surface in surfaces {
        if let Some(info) = surface.intersect(ray, ctx) {
            closest = Some(info);
        }
    }
    closest
}
