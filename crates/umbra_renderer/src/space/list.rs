use std::sync::Arc;

use umbra_math::{Aabb, Color, Ray};

use super::{intersect_all, is_ignored, Space};
use crate::context::RenderContext;
use crate::intersect::IsecInfo;
use crate::media::Medium;
use crate::surface::Surface;

/// Linear scan over every surface. Only sensible for tiny scenes and as a
/// reference for the BVH.
pub struct ListSpace {
    surfaces: Vec<Arc<dyn Surface>>,
    bbox: Aabb,
}

impl ListSpace {
    pub fn new(surfaces: Vec<Arc<dyn Surface>>) -> Self {
        let bbox = surfaces
            .iter()
            .fold(Aabb::EMPTY, |acc, s| Aabb::surrounding(&acc, &s.bbox()));
        Self { surfaces, bbox }
    }
}

impl Space for ListSpace {
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        intersect_all(&self.surfaces, ray, ctx)
    }

    fn intersects_any(&self, ray: &Ray, ignore: Option<&dyn Surface>, ctx: &RenderContext<'_>) -> bool {
        self.surfaces
            .iter()
            .any(|s| !is_ignored(s.as_ref(), ignore) && s.intersects(ray, ctx))
    }

    fn occludes(
        &self,
        ray: &Ray,
        medium: &Medium,
        total: &mut Color,
        ignore: Option<&dyn Surface>,
        ctx: &RenderContext<'_>,
    ) -> bool {
        self.surfaces
            .iter()
            .filter(|s| !is_ignored(s.as_ref(), ignore))
            .any(|s| s.occludes(ray, medium, total, ctx))
    }

    fn bbox(&self) -> Aabb {
        self.bbox
    }
}
