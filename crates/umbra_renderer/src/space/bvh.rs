//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Binary tree over surface bounding boxes, built by median split along the
//! axis of greatest centroid spread.

use std::sync::Arc;

use umbra_math::{Aabb, Color, Ray};

use super::{intersect_all, is_ignored, Space};
use crate::context::RenderContext;
use crate::intersect::IsecInfo;
use crate::media::Medium;
use crate::surface::Surface;

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with surfaces.
enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        surfaces: Vec<Arc<dyn Surface>>,
        bbox: Aabb,
    },
    /// Empty tree
    Empty,
}

impl BvhNode {
    fn build(mut surfaces: Vec<Arc<dyn Surface>>) -> Self {
        if surfaces.is_empty() {
            return BvhNode::Empty;
        }

        let bounds = surfaces
            .iter()
            .fold(Aabb::EMPTY, |acc, s| Aabb::surrounding(&acc, &s.bbox()));

        if surfaces.len() <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                surfaces,
                bbox: bounds,
            };
        }

        // Split axis from the spread of centroids, not of the boxes
        let centroid_bounds = Aabb::enclosing(surfaces.iter().map(|s| s.bbox().centroid()));
        let axis = centroid_bounds.longest_axis();

        surfaces.sort_unstable_by(|a, b| {
            let a_val = a.bbox().centroid()[axis];
            let b_val = b.bbox().centroid()[axis];
            a_val.total_cmp(&b_val)
        });

        let right = surfaces.split_off(surfaces.len() / 2);
        BvhNode::Branch {
            left: Box::new(Self::build(surfaces)),
            right: Box::new(Self::build(right)),
            bbox: bounds,
        }
    }

    fn bbox(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } | BvhNode::Branch { bbox, .. } => *bbox,
        }
    }

    /// Entry distance of `ray` into this node, if it enters at all.
    fn entry(&self, ray: &Ray) -> Option<f32> {
        match self {
            BvhNode::Empty => None,
            _ => self.bbox().hit(ray).map(|(t0, _)| t0),
        }
    }

    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        match self {
            BvhNode::Empty => None,
            BvhNode::Leaf { surfaces, .. } => intersect_all(surfaces, ray, ctx),
            BvhNode::Branch { left, right, .. } => {
                // Nearer child first so the far one is tested against a
                // shorter ray.
                let (first, second) = match (left.entry(ray), right.entry(ray)) {
                    (None, None) => return None,
                    (Some(_), None) => return left.intersect(ray, ctx),
                    (None, Some(_)) => return right.intersect(ray, ctx),
                    (Some(l), Some(r)) if r < l => (right, left),
                    _ => (left, right),
                };
                let near = first.intersect(ray, ctx);
                if second.entry(ray).is_none() {
                    return near;
                }
                second.intersect(ray, ctx).or(near)
            }
        }
    }

    fn any<F>(&self, ray: &Ray, test: &mut F) -> bool
    where
        F: FnMut(&Arc<dyn Surface>) -> bool,
    {
        if self.entry(ray).is_none() {
            return false;
        }
        match self {
            BvhNode::Empty => false,
            BvhNode::Leaf { surfaces, .. } => surfaces.iter().any(|s| test(s)),
            BvhNode::Branch { left, right, .. } => left.any(ray, test) || right.any(ray, test),
        }
    }
}

/// BVH over a fixed set of surfaces.
pub struct BvhSpace {
    root: BvhNode,
    count: usize,
}

impl BvhSpace {
    pub fn new(surfaces: Vec<Arc<dyn Surface>>) -> Self {
        let count = surfaces.len();
        let root = BvhNode::build(surfaces);
        log::debug!("Built BVH over {} surfaces", count);
        Self { root, count }
    }

    /// Number of indexed surfaces.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Space for BvhSpace {
    fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        self.root.intersect(ray, ctx)
    }

    fn intersects_any(&self, ray: &Ray, ignore: Option<&dyn Surface>, ctx: &RenderContext<'_>) -> bool {
        self.root.any(ray, &mut |s: &Arc<dyn Surface>| {
            !is_ignored(s.as_ref(), ignore) && s.intersects(ray, ctx)
        })
    }

    fn occludes(
        &self,
        ray: &Ray,
        medium: &Medium,
        total: &mut Color,
        ignore: Option<&dyn Surface>,
        ctx: &RenderContext<'_>,
    ) -> bool {
        self.root.any(ray, &mut |s: &Arc<dyn Surface>| {
            !is_ignored(s.as_ref(), ignore) && s.occludes(ray, medium, total, ctx)
        })
    }

    fn bbox(&self) -> Aabb {
        self.root.bbox()
    }
}
