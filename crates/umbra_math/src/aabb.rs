use crate::{Ray, Vec3};

/// Axis-Aligned Bounding Box used by the spatial index and for scene bounds.
///
/// An empty box has `min > max` on every axis, so merging it into another
/// box is a no-op.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Minimum extent per axis; thinner boxes are padded to this.
    const MIN_EXTENT: f32 = 0.0001;

    /// Box containing nothing.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create an AABB from two corner points, in any order.
    ///
    /// Flat boxes (a triangle lying in an axis plane) are padded so the slab
    /// test never sees a zero-width interval.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let mut aabb = Self {
            min: a.min(b),
            max: a.max(b),
        };
        aabb.pad_to_minimums();
        aabb
    }

    /// Smallest box containing every point in `points`.
    pub fn enclosing<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.include(p);
        }
        if !aabb.is_empty() {
            aabb.pad_to_minimums();
        }
        aabb
    }

    /// Grow the box to contain `p`.
    pub fn include(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// True if this box contains nothing.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// True if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Size along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Length of the diagonal; zero for an empty box.
    pub fn diameter(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.extent().length()
        }
    }

    /// True if `p` lies within the box, grown by `eps` on every side.
    pub fn contains(&self, p: Vec3, eps: f32) -> bool {
        let e = Vec3::splat(eps);
        p.cmpge(self.min - e).all() && p.cmple(self.max + e).all()
    }

    /// The eight corner points.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Test if the valid range `[t0, t1]` of a ray passes through the box.
    ///
    /// Slab method; returns the clipped parametric range on a hit.
    pub fn hit(&self, ray: &Ray) -> Option<(f32, f32)> {
        let mut t_min = ray.t0;
        let mut t_max = ray.t1;

        for axis in 0..3 {
            let inv_d = 1.0 / ray.dir[axis];
            let mut t0 = (self.min[axis] - ray.origin[axis]) * inv_d;
            let mut t1 = (self.max[axis] - ray.origin[axis]) * inv_d;
            if inv_d < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // NaN from 0 * inf falls through both max/min unchanged
            t_min = t0.max(t_min);
            t_max = t1.min(t_max);
            if t_max < t_min {
                return None;
            }
        }

        Some((t_min, t_max))
    }

    /// Pad axes thinner than `MIN_EXTENT` to avoid degenerate boxes.
    fn pad_to_minimums(&mut self) {
        let half = Self::MIN_EXTENT / 2.0;
        for axis in 0..3 {
            if self.max[axis] - self.min[axis] < Self::MIN_EXTENT {
                self.min[axis] -= half;
                self.max[axis] += half;
            }
        }
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        if e.x > e.y && e.x > e.z {
            0
        } else if e.y > e.z {
            1
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}
