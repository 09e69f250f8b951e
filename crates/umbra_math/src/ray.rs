use crate::Vec3;

/// A ray segment in 3D space.
///
/// The valid part of the ray is the parametric range `[t0, t1)`; intersection
/// searches narrow `t1` as closer hits are found. The direction is normally
/// unit length so `t` is a distance, but nothing here depends on that.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    pub t0: f32,
    pub t1: f32,
}

impl Ray {
    /// Create a ray covering `[t0, t1)`.
    pub fn new(origin: Vec3, dir: Vec3, t0: f32, t1: f32) -> Self {
        Self { origin, dir, t0, t1 }
    }

    /// Create a ray from `origin` to `target`, excluding `margin` at both ends.
    pub fn between(origin: Vec3, target: Vec3, margin: f32) -> Self {
        let delta = target - origin;
        let dist = delta.length();
        let dir = if dist > 0.0 { delta / dist } else { Vec3::Z };
        Self::new(origin, dir, margin, (dist - margin).max(margin))
    }

    /// Get the point along the ray at parameter t.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// The point at the start of the valid range.
    #[inline]
    pub fn begin(&self) -> Vec3 {
        self.at(self.t0)
    }

    /// The point at the end of the valid range.
    #[inline]
    pub fn end(&self) -> Vec3 {
        self.at(self.t1)
    }

    /// Length of the valid range.
    #[inline]
    pub fn extent(&self) -> f32 {
        self.t1 - self.t0
    }

    /// True if `t` lies in `[t0, t1)`.
    #[inline]
    pub fn contains(&self, t: f32) -> bool {
        t >= self.t0 && t < self.t1
    }

    /// Same ray with a new upper bound.
    #[inline]
    pub fn with_t1(mut self, t1: f32) -> Self {
        self.t1 = t1;
        self
    }
}
