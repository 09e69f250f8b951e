//! Orthonormal coordinate frames.
//!
//! Shading code works in a local frame whose z axis is the surface normal;
//! `to` and `from` convert between that frame and world space.

use crate::Vec3;

/// An origin plus three orthonormal axes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub origin: Vec3,
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl Frame {
    /// Frame at `origin` with the given z axis and arbitrary x/y axes.
    ///
    /// `z` must be unit length. Uses the branchless construction of
    /// Duff et al. (2017).
    pub fn from_z(origin: Vec3, z: Vec3) -> Self {
        let sign = 1.0_f32.copysign(z.z);
        let a = -1.0 / (sign + z.z);
        let b = z.x * z.y * a;
        let x = Vec3::new(1.0 + sign * z.x * z.x * a, sign * b, -sign * z.x);
        let y = Vec3::new(b, sign + z.y * z.y * a, -z.y);
        Self { origin, x, y, z }
    }

    /// Frame with z axis `z` and x axis as close as possible to `tangent`.
    ///
    /// Falls back to `from_z` when the tangent is (nearly) parallel to z.
    pub fn from_z_tangent(origin: Vec3, z: Vec3, tangent: Vec3) -> Self {
        let x = tangent - z * z.dot(tangent);
        let len = x.length();
        if len < 1e-6 || !len.is_finite() {
            return Self::from_z(origin, z);
        }
        let x = x / len;
        let y = z.cross(x);
        Self { origin, x, y, z }
    }

    /// Convert a world-space direction into this frame.
    #[inline]
    pub fn to(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.x), v.dot(self.y), v.dot(self.z))
    }

    /// Convert a world-space point into this frame.
    #[inline]
    pub fn to_point(&self, p: Vec3) -> Vec3 {
        self.to(p - self.origin)
    }

    /// Convert a direction in this frame into world space.
    #[inline]
    pub fn from(&self, v: Vec3) -> Vec3 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    /// The same frame viewed from the other side (z and y negated).
    ///
    /// Negating y as well keeps the frame right-handed.
    pub fn flipped(&self) -> Self {
        Self {
            origin: self.origin,
            x: self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(f: &Frame) {
        assert!((f.x.length() - 1.0).abs() < 1e-5);
        assert!((f.y.length() - 1.0).abs() < 1e-5);
        assert!((f.z.length() - 1.0).abs() < 1e-5);
        assert!(f.x.dot(f.y).abs() < 1e-5);
        assert!(f.x.dot(f.z).abs() < 1e-5);
        assert!(f.y.dot(f.z).abs() < 1e-5);
        assert!((f.x.cross(f.y) - f.z).length() < 1e-4);
    }

    #[test]
    fn test_frame_from_z_is_orthonormal() {
        for z in [
            Vec3::Z,
            -Vec3::Z,
            Vec3::X,
            Vec3::new(1.0, 2.0, -3.0).normalize(),
            Vec3::new(-0.2, 0.1, 0.97).normalize(),
        ] {
            let f = Frame::from_z(Vec3::ZERO, z);
            assert_orthonormal(&f);
            assert!((f.z - z).length() < 1e-6);
        }
    }

    #[test]
    fn test_frame_round_trip() {
        let f = Frame::from_z(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.3, -0.4, 0.866).normalize());
        let v = Vec3::new(0.25, -1.5, 2.0);

        assert!((f.from(f.to(v)) - v).length() < 1e-5);
        assert!((f.to(f.z) - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_frame_tangent_and_flip() {
        let f = Frame::from_z_tangent(Vec3::ZERO, Vec3::Y, Vec3::new(1.0, 0.5, 0.0));
        assert_orthonormal(&f);
        assert!((f.x - Vec3::X).length() < 1e-5);

        let flipped = f.flipped();
        assert_orthonormal(&flipped);
        assert!((flipped.z + Vec3::Y).length() < 1e-6);
    }
}
