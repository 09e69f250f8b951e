//! Warping functions from the unit square to directions and disks.
//!
//! Every function takes a 2D parameter in `[0, 1)^2`, so stratified sample
//! channels stay stratified after warping. Directions are around +z.

use std::f32::consts::{FRAC_1_PI, FRAC_PI_4, PI, TAU};

use umbra_math::{spherical_to_dir, Vec2, Vec3};

/// Map the unit square onto the unit disk, preserving relative area
/// (Shirley-Chiu concentric mapping).
pub fn concentric_disk(param: Vec2) -> Vec2 {
    let s = 2.0 * param - Vec2::ONE;
    if s.x == 0.0 && s.y == 0.0 {
        return Vec2::ZERO;
    }

    let (r, theta) = if s.x.abs() > s.y.abs() {
        (s.x, FRAC_PI_4 * (s.y / s.x))
    } else {
        (s.y, 2.0 * FRAC_PI_4 - FRAC_PI_4 * (s.x / s.y))
    };
    let (sin, cos) = theta.sin_cos();
    Vec2::new(r * cos, r * sin)
}

/// Cosine-weighted direction in the +z hemisphere.
#[inline]
pub fn cosine_hemisphere(param: Vec2) -> Vec3 {
    spherical_to_dir(param.x.sqrt(), TAU * param.y)
}

/// Density of [`cosine_hemisphere`] for a direction with z = `cos_theta`.
#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: f32) -> f32 {
    cos_theta.max(0.0) * FRAC_1_PI
}

/// Uniform direction within the cone of half-angle `acos(cos_max)` around +z.
#[inline]
pub fn uniform_cone(param: Vec2, cos_max: f32) -> Vec3 {
    let cos_theta = 1.0 - param.x * (1.0 - cos_max);
    spherical_to_dir(cos_theta, TAU * param.y)
}

/// Density of [`uniform_cone`]; infinite cones of zero width report 0.
#[inline]
pub fn uniform_cone_pdf(cos_max: f32) -> f32 {
    let solid_angle = TAU * (1.0 - cos_max);
    if solid_angle > 0.0 {
        1.0 / solid_angle
    } else {
        0.0
    }
}

/// Uniform direction over the whole sphere.
#[inline]
pub fn uniform_sphere(param: Vec2) -> Vec3 {
    spherical_to_dir(1.0 - 2.0 * param.x, TAU * param.y)
}

pub const UNIFORM_SPHERE_PDF: f32 = 1.0 / (4.0 * PI);

/// Beckmann microfacet distribution with RMS slope `m`.
///
/// `pdf` is the density of sampled half-vectors per solid angle, `D(h) *
/// cos(h)`.
#[derive(Debug, Clone, Copy)]
pub struct Beckmann {
    m: f32,
    inv_m2: f32,
}

impl Beckmann {
    pub fn new(m: f32) -> Self {
        let inv_m2 = if m == 0.0 { 0.0 } else { 1.0 / (m * m) };
        Self { m, inv_m2 }
    }

    pub fn sample(&self, param: Vec2) -> Vec3 {
        let u = param.x;
        let cos_theta = if u >= 1.0 {
            0.0
        } else {
            1.0 / (self.m * self.m * -(1.0 - u).ln() + 1.0).sqrt()
        };
        spherical_to_dir(cos_theta, TAU * param.y)
    }

    /// Microfacet density `D` for a half-vector with z = `cos_theta`.
    pub fn d(&self, cos_theta: f32) -> f32 {
        if cos_theta <= 0.0 {
            return 0.0;
        }
        let cos2 = cos_theta * cos_theta;
        let tan2 = (1.0 - cos2) / cos2;
        self.inv_m2 * FRAC_1_PI * (-tan2 * self.inv_m2).exp() / (cos2 * cos2)
    }

    #[inline]
    pub fn pdf(&self, cos_theta: f32) -> f32 {
        self.d(cos_theta) * cos_theta.max(0.0)
    }
}
