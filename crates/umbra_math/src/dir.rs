//! Direction helpers: reflection, refraction, spherical coordinates.

use crate::Vec3;

/// Cosine of the angle between two vectors of any length.
///
/// Returns 0 when either vector is zero.
#[inline]
pub fn cos_angle(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom > 0.0 {
        (a.dot(b) / denom).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Mirror `v` about the axis `n`.
///
/// `v` points away from the surface, as does the result; `n` must be unit
/// length.
#[inline]
pub fn mirror(v: Vec3, n: Vec3) -> Vec3 {
    2.0 * v.dot(n) * n - v
}

/// Refract the incoming direction `d` (pointing toward the surface) through a
/// boundary with normal `n`, going from index `ior_in` to `ior_out`.
///
/// `n` must face against `d`. Returns `None` on total internal reflection.
pub fn refraction(d: Vec3, n: Vec3, ior_in: f32, ior_out: f32) -> Option<Vec3> {
    let eta = ior_in / ior_out;
    let cos_i = -d.dot(n);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some((eta * d + (eta * cos_i - cos_t) * n).normalize())
}

/// Unit direction from a polar angle's cosine and an azimuth, around +z.
#[inline]
pub fn spherical_to_dir(cos_theta: f32, phi: f32) -> Vec3 {
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
}
