//! Shared fixtures and statistical checks for unit tests.

use std::f32::consts::{PI, TAU};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use umbra_math::{spherical_to_dir, Color, Frame, Ray, Vec2, Vec3};

use crate::context::RenderContext;
use crate::intersect::{Intersection, LocalGeometry};
use crate::media::MediaStack;
use crate::surface::Surface;

/// An intersection at the origin with normal +z, seen from direction `view`.
pub fn isec_at<'a>(
    surface: &'a dyn Surface,
    view: Vec3,
    media: &MediaStack,
    ctx: &'a RenderContext<'_>,
) -> Intersection<'a> {
    let view = view.normalize();
    let frame = Frame::from_z(Vec3::ZERO, Vec3::Z);
    let geom = LocalGeometry::flat(frame, Vec2::ZERO, Vec3::X, Vec3::Y);
    let ray = Ray::new(view, -view, 0.0, 2.0);
    Intersection::new(&ray, geom, surface, surface.material(), media, ctx)
}

const Z_BINS: usize = 16;
const PHI_BINS: usize = 32;
const SUB: usize = 16;

fn bin_of(dir: Vec3) -> usize {
    let z = ((dir.z.clamp(-1.0, 1.0) + 1.0) * 0.5 * Z_BINS as f32) as usize;
    let mut phi = dir.y.atan2(dir.x);
    if phi < 0.0 {
        phi += TAU;
    }
    let p = (phi / TAU * PHI_BINS as f32) as usize;
    z.min(Z_BINS - 1) * PHI_BINS + p.min(PHI_BINS - 1)
}

/// Pearson chi-squared test of a direction sampler against a density.
///
/// Bins are equal-area cells in `(z, phi)`; the expected count of each cell
/// is the density integrated numerically over it. Cells expecting fewer than
/// 5 samples are pooled. Panics if the statistic exceeds its mean by more
/// than five standard deviations.
pub fn assert_chi2<S, P>(mut sample: S, pdf: P, count: usize, seed: u64)
where
    S: FnMut(Vec2) -> Option<Vec3>,
    P: Fn(Vec3) -> f32,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let mut observed = vec![0.0_f64; Z_BINS * PHI_BINS];
    for _ in 0..count {
        if let Some(dir) = sample(Vec2::new(rng.gen(), rng.gen())) {
            observed[bin_of(dir)] += 1.0;
        }
    }

    let dz = 2.0 / Z_BINS as f32;
    let dphi = TAU / PHI_BINS as f32;
    let cell_area = dz * dphi / (SUB * SUB) as f32;
    let mut expected = vec![0.0_f64; Z_BINS * PHI_BINS];
    for zi in 0..Z_BINS {
        for pi in 0..PHI_BINS {
            let mut sum = 0.0;
            for a in 0..SUB {
                for b in 0..SUB {
                    let z = -1.0 + (zi as f32 + (a as f32 + 0.5) / SUB as f32) * dz;
                    let phi = (pi as f32 + (b as f32 + 0.5) / SUB as f32) * dphi;
                    sum += pdf(spherical_to_dir(z, phi)) * cell_area;
                }
            }
            expected[zi * PHI_BINS + pi] = sum as f64 * count as f64;
        }
    }

    let mut stat = 0.0;
    let mut dof = 0usize;
    let (mut pool_obs, mut pool_exp) = (0.0, 0.0);
    for (obs, exp) in observed.iter().zip(&expected) {
        if *exp < 5.0 {
            pool_obs += obs;
            pool_exp += exp;
        } else {
            stat += (obs - exp) * (obs - exp) / exp;
            dof += 1;
        }
    }
    if pool_exp >= 5.0 {
        stat += (pool_obs - pool_exp) * (pool_obs - pool_exp) / pool_exp;
        dof += 1;
    } else {
        assert!(
            pool_obs <= 5.0 + pool_exp * 3.0,
            "{} samples landed where the density is ~0",
            pool_obs
        );
    }

    let dof = dof.saturating_sub(1).max(1) as f64;
    let limit = dof + 5.0 * (2.0 * dof).sqrt();
    assert!(stat < limit, "chi2 {} exceeds {} with {} dof", stat, limit, dof);
}

/// Integral of `f(dir) * cos` over the +z hemisphere (midpoint rule).
pub fn hemisphere_integral<F: Fn(Vec3) -> Color>(f: F) -> Color {
    let (nt, np) = (256, 256);
    let dtheta = PI / 2.0 / nt as f32;
    let dphi = TAU / np as f32;
    let mut sum = Color::ZERO;
    for i in 0..nt {
        let theta = (i as f32 + 0.5) * dtheta;
        let (sin, cos) = theta.sin_cos();
        for j in 0..np {
            let phi = (j as f32 + 0.5) * dphi;
            sum += f(spherical_to_dir(cos, phi)) * cos * sin * dtheta * dphi;
        }
    }
    sum
}

/// Relative closeness for Monte Carlo estimates.
pub fn assert_close(actual: f32, expected: f32, rel: f32) {
    let err = (actual - expected).abs() / expected.abs().max(1e-6);
    assert!(err < rel, "expected {} got {} (relative error {})", expected, actual, err);
}
