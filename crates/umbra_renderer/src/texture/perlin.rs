//! Gradient noise.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use umbra_math::Vec3;

use super::{TexCoords, TexSpace, TexValue, Texture};

const TABLE_SIZE: usize = 256;

/// Fractal Perlin noise blending from `low` to `high`.
///
/// Each octave doubles the frequency and halves the amplitude of the one
/// before. The sum is remapped from `[-1, 1]` to `[0, 1]` before blending.
#[derive(Debug, Clone)]
pub struct Perlin<T> {
    pub space: TexSpace,
    pub scale: f32,
    pub octaves: u32,
    pub low: T,
    pub high: T,
    perm: Box<[u8; 2 * TABLE_SIZE]>,
}

impl<T: TexValue> Perlin<T> {
    pub fn new(space: TexSpace, scale: f32, octaves: u32, seed: u64) -> Self {
        Self::with_range(space, scale, octaves, seed, T::from_scalar(0.0), T::from_scalar(1.0))
    }

    pub fn with_range(space: TexSpace, scale: f32, octaves: u32, seed: u64, low: T, high: T) -> Self {
        let mut table: Vec<u8> = (0..=255).collect();
        table.shuffle(&mut StdRng::seed_from_u64(seed));

        let mut perm = Box::new([0u8; 2 * TABLE_SIZE]);
        for (i, p) in perm.iter_mut().enumerate() {
            *p = table[i % TABLE_SIZE];
        }
        Self {
            space,
            scale,
            octaves: octaves.max(1),
            low,
            high,
            perm,
        }
    }

    /// Single-octave noise at `p`, in about `[-1, 1]`.
    fn noise(&self, p: Vec3) -> f32 {
        let cell = p.floor();
        let f = p - cell;
        // Wrap into the table; the mask keeps negative cells in range.
        let xi = (cell.x as i32 & 255) as usize;
        let yi = (cell.y as i32 & 255) as usize;
        let zi = (cell.z as i32 & 255) as usize;

        let hash = |x: usize, y: usize, z: usize| {
            let h = self.perm[self.perm[self.perm[x] as usize + y] as usize + z];
            grad(h, f - Vec3::new((x - xi) as f32, (y - yi) as f32, (z - zi) as f32))
        };

        let (u, v, w) = (fade(f.x), fade(f.y), fade(f.z));
        let x0 = lerp(u, hash(xi, yi, zi), hash(xi + 1, yi, zi));
        let x1 = lerp(u, hash(xi, yi + 1, zi), hash(xi + 1, yi + 1, zi));
        let x2 = lerp(u, hash(xi, yi, zi + 1), hash(xi + 1, yi, zi + 1));
        let x3 = lerp(u, hash(xi, yi + 1, zi + 1), hash(xi + 1, yi + 1, zi + 1));
        lerp(w, lerp(v, x0, x1), lerp(v, x2, x3))
    }

    /// Fractal sum remapped to `[0, 1]`.
    pub fn value(&self, coords: &TexCoords) -> f32 {
        let mut p = self.space.point(coords, self.scale);
        let mut amp = 1.0;
        let mut sum = 0.0;
        let mut norm = 0.0;
        for _ in 0..self.octaves {
            sum += self.noise(p) * amp;
            norm += amp;
            amp *= 0.5;
            p *= 2.0;
        }
        (0.5 + 0.5 * sum / norm).clamp(0.0, 1.0)
    }
}

impl<T: TexValue> Texture<T> for Perlin<T> {
    fn eval(&self, coords: &TexCoords) -> T {
        let t = self.value(coords);
        self.low * (1.0 - t) + self.high * t
    }
}

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + t * (b - a)
}

/// Dot product of `d` with one of twelve cube-edge gradients picked by `hash`.
fn grad(hash: u8, d: Vec3) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { d.x } else { d.y };
    let v = if h < 4 {
        d.y
    } else if h == 12 || h == 14 {
        d.x
    } else {
        d.z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}
