//! Image output with filtered sample reconstruction.

use umbra_core::FilterKind;
use umbra_math::Color;

use crate::integrator::Tint;

/// Receives camera samples at continuous image positions.
pub trait OutputSink {
    /// Add a sample at `(x, y)`, where pixel `(i, j)` covers
    /// `[i, i+1) x [j, j+1)`.
    fn add_sample(&mut self, x: f32, y: f32, tint: Tint);
}

/// Separable pixel reconstruction filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Filter {
    Box { radius: f32 },
    Triangle { radius: f32 },
    Gauss { radius: f32, alpha: f32 },
}

impl Filter {
    pub const GAUSS_ALPHA: f32 = 2.0;

    /// Smallest box radius that still covers every pixel centre.
    pub const MIN_BOX_RADIUS: f32 = 0.5;

    pub fn new(kind: FilterKind, radius: f32) -> Self {
        match kind {
            FilterKind::Box => Filter::Box {
                radius: radius.max(Self::MIN_BOX_RADIUS),
            },
            FilterKind::Triangle => Filter::Triangle { radius },
            FilterKind::Gauss => Filter::Gauss {
                radius,
                alpha: Self::GAUSS_ALPHA,
            },
        }
    }

    pub fn radius(&self) -> f32 {
        match *self {
            Filter::Box { radius } | Filter::Triangle { radius } | Filter::Gauss { radius, .. } => radius,
        }
    }

    /// Weight of a sample at offset `(dx, dy)` from a pixel centre.
    pub fn weight(&self, dx: f32, dy: f32) -> f32 {
        self.weight_1d(dx) * self.weight_1d(dy)
    }

    fn weight_1d(&self, offset: f32) -> f32 {
        let offset = offset.abs();
        match *self {
            Filter::Box { radius } => {
                if offset <= radius {
                    1.0
                } else {
                    0.0
                }
            }
            Filter::Triangle { radius } => (radius - offset).max(0.0),
            Filter::Gauss { radius, alpha } => {
                ((-alpha * offset * offset).exp() - (-alpha * radius * radius).exp()).max(0.0)
            }
        }
    }
}

/// A rectangle of accumulated, filter-weighted samples.
///
/// A tile may cover only part of the image; its pixel coordinates stay in
/// image space so tiles can be merged into the full image.
#[derive(Debug, Clone)]
pub struct ImageOutput {
    x0: i32,
    y0: i32,
    width: u32,
    height: u32,
    filter: Filter,
    sums: Vec<Tint>,
    weights: Vec<f32>,
}

impl ImageOutput {
    /// The whole `width` x `height` image.
    pub fn new(width: u32, height: u32, filter: Filter) -> Self {
        Self::tile(0, 0, width, height, filter)
    }

    /// A region with top-left pixel `(x0, y0)`.
    pub fn tile(x0: i32, y0: i32, width: u32, height: u32, filter: Filter) -> Self {
        let len = width as usize * height as usize;
        Self {
            x0,
            y0,
            width,
            height,
            filter,
            sums: vec![Tint::ZERO; len],
            weights: vec![0.0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let (lx, ly) = (x - self.x0, y - self.y0);
        (lx >= 0 && ly >= 0 && (lx as u32) < self.width && (ly as u32) < self.height)
            .then(|| ly as usize * self.width as usize + lx as usize)
    }

    /// Add the samples and weights of `tile` to the overlapping pixels.
    pub fn merge(&mut self, tile: &ImageOutput) {
        for ty in 0..tile.height as i32 {
            for tx in 0..tile.width as i32 {
                let (x, y) = (tile.x0 + tx, tile.y0 + ty);
                let Some(dst) = self.index(x, y) else {
                    continue;
                };
                let src = ty as usize * tile.width as usize + tx as usize;
                self.sums[dst] += tile.sums[src];
                self.weights[dst] += tile.weights[src];
            }
        }
    }

    /// Reconstructed value of image pixel `(x, y)`; zero if no sample
    /// reached it.
    pub fn pixel(&self, x: i32, y: i32) -> Tint {
        match self.index(x, y) {
            Some(i) if self.weights[i] > 0.0 => self.sums[i] * (1.0 / self.weights[i]),
            _ => Tint::ZERO,
        }
    }

    /// Gamma-corrected 8-bit RGBA, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.sums.len() * 4);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let tint = self.pixel(self.x0 + x, self.y0 + y);
                bytes.extend_from_slice(&color_to_rgba(tint.color, tint.alpha));
            }
        }
        bytes
    }
}

impl OutputSink for ImageOutput {
    fn add_sample(&mut self, x: f32, y: f32, tint: Tint) {
        let radius = self.filter.radius();
        let min_x = (x - 0.5 - radius).ceil() as i32;
        let max_x = (x - 0.5 + radius).floor() as i32;
        let min_y = (y - 0.5 - radius).ceil() as i32;
        let max_y = (y - 0.5 + radius).floor() as i32;

        for py in min_y.max(self.y0)..=max_y.min(self.y0 + self.height as i32 - 1) {
            for px in min_x.max(self.x0)..=max_x.min(self.x0 + self.width as i32 - 1) {
                let w = self.filter.weight(px as f32 + 0.5 - x, py as f32 + 0.5 - y);
                if w <= 0.0 {
                    continue;
                }
                if let Some(i) = self.index(px, py) {
                    self.sums[i] += tint * w;
                    self.weights[i] += w;
                }
            }
        }
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color and alpha to 8-bit RGBA.
pub fn color_to_rgba(color: Color, alpha: f32) -> [u8; 4] {
    let byte = |v: f32| (255.0 * v.clamp(0.0, 1.0)).round() as u8;
    [
        byte(linear_to_gamma(color.x)),
        byte(linear_to_gamma(color.y)),
        byte(linear_to_gamma(color.z)),
        byte(alpha),
    ]
}
