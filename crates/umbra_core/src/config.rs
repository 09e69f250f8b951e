//! Render configuration.
//!
//! Every field has a default, so a scene file only needs to mention the
//! settings it changes.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Which surface integrator estimates radiance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    /// Direct lighting plus recursive specular reflection/refraction.
    Direct,
    /// Path tracing with russian-roulette termination.
    Path,
}

/// How per-pixel sample channels are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleGenKind {
    /// Jittered stratified samples.
    Grid,
    /// Independent uniform random samples.
    Random,
}

/// Spatial index used for ray queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelKind {
    Bvh,
    List,
}

/// Pixel reconstruction filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Box,
    Triangle,
    Gauss,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output image width in pixels
    pub width: u32,
    /// Output image height in pixels
    pub height: u32,
    /// Camera samples per pixel
    pub samples_per_pixel: u32,
    /// Seed mixed into every per-pixel random stream
    pub seed: u64,
    pub integrator: IntegratorKind,
    pub sample_gen: SampleGenKind,
    pub accel: AccelKind,
    /// Offset applied to secondary rays to avoid self-intersection
    pub min_trace: f32,
    /// Recursion cap for the direct integrator
    pub max_depth: u32,
    /// Path vertices traced before russian roulette may terminate a path
    pub min_path_len: u32,
    /// Hard cap on path vertices
    pub max_path_len: u32,
    /// Direct-lighting samples per light per vertex (0 disables light sampling)
    pub direct_samples: u32,
    pub filter: FilterKind,
    /// Filter radius in pixels
    pub filter_radius: f32,
    /// Bucket edge length in pixels
    pub bucket_size: u32,
    /// Background radiance when no environment light is present
    pub background: [f32; 3],
    /// Alpha written when a camera ray hits nothing
    pub background_alpha: f32,
    /// Per-thread scratch arena limit in bytes
    pub arena_limit: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            samples_per_pixel: 16,
            seed: 0,
            integrator: IntegratorKind::Path,
            sample_gen: SampleGenKind::Grid,
            accel: AccelKind::Bvh,
            min_trace: 1e-3,
            max_depth: 8,
            min_path_len: 3,
            max_path_len: 25,
            direct_samples: 1,
            filter: FilterKind::Gauss,
            filter_radius: 1.5,
            bucket_size: 64,
            background: [0.0, 0.0, 0.0],
            background_alpha: 1.0,
            arena_limit: 4 * 1024 * 1024,
        }
    }
}

impl RenderConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot produce an image.
    pub fn validate(&self) -> CoreResult<()> {
        let fail = |msg: String| Err(CoreError::InvalidConfig(msg));

        if self.width == 0 || self.height == 0 {
            return fail(format!("image size {}x{} is empty", self.width, self.height));
        }
        if self.samples_per_pixel == 0 {
            return fail("samples_per_pixel must be at least 1".into());
        }
        if !(self.min_trace.is_finite() && self.min_trace > 0.0) {
            return fail(format!("min_trace must be positive, got {}", self.min_trace));
        }
        if self.max_path_len == 0 {
            return fail("max_path_len must be at least 1".into());
        }
        if self.min_path_len > self.max_path_len {
            return fail(format!(
                "min_path_len ({}) exceeds max_path_len ({})",
                self.min_path_len, self.max_path_len
            ));
        }
        if !(self.filter_radius.is_finite() && self.filter_radius > 0.0) {
            return fail(format!("filter_radius must be positive, got {}", self.filter_radius));
        }
        if self.filter == FilterKind::Box && self.filter_radius < 0.5 {
            return fail(format!(
                "box filter radius {} leaves pixels without samples; use at least 0.5",
                self.filter_radius
            ));
        }
        if self.bucket_size == 0 {
            return fail("bucket_size must be at least 1".into());
        }
        if self.background.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return fail(format!("background {:?} is not a valid color", self.background));
        }
        if !(0.0..=1.0).contains(&self.background_alpha) {
            return fail(format!("background_alpha {} outside [0, 1]", self.background_alpha));
        }
        if self.arena_limit < 4096 {
            return fail(format!("arena_limit {} is too small", self.arena_limit));
        }
        Ok(())
    }

    /// Image aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
