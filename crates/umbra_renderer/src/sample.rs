//! Per-pixel sample sets.
//!
//! Consumers (camera, integrators) declare named channels once in a
//! [`SampleLayout`]. For each pixel a [`SampleSet`] regenerates every channel
//! with the configured [`SampleGen`], and each camera sample reads its own
//! slice of every channel through a [`Sample`].

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use umbra_math::Vec2;

use crate::sample_gen::SampleGen;

/// Handle to a channel of 2D values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UvChannel {
    index: usize,
    /// Values per camera sample
    pub count: u32,
}

/// Handle to a channel of 1D values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatChannel {
    index: usize,
    pub count: u32,
}

/// Channels declared by every consumer of samples.
#[derive(Debug, Clone, Default)]
pub struct SampleLayout {
    uv_counts: Vec<u32>,
    float_counts: Vec<u32>,
}

impl SampleLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a channel holding `count` 2D values per camera sample.
    pub fn add_uv_channel(&mut self, count: u32) -> UvChannel {
        self.uv_counts.push(count);
        UvChannel {
            index: self.uv_counts.len() - 1,
            count,
        }
    }

    /// Declare a channel holding `count` 1D values per camera sample.
    pub fn add_float_channel(&mut self, count: u32) -> FloatChannel {
        self.float_counts.push(count);
        FloatChannel {
            index: self.float_counts.len() - 1,
            count,
        }
    }

    pub fn num_uv_channels(&self) -> usize {
        self.uv_counts.len()
    }

    pub fn num_float_channels(&self) -> usize {
        self.float_counts.len()
    }
}

/// Storage for one pixel's worth of samples.
pub struct SampleSet {
    num_samples: u32,
    uv_counts: Vec<u32>,
    float_counts: Vec<u32>,
    uvs: Vec<Vec<Vec2>>,
    floats: Vec<Vec<f32>>,
}

impl SampleSet {
    pub fn new(layout: &SampleLayout, num_samples: u32) -> Self {
        let num_samples = num_samples.max(1);
        let n = num_samples as usize;
        Self {
            num_samples,
            uvs: layout
                .uv_counts
                .iter()
                .map(|&c| vec![Vec2::ZERO; n * c as usize])
                .collect(),
            floats: layout
                .float_counts
                .iter()
                .map(|&c| vec![0.0; n * c as usize])
                .collect(),
            uv_counts: layout.uv_counts.clone(),
            float_counts: layout.float_counts.clone(),
        }
    }

    pub fn num_samples(&self) -> u32 {
        self.num_samples
    }

    /// Fill every channel with fresh values.
    ///
    /// Each channel is stratified over all of the pixel's samples and then
    /// shuffled, so channels are not correlated with each other.
    pub fn generate(&mut self, gen: &dyn SampleGen, rng: &mut StdRng) {
        for values in &mut self.uvs {
            gen.gen_uvs(rng, values);
            values.shuffle(rng);
        }
        for values in &mut self.floats {
            gen.gen_floats(rng, values);
            values.shuffle(rng);
        }
    }

    /// The view of camera sample `index`.
    pub fn sample(&self, index: u32) -> Sample<'_> {
        Sample { set: self, index }
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample<'_>> {
        (0..self.num_samples).map(move |i| self.sample(i))
    }
}

/// One camera sample's slice of every channel.
#[derive(Clone, Copy)]
pub struct Sample<'s> {
    set: &'s SampleSet,
    index: u32,
}

impl<'s> Sample<'s> {
    pub fn index(&self) -> u32 {
        self.index
    }

    /// All of this sample's values in `channel`.
    pub fn uvs(&self, channel: UvChannel) -> &'s [Vec2] {
        let count = self.set.uv_counts[channel.index] as usize;
        let start = self.index as usize * count;
        &self.set.uvs[channel.index][start..start + count]
    }

    /// Value `i` of `channel` for this sample.
    #[inline]
    pub fn uv(&self, channel: UvChannel, i: u32) -> Vec2 {
        self.uvs(channel)[i as usize]
    }

    pub fn floats(&self, channel: FloatChannel) -> &'s [f32] {
        let count = self.set.float_counts[channel.index] as usize;
        let start = self.index as usize * count;
        &self.set.floats[channel.index][start..start + count]
    }

    #[inline]
    pub fn float(&self, channel: FloatChannel, i: u32) -> f32 {
        self.floats(channel)[i as usize]
    }
}
