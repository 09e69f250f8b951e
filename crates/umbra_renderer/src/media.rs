//! Participating media and the stack of media a ray travels through.

use umbra_math::Color;

/// A homogeneous medium: an index of refraction plus Beer-Lambert absorption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Medium {
    pub ior: f32,
    pub absorption: Color,
}

/// The medium outside every object.
pub const VACUUM: Medium = Medium {
    ior: 1.0,
    absorption: Color::ZERO,
};

impl Medium {
    pub fn new(ior: f32, absorption: Color) -> Self {
        Self { ior, absorption }
    }

    /// Fraction of light surviving `distance` units of travel.
    #[inline]
    pub fn transmittance(&self, distance: f32) -> Color {
        if self.absorption == Color::ZERO {
            return Color::ONE;
        }
        // Keep 0 * inf out of the exponent for escaping rays
        let distance = distance.min(f32::MAX);
        (-self.absorption * distance).exp()
    }
}

impl Default for Medium {
    fn default() -> Self {
        VACUUM
    }
}

/// Media a ray is nested inside, innermost last.
///
/// Entering a refractive object pushes its medium; leaving pops it. The
/// bottom of the stack is implicitly [`VACUUM`].
#[derive(Debug, Clone, Default)]
pub struct MediaStack {
    layers: Vec<Medium>,
}

impl MediaStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack holding just `medium` above the vacuum.
    pub fn single(medium: Medium) -> Self {
        Self {
            layers: vec![medium],
        }
    }

    /// The medium the ray currently travels through.
    #[inline]
    pub fn medium(&self) -> Medium {
        self.layers.last().copied().unwrap_or(VACUUM)
    }

    /// The medium surrounding the current one.
    #[inline]
    pub fn enclosing(&self) -> Medium {
        match self.layers.len() {
            0 | 1 => VACUUM,
            n => self.layers[n - 2],
        }
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Update the stack for a ray transmitted through a surface whose
    /// interior is `interior`. Surfaces without an interior medium (thin
    /// sheets) leave the stack alone.
    pub fn transmit(&mut self, interior: Option<&Medium>, exiting: bool) {
        if let Some(medium) = interior {
            if exiting {
                self.layers.pop();
            } else {
                self.layers.push(*medium);
            }
        }
    }

    /// A copy of this stack updated for transmission.
    pub fn transmitted(&self, interior: Option<&Medium>, exiting: bool) -> Self {
        let mut stack = self.clone();
        stack.transmit(interior, exiting);
        stack
    }
}
