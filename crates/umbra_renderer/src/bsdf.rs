//! The BSDF protocol.
//!
//! A BSDF is built by a material for one intersection and lives in the
//! per-sample arena. All directions are in the intersection's normal frame:
//! +z is the shading normal, and the view direction has non-negative z.

use bitflags::bitflags;
use umbra_math::{Color, Vec2, Vec3};

bitflags! {
    /// Kinds of scattering, combined as layer x direction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BsdfFlags: u32 {
        /// Perfectly specular (delta distribution)
        const SPECULAR = 0x01;
        /// Sharp glossy lobe
        const GLOSSY = 0x02;
        /// Broad response with no sharp peak
        const DIFFUSE = 0x04;
        /// Diffuse transmission
        const TRANSLUCENT = 0x08;
        /// Scatters back into the viewer's hemisphere
        const REFLECTIVE = 0x10;
        /// Scatters through the surface
        const TRANSMISSIVE = 0x20;

        const ALL_LAYERS = Self::SPECULAR.bits() | Self::GLOSSY.bits() | Self::DIFFUSE.bits() | Self::TRANSLUCENT.bits();
        const ALL_DIRECTIONS = Self::REFLECTIVE.bits() | Self::TRANSMISSIVE.bits();
        const ALL = Self::ALL_LAYERS.bits() | Self::ALL_DIRECTIONS.bits();
    }
}

impl BsdfFlags {
    /// Flags used for light sampling: everything but specular lobes.
    pub const NON_SPECULAR: BsdfFlags = BsdfFlags::ALL.difference(BsdfFlags::SPECULAR);

    /// True if `self` allows a lobe of kind `layer` scattering in `direction`.
    #[inline]
    pub fn allows(self, layer: BsdfFlags, direction: BsdfFlags) -> bool {
        self.intersects(layer) && self.intersects(direction)
    }
}

/// A sampled direction with its value and density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    pub val: Color,
    /// Density per solid angle; 1 for specular samples
    pub pdf: f32,
    pub dir: Vec3,
    /// The kind of lobe that produced the sample
    pub flags: BsdfFlags,
}

impl BsdfSample {
    pub const NONE: BsdfSample = BsdfSample {
        val: Color::ZERO,
        pdf: 0.0,
        dir: Vec3::ZERO,
        flags: BsdfFlags::empty(),
    };

    pub fn new(val: Color, pdf: f32, dir: Vec3, flags: BsdfFlags) -> Self {
        Self { val, pdf, dir, flags }
    }

    /// True if the sample carries energy.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.pdf > 0.0 && self.val.max_element() > 0.0
    }
}

/// The BSDF's value and sampling density in a given direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfValue {
    pub val: Color,
    pub pdf: f32,
}

impl BsdfValue {
    pub const NONE: BsdfValue = BsdfValue {
        val: Color::ZERO,
        pdf: 0.0,
    };

    pub fn new(val: Color, pdf: f32) -> Self {
        Self { val, pdf }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.pdf > 0.0 && self.val.max_element() > 0.0
    }
}

/// A sampleable, evaluable scattering distribution.
///
/// `eval(d).pdf` must equal the density with which `sample` returns `d`
/// under the same flags.
pub trait Bsdf {
    /// Sample a direction from the 2D parameter `param` in `[0,1)^2`,
    /// restricted to lobes allowed by `flags`.
    fn sample(&self, param: Vec2, flags: BsdfFlags) -> BsdfSample;

    /// Value and density toward `dir`, counting only lobes in `flags`.
    ///
    /// Specular lobes never contribute here.
    fn eval(&self, dir: Vec3, flags: BsdfFlags) -> BsdfValue;

    /// Lobes this BSDF has, limited to `limit`.
    fn supports(&self, limit: BsdfFlags) -> BsdfFlags;
}
