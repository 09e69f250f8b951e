//! Spatially varying material parameters.
//!
//! A [`Texture`] maps a point on a surface to a value. Material parameters
//! hold a [`TexVal`], which is either a constant or a shared texture, so the
//! common untextured case costs nothing per hit.

mod bump;
mod check;
mod perlin;

pub use bump::BumpMap;
pub use check::Check;
pub use perlin::Perlin;

use std::fmt;
use std::ops::{Add, Mul};
use std::sync::Arc;

use umbra_math::{Color, Vec2, Vec3};

use crate::intersect::LocalGeometry;

/// Where on a surface a texture is looked up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexCoords {
    /// World-space position
    pub pos: Vec3,
    pub uv: Vec2,
}

impl TexCoords {
    pub fn new(pos: Vec3, uv: Vec2) -> Self {
        Self { pos, uv }
    }

    pub fn of(geom: &LocalGeometry) -> Self {
        Self::new(geom.normal_frame.origin, geom.uv)
    }
}

/// Which coordinates a procedural texture is defined over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TexSpace {
    #[default]
    Uv,
    Position,
}

impl TexSpace {
    /// The lookup point in this space, scaled by `scale`.
    pub fn point(self, coords: &TexCoords, scale: f32) -> Vec3 {
        match self {
            TexSpace::Uv => coords.uv.extend(0.0) * scale,
            TexSpace::Position => coords.pos * scale,
        }
    }
}

/// Values a texture can produce.
pub trait TexValue:
    Copy + fmt::Debug + Send + Sync + 'static + Add<Output = Self> + Mul<f32, Output = Self>
{
    /// The value with every component set to `v`.
    fn from_scalar(v: f32) -> Self;
}

impl TexValue for f32 {
    fn from_scalar(v: f32) -> Self {
        v
    }
}

impl TexValue for Color {
    fn from_scalar(v: f32) -> Self {
        Color::splat(v)
    }
}

pub trait Texture<T>: Send + Sync {
    fn eval(&self, coords: &TexCoords) -> T;
}

/// A material parameter: constant or textured.
pub enum TexVal<T> {
    Const(T),
    Tex(Arc<dyn Texture<T>>),
}

impl<T: TexValue> TexVal<T> {
    pub fn eval(&self, coords: &TexCoords) -> T {
        match self {
            TexVal::Const(v) => *v,
            TexVal::Tex(tex) => tex.eval(coords),
        }
    }

    pub fn as_const(&self) -> Option<T> {
        match self {
            TexVal::Const(v) => Some(*v),
            TexVal::Tex(_) => None,
        }
    }

    pub fn texture(tex: impl Texture<T> + 'static) -> Self {
        TexVal::Tex(Arc::new(tex))
    }
}

impl<T: Clone> Clone for TexVal<T> {
    fn clone(&self) -> Self {
        match self {
            TexVal::Const(v) => TexVal::Const(v.clone()),
            TexVal::Tex(tex) => TexVal::Tex(Arc::clone(tex)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TexVal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TexVal::Const(v) => f.debug_tuple("Const").field(v).finish(),
            TexVal::Tex(_) => f.write_str("Tex(..)"),
        }
    }
}

impl<T> From<T> for TexVal<T> {
    fn from(v: T) -> Self {
        TexVal::Const(v)
    }
}

/// Linear blend of two parameters: `control` 0 gives `a`, 1 gives `b`.
pub struct Mix<T> {
    pub control: TexVal<f32>,
    pub a: TexVal<T>,
    pub b: TexVal<T>,
}

impl<T: TexValue> Texture<T> for Mix<T> {
    fn eval(&self, coords: &TexCoords) -> T {
        let t = self.control.eval(coords).clamp(0.0, 1.0);
        self.a.eval(coords) * (1.0 - t) + self.b.eval(coords) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const_value() {
        let val: TexVal<Color> = Color::new(0.1, 0.2, 0.3).into();
        let coords = TexCoords::new(Vec3::ONE, Vec2::new(0.5, 0.5));
        assert_eq!(val.eval(&coords), Color::new(0.1, 0.2, 0.3));
        assert_eq!(val.as_const(), Some(Color::new(0.1, 0.2, 0.3)));
    }

    #[test]
    fn test_mix() {
        let mix = Mix {
            control: TexVal::texture(Check::new(TexSpace::Uv, 2.0, 0.0, 1.0)),
            a: TexVal::Const(Color::X),
            b: TexVal::Const(Color::Z),
        };
        let val = TexVal::texture(mix);
        assert_eq!(val.as_const(), None);
        assert_eq!(val.eval(&TexCoords::new(Vec3::ZERO, Vec2::new(0.25, 0.25))), Color::X);
        assert_eq!(val.eval(&TexCoords::new(Vec3::ZERO, Vec2::new(0.75, 0.25))), Color::Z);
    }

    #[test]
    fn test_position_space_ignores_uv() {
        let coords = TexCoords::new(Vec3::new(1.0, 2.0, 3.0), Vec2::new(0.5, 0.25));
        assert_eq!(TexSpace::Position.point(&coords, 2.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(TexSpace::Uv.point(&coords, 2.0), Vec3::new(1.0, 0.5, 0.0));
    }
}
