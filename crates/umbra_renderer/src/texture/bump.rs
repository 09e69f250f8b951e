use umbra_math::{Frame, Vec2};

use super::{TexCoords, TexVal};
use crate::intersect::LocalGeometry;

/// Step in surface parameter space for finite differences of the height.
const DELTA_UV: f32 = 5e-4;

/// Shading-normal perturbation from a scalar height field.
#[derive(Debug, Clone)]
pub struct BumpMap {
    /// Displacement along the normal, in world units
    pub height: TexVal<f32>,
}

impl BumpMap {
    pub fn new(height: TexVal<f32>) -> Self {
        Self { height }
    }

    /// The shading frame of `geom` tilted by the slope of the height field.
    ///
    /// The surface is displaced along its normal by the height, and the new
    /// normal is the cross product of the displaced partial derivatives.
    /// Returns the frame unchanged where `dpdu` or `dpdv` degenerate.
    pub fn perturb(&self, geom: &LocalGeometry) -> Frame {
        let frame = geom.normal_frame;
        let n = frame.z;
        let surface_n = geom.dpdu.cross(geom.dpdv);
        if surface_n.length_squared() < 1e-12 {
            return frame;
        }
        let coords = TexCoords::of(geom);

        let h = self.height.eval(&coords);
        let h_u = self.height.eval(&TexCoords::new(
            coords.pos + geom.dpdu * DELTA_UV,
            coords.uv + Vec2::new(DELTA_UV, 0.0),
        ));
        let h_v = self.height.eval(&TexCoords::new(
            coords.pos + geom.dpdv * DELTA_UV,
            coords.uv + Vec2::new(0.0, DELTA_UV),
        ));

        let dpdu = geom.dpdu + n * ((h_u - h) / DELTA_UV);
        let dpdv = geom.dpdv + n * ((h_v - h) / DELTA_UV);
        let mut bumped = dpdu.cross(dpdv).normalize_or_zero();
        if bumped == umbra_math::Vec3::ZERO || !bumped.is_finite() {
            return frame;
        }
        // Keep the orientation of the unperturbed normal.
        if surface_n.dot(n) < 0.0 {
            bumped = -bumped;
        }
        Frame::from_z_tangent(frame.origin, bumped, geom.dpdu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Texture;
    use umbra_math::Vec3;

    /// Height rising linearly with u.
    struct Ramp(f32);

    impl Texture<f32> for Ramp {
        fn eval(&self, coords: &TexCoords) -> f32 {
            coords.uv.x * self.0
        }
    }

    fn plane() -> LocalGeometry {
        let frame = Frame::from_z_tangent(Vec3::new(1.0, 2.0, 0.0), Vec3::Z, Vec3::X);
        LocalGeometry::flat(frame, Vec2::new(0.5, 0.5), Vec3::X, Vec3::Y)
    }

    #[test]
    fn test_slope_tilts_normal() {
        let bump = BumpMap::new(TexVal::texture(Ramp(0.5)));
        let frame = bump.perturb(&plane());
        let expected = Vec3::new(-0.5, 0.0, 1.0).normalize();
        assert!((frame.z - expected).length() < 1e-3, "{}", frame.z);
        assert_eq!(frame.origin, Vec3::new(1.0, 2.0, 0.0));
        assert!(frame.x.dot(frame.z).abs() < 1e-5);
        assert!(frame.x.dot(Vec3::X) > 0.0);
    }

    #[test]
    fn test_flat_height_keeps_normal() {
        let bump = BumpMap::new(TexVal::Const(0.3));
        let frame = bump.perturb(&plane());
        assert!((frame.z - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_mirrored_parameterization_keeps_side() {
        // dpdu x dpdv points against the normal
        let frame = Frame::from_z_tangent(Vec3::ZERO, Vec3::Z, Vec3::Y);
        let geom = LocalGeometry::flat(frame, Vec2::new(0.5, 0.5), Vec3::Y, Vec3::X);
        let bump = BumpMap::new(TexVal::texture(Ramp(0.5)));
        assert!(bump.perturb(&geom).z.z > 0.8);
    }

    #[test]
    fn test_degenerate_derivatives_are_ignored() {
        let frame = Frame::from_z(Vec3::ZERO, Vec3::Z);
        let geom = LocalGeometry::flat(frame, Vec2::ZERO, Vec3::ZERO, Vec3::Y);
        let bump = BumpMap::new(TexVal::texture(Ramp(2.0)));
        assert_eq!(bump.perturb(&geom), frame);
    }
}
