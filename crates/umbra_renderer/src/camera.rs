//! Thin-lens camera.

use umbra_math::{Ray, Vec2, Vec3};

use crate::sampling::concentric_disk;

/// Camera that maps film and lens coordinates to eye rays.
#[derive(Debug, Clone)]
pub struct Camera {
    // Positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    // Lens
    vfov: f32,     // Vertical field of view in degrees
    aperture: f32, // Lens diameter; 0 is a pinhole
    focus_dist: Option<f32>,
    aspect: f32,

    // Derived by initialize()
    u: Vec3,
    v: Vec3,
    w: Vec3,
    upper_left: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    lens_radius: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// Camera at the origin looking down -z.
    pub fn new() -> Self {
        let mut camera = Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            vup: Vec3::Y,
            vfov: 40.0,
            aperture: 0.0,
            focus_dist: None,
            aspect: 4.0 / 3.0,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            upper_left: Vec3::ZERO,
            horizontal: Vec3::ZERO,
            vertical: Vec3::ZERO,
            lens_radius: 0.0,
        };
        camera.initialize();
        camera
    }

    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialize();
        self
    }

    /// Set the field of view (degrees), aperture diameter and focus
    /// distance; `None` focuses on the look-at point.
    pub fn with_lens(mut self, vfov: f32, aperture: f32, focus_dist: Option<f32>) -> Self {
        self.vfov = vfov;
        self.aperture = aperture;
        self.focus_dist = focus_dist;
        self.initialize();
        self
    }

    /// Width over height of the film.
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self.initialize();
        self
    }

    fn initialize(&mut self) {
        let focus_dist = self
            .focus_dist
            .unwrap_or_else(|| (self.look_at - self.look_from).length());
        let half_height = (self.vfov.to_radians() / 2.0).tan() * focus_dist;
        let half_width = half_height * self.aspect;

        self.w = (self.look_from - self.look_at).normalize_or_zero();
        self.u = self.vup.cross(self.w).normalize_or_zero();
        self.v = self.w.cross(self.u);

        self.horizontal = self.u * (2.0 * half_width);
        self.vertical = -self.v * (2.0 * half_height);
        self.upper_left = self.look_from - self.w * focus_dist - self.horizontal / 2.0 - self.vertical / 2.0;
        self.lens_radius = self.aperture / 2.0;
    }

    pub fn position(&self) -> Vec3 {
        self.look_from
    }

    /// Ray through film position `film_uv` (`(0, 0)` top left, `(1, 1)`
    /// bottom right), leaving the lens at `lens_uv` mapped onto the
    /// aperture disk.
    pub fn eye_ray(&self, film_uv: Vec2, lens_uv: Vec2) -> Ray {
        let target = self.upper_left + self.horizontal * film_uv.x + self.vertical * film_uv.y;
        let origin = if self.lens_radius > 0.0 {
            let d = concentric_disk(lens_uv) * self.lens_radius;
            self.look_from + self.u * d.x + self.v * d.y
        } else {
            self.look_from
        };
        Ray::new(origin, (target - origin).normalize(), 0.0, f32::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_hits_look_at() {
        let camera = Camera::new().with_position(Vec3::new(0.0, 3.0, -4.0), Vec3::ZERO, Vec3::Y);
        let ray = camera.eye_ray(Vec2::splat(0.5), Vec2::splat(0.5));
        assert!((ray.origin - Vec3::new(0.0, 3.0, -4.0)).length() < 1e-6);
        assert!((ray.dir - Vec3::new(0.0, -0.6, 0.8)).length() < 1e-5);
    }

    #[test]
    fn test_film_orientation_and_fov() {
        let camera = Camera::new()
            .with_position(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y)
            .with_lens(90.0, 0.0, None)
            .with_aspect(1.0);

        let top_left = camera.eye_ray(Vec2::ZERO, Vec2::ZERO);
        assert!(top_left.dir.x < 0.0 && top_left.dir.y > 0.0);

        // a 90 degree field of view puts the top edge at 45 degrees
        let top = camera.eye_ray(Vec2::new(0.5, 0.0), Vec2::ZERO);
        assert!((top.dir - Vec3::new(0.0, 1.0, -1.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn test_thin_lens_focuses() {
        let camera = Camera::new()
            .with_position(Vec3::ZERO, Vec3::NEG_Z * 5.0, Vec3::Y)
            .with_lens(40.0, 1.0, None);

        // every lens position converges on the same point of the focal plane
        for lens in [Vec2::ZERO, Vec2::new(0.9, 0.1), Vec2::new(0.3, 0.7)] {
            let ray = camera.eye_ray(Vec2::new(0.25, 0.5), lens);
            assert!(ray.origin.length() <= 0.5 + 1e-5);
            let t = (-5.0 - ray.origin.z) / ray.dir.z;
            let p = ray.at(t);
            let pinhole = camera.eye_ray(Vec2::new(0.25, 0.5), Vec2::splat(0.5));
            let q = pinhole.at((-5.0 - pinhole.origin.z) / pinhole.dir.z);
            assert!((p - q).length() < 1e-4);
        }
    }
}
