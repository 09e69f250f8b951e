//! The renderable scene: surfaces, lights and the spatial index over them.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use umbra_core::AccelKind;
use umbra_math::{Aabb, Color, Ray, Vec3};

use crate::context::RenderContext;
use crate::error::{RenderError, RenderResult};
use crate::intersect::IsecInfo;
use crate::light::{EnvironLight, Light, SurfaceLight};
use crate::media::Medium;
use crate::space::{build_space, Space};
use crate::surface::{MeshSurface, Surface};

/// Surfaces and lights, plus a lazily built spatial index.
///
/// Surfaces may only be added before [`setup`](Scene::setup); afterwards the
/// scene is shared read-only between render threads.
pub struct Scene {
    surfaces: Vec<Arc<dyn Surface>>,
    lights: Vec<Box<dyn Light>>,
    space: OnceLock<Box<dyn Space>>,
    accel: AccelKind,
    background: Color,
    has_partial_occluders: bool,
    has_environ_lights: bool,
    bbox: Aabb,
    set_up: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene with a BVH index and black background.
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
            lights: Vec::new(),
            space: OnceLock::new(),
            accel: AccelKind::Bvh,
            background: Color::ZERO,
            has_partial_occluders: false,
            has_environ_lights: false,
            bbox: Aabb::EMPTY,
            set_up: false,
        }
    }

    pub fn with_accel(mut self, accel: AccelKind) -> Self {
        self.accel = accel;
        self
    }

    /// Constant radiance from every direction, used when no light at
    /// infinity is given. Setup turns it into an [`EnvironLight`] so that it
    /// is sampled like any other light.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn add_surface(&mut self, surface: Arc<dyn Surface>) -> RenderResult<()> {
        if self.set_up {
            return Err(RenderError::SceneLocked);
        }
        self.surfaces.push(surface);
        Ok(())
    }

    /// Add every face of a mesh.
    pub fn add_mesh(&mut self, mesh: &Arc<MeshSurface>) -> RenderResult<()> {
        for tri in mesh.triangles() {
            self.add_surface(Arc::new(tri))?;
        }
        Ok(())
    }

    pub fn add_light(&mut self, light: Box<dyn Light>) -> RenderResult<()> {
        if self.set_up {
            return Err(RenderError::SceneLocked);
        }
        self.lights.push(light);
        Ok(())
    }

    /// Validate materials and lights, create area lights for emitting
    /// surfaces, and let every light see the final scene bounds.
    pub fn setup(&mut self) -> RenderResult<()> {
        if self.set_up {
            return Ok(());
        }

        for surface in &self.surfaces {
            surface.material().validate()?;
        }

        let mut area_lights = 0;
        for surface in &self.surfaces {
            let Some(radiance) = surface.material().emission() else {
                continue;
            };
            match surface.sampler() {
                Some(sampler) => {
                    self.lights.push(Box::new(SurfaceLight::new(sampler, radiance)));
                    area_lights += 1;
                }
                None => log::warn!(
                    "Emitting surface with bounds {:?} cannot be sampled; it will only be seen directly",
                    surface.bbox()
                ),
            }
        }

        if !self.lights.iter().any(|l| l.is_environ_light()) && self.background.max_element() > 0.0 {
            log::debug!("Background {} becomes an environment light", self.background);
            self.lights.push(Box::new(EnvironLight::new(self.background)));
        }

        self.bbox = self
            .surfaces
            .iter()
            .fold(Aabb::EMPTY, |acc, s| Aabb::surrounding(&acc, &s.bbox()));
        for light in &mut self.lights {
            light.validate()?;
            light.scene_setup(&self.bbox);
        }

        self.has_partial_occluders = self
            .surfaces
            .iter()
            .any(|s| !s.material().fully_occluding());
        self.has_environ_lights = self.lights.iter().any(|l| l.is_environ_light());

        if self.lights.is_empty() {
            log::warn!("Scene has no lights");
        }
        log::info!(
            "Scene setup: {} surfaces, {} lights ({} from emitting surfaces), bounds diameter {:.3}",
            self.surfaces.len(),
            self.lights.len(),
            area_lights,
            self.bbox.diameter()
        );

        self.set_up = true;
        Ok(())
    }

    pub fn is_set_up(&self) -> bool {
        self.set_up
    }

    pub fn surfaces(&self) -> &[Arc<dyn Surface>] {
        &self.surfaces
    }

    pub fn lights(&self) -> &[Box<dyn Light>] {
        &self.lights
    }

    /// Bounds of all surfaces; valid after setup.
    pub fn bbox(&self) -> Aabb {
        self.bbox
    }

    /// The spatial index, built on first use.
    pub fn space(&self) -> &dyn Space {
        self.space
            .get_or_init(|| {
                let start = Instant::now();
                let space = build_space(self.accel, self.surfaces.clone());
                log::info!(
                    "Built {:?} index over {} surfaces in {:.2?}",
                    self.accel,
                    self.surfaces.len(),
                    start.elapsed()
                );
                space
            })
            .as_ref()
    }

    /// Nearest hit along `ray`, narrowing `ray.t1` to it.
    pub fn intersect<'a>(
        &'a self,
        ray: &mut Ray,
        ctx: &'a RenderContext<'_>,
    ) -> Option<&'a dyn IsecInfo<'a>> {
        ctx.count_scene_intersect();
        self.space().intersect(ray, ctx)
    }

    /// True if anything other than `ignore` blocks `ray`, ignoring
    /// transparency.
    pub fn intersects(&self, ray: &Ray, ignore: Option<&dyn Surface>, ctx: &RenderContext<'_>) -> bool {
        self.space().intersects_any(ray, ignore, ctx)
    }

    /// Shadow test. Returns the fraction of light that gets through `ray`
    /// travelling in `medium`, or `None` if it is completely blocked.
    pub fn shadow(
        &self,
        ray: &Ray,
        medium: &Medium,
        ignore: Option<&dyn Surface>,
        ctx: &RenderContext<'_>,
    ) -> Option<Color> {
        ctx.count_shadow_ray();
        if !self.has_partial_occluders {
            return (!self.intersects(ray, ignore, ctx)).then_some(Color::ONE);
        }
        let mut total = Color::ONE;
        if self.space().occludes(ray, medium, &mut total, ignore, ctx) {
            None
        } else {
            Some(total)
        }
    }

    /// Radiance arriving along an escaping world-space direction.
    pub fn background(&self, dir: Vec3) -> Color {
        if !self.has_environ_lights {
            return self.background;
        }
        self.lights.iter().map(|l| l.background(dir)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::PointLight;
    use crate::material::{Glow, Lambert, ThinGlass};
    use crate::surface::{Cylinder, Sphere, Tripar};
    use umbra_core::RenderConfig;
    use umbra_math::Mat4;

    fn gray() -> Arc<dyn crate::material::Material> {
        Arc::new(Lambert::new(Color::splat(0.5)))
    }

    #[test]
    fn test_emitting_surfaces_become_lights() {
        let mut scene = Scene::new();
        let lamp = Tripar::parallelogram(Vec3::ZERO, Vec3::X, Vec3::Y, Arc::new(Glow::new(Color::ONE)));
        scene.add_surface(Arc::new(lamp)).expect("add");
        // no sampler: warned about, not turned into a light
        scene
            .add_surface(Arc::new(Cylinder::new(Mat4::IDENTITY, Arc::new(Glow::new(Color::ONE)))))
            .expect("add");
        scene.add_surface(Arc::new(Sphere::new(Vec3::Z * 3.0, 1.0, gray()))).expect("add");
        scene.setup().expect("setup");

        assert_eq!(scene.lights().len(), 1);
        assert!(scene.bbox().contains(Vec3::new(0.0, 0.0, 4.0), 1e-4));
        assert!(matches!(
            scene.add_surface(Arc::new(Sphere::new(Vec3::ZERO, 1.0, gray()))),
            Err(RenderError::SceneLocked)
        ));
    }

    #[test]
    fn test_invalid_material_fails_setup() {
        let mut scene = Scene::new();
        scene
            .add_surface(Arc::new(Sphere::new(
                Vec3::ZERO,
                1.0,
                Arc::new(Lambert::new(Color::new(-1.0, 0.0, 0.0))),
            )))
            .expect("add");
        assert!(matches!(scene.setup(), Err(RenderError::InvalidMaterial { .. })));
    }

    #[test]
    fn test_invalid_light_fails_setup() {
        let mut scene = Scene::new();
        scene
            .add_light(Box::new(PointLight::new(Vec3::ZERO, Color::splat(f32::NAN))))
            .expect("add");
        assert!(matches!(scene.setup(), Err(RenderError::InvalidLight(_))));
    }

    #[test]
    fn test_background() {
        let mut plain = Scene::new().with_background(Color::splat(0.2));
        plain.setup().expect("setup");
        assert_eq!(plain.background(Vec3::X), Color::splat(0.2));
        // sampled as a light
        assert_eq!(plain.lights().len(), 1);
        assert!(plain.lights()[0].is_environ_light());

        let mut dark = Scene::new();
        dark.setup().expect("setup");
        assert!(dark.lights().is_empty());
        assert_eq!(dark.background(Vec3::X), Color::ZERO);

        let mut negative = Scene::new().with_background(Color::new(1.0, -1.0, 0.0));
        assert!(matches!(negative.setup(), Err(RenderError::InvalidLight(_))));

        let mut lit = Scene::new().with_background(Color::splat(0.2));
        lit.add_light(Box::new(EnvironLight::new(Color::splat(0.7)))).expect("add");
        lit.setup().expect("setup");
        assert_eq!(lit.background(Vec3::X), Color::splat(0.7));
        assert_eq!(lit.lights().len(), 1);
    }

    #[test]
    fn test_shadow_counts_and_transmits() {
        let mut scene = Scene::new();
        scene
            .add_surface(Arc::new(Tripar::parallelogram(
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::X * 2.0,
                Vec3::Y * 2.0,
                Arc::new(ThinGlass::new(Color::splat(0.5), 1.0)),
            )))
            .expect("add");
        scene.setup().expect("setup");

        let params = RenderConfig::default();
        let ctx = RenderContext::new(&scene, &params);
        let ray = Ray::between(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), 1e-3);
        let through = scene.shadow(&ray, &Medium::default(), None, &ctx).expect("partial");
        assert!((through - Color::splat(0.5)).length() < 1e-4);
        assert_eq!(ctx.stats().shadow_rays, 1);
    }
}
