//! Building a renderable scene from its JSON description.

use std::collections::HashMap;
use std::sync::Arc;

use umbra_core::scene::vec3;
use umbra_core::{
    CameraDesc, LightDesc, MaterialDesc, MaterialKind, Param, RenderConfig, SceneDesc, ShapeDesc,
    SurfaceDesc, TextureDesc,
};
use umbra_math::{Color, Vec3};

use crate::camera::Camera;
use crate::error::{RenderError, RenderResult};
use crate::light::{EnvironLight, FarLight, Light, PointLight, SphereLight, Spot};
use crate::material::{
    CookTorrance, Glass, Glow, Ior, Lambert, Material, Mirror, Stencil, ThinGlass,
};
use crate::scene::Scene;
use crate::surface::{Cylinder, Ellipse, Instance, MeshSurface, Sphere, Surface, Tripar};
use crate::texture::{BumpMap, Check, Mix, Perlin, TexSpace, TexVal, TexValue, Texture};

/// A set-up scene, its camera and render settings.
pub struct LoadedScene {
    pub scene: Scene,
    pub camera: Camera,
    pub params: RenderConfig,
}

/// Validate `desc` and convert it into a scene ready to render.
pub fn build_scene(desc: &SceneDesc) -> RenderResult<LoadedScene> {
    desc.validate()?;
    let params = desc.render.clone();

    let mut scene = Scene::new()
        .with_accel(params.accel)
        .with_background(Color::from_array(params.background));

    let mut materials = MaterialTable::new(&desc.materials);
    for surface in &desc.surfaces {
        let material = materials.get(&surface.material)?;
        add_surface(&mut scene, surface, material)?;
    }

    for light in &desc.lights {
        match build_light(light)? {
            Built::Light(light) => scene.add_light(light)?,
            Built::Surface(surface) => scene.add_surface(surface)?,
        }
    }

    scene.setup()?;
    let camera = build_camera(&desc.camera, params.aspect());

    Ok(LoadedScene {
        scene,
        camera,
        params,
    })
}

/// Materials by name, each built once and shared.
struct MaterialTable<'d> {
    descs: HashMap<&'d str, &'d MaterialDesc>,
    built: HashMap<&'d str, Arc<dyn Material>>,
}

impl<'d> MaterialTable<'d> {
    fn new(descs: &'d [MaterialDesc]) -> Self {
        Self {
            descs: descs.iter().map(|m| (m.name.as_str(), m)).collect(),
            built: HashMap::new(),
        }
    }

    fn get(&mut self, name: &str) -> RenderResult<Arc<dyn Material>> {
        if let Some(material) = self.built.get(name) {
            return Ok(material.clone());
        }
        let desc = *self
            .descs
            .get(name)
            .ok_or_else(|| umbra_core::CoreError::UnknownMaterial(name.to_string()))?;

        let material: Arc<dyn Material> = match &desc.kind {
            MaterialKind::Lambert { color, bump } => {
                let mut lambert = Lambert::new(build_param(&desc.name, "color", color)?);
                if let Some(bump) = build_bump(&desc.name, bump)? {
                    lambert = lambert.with_bump(bump);
                }
                Arc::new(lambert)
            }
            MaterialKind::CookTorrance {
                color,
                gloss_color,
                m,
                ior,
                ior_k,
                bump,
            } => {
                let mut ct = CookTorrance::new(
                    build_param(&desc.name, "color", color)?,
                    build_param(&desc.name, "gloss_color", gloss_color)?,
                    *m,
                    Ior::new(*ior, *ior_k),
                );
                if let Some(bump) = build_bump(&desc.name, bump)? {
                    ct = ct.with_bump(bump);
                }
                Arc::new(ct)
            }
            MaterialKind::Mirror {
                reflectance,
                ior,
                ior_k,
                color,
                bump,
            } => {
                let mut mirror = Mirror::new(
                    Ior::new(*ior, *ior_k),
                    build_param(&desc.name, "reflectance", reflectance)?,
                    build_param(&desc.name, "color", color)?,
                );
                if let Some(bump) = build_bump(&desc.name, bump)? {
                    mirror = mirror.with_bump(bump);
                }
                Arc::new(mirror)
            }
            MaterialKind::Glass { ior, absorption } => Arc::new(Glass::new(*ior, vec3(*absorption))),
            MaterialKind::ThinGlass { color, ior } => Arc::new(ThinGlass::new(vec3(*color), *ior)),
            MaterialKind::Glow { color, underlying } => match underlying {
                Some(under) => Arc::new(Glow::with_underlying(vec3(*color), self.get(under)?)),
                None => Arc::new(Glow::new(vec3(*color))),
            },
            MaterialKind::Stencil {
                opacity,
                underlying,
            } => Arc::new(Stencil::new(vec3(*opacity), self.get(underlying)?)),
        };

        self.built.insert(desc.name.as_str(), material.clone());
        Ok(material)
    }
}

/// Scene-file values a texture can produce.
trait ParamValue: Copy + std::fmt::Debug {
    type Value: TexValue;

    fn value(self) -> Self::Value;

    fn is_valid(self) -> bool;
}

impl ParamValue for [f32; 3] {
    type Value = Color;

    fn value(self) -> Color {
        vec3(self)
    }

    fn is_valid(self) -> bool {
        self.iter().all(|c| c.is_finite() && *c >= 0.0)
    }
}

impl ParamValue for f32 {
    type Value = f32;

    fn value(self) -> f32 {
        self
    }

    fn is_valid(self) -> bool {
        self.is_finite()
    }
}

fn build_param<V: ParamValue>(
    material: &str,
    what: &str,
    param: &Param<V>,
) -> RenderResult<TexVal<V::Value>> {
    match param {
        Param::Const(v) => Ok(TexVal::Const(v.value())),
        Param::Texture(tex) => Ok(TexVal::Tex(build_texture(material, what, tex)?)),
    }
}

fn build_bump(material: &str, height: &Option<Param<f32>>) -> RenderResult<Option<BumpMap>> {
    height
        .as_ref()
        .map(|h| build_param(material, "bump", h).map(BumpMap::new))
        .transpose()
}

fn build_texture<V: ParamValue>(
    material: &str,
    what: &str,
    desc: &TextureDesc<V>,
) -> RenderResult<Arc<dyn Texture<V::Value>>> {
    let value = |v: V| {
        if v.is_valid() {
            Ok(v.value())
        } else {
            Err(RenderError::material(
                material,
                format!("{} texture value {:?} is invalid", what, v),
            ))
        }
    };
    let check_scale = |scale: f32| {
        if scale.is_finite() && scale > 0.0 {
            Ok(scale)
        } else {
            Err(RenderError::material(
                material,
                format!("{} texture scale {} must be positive", what, scale),
            ))
        }
    };

    let texture: Arc<dyn Texture<V::Value>> = match desc {
        TextureDesc::Check {
            even,
            odd,
            scale,
            space,
        } => Arc::new(Check::new(
            tex_space(*space),
            check_scale(*scale)?,
            value(*even)?,
            value(*odd)?,
        )),
        TextureDesc::Perlin {
            scale,
            octaves,
            seed,
            space,
            low,
            high,
        } => {
            if *octaves == 0 {
                return Err(RenderError::material(
                    material,
                    format!("{} noise needs at least one octave", what),
                ));
            }
            let low = low.map(value).transpose()?.unwrap_or(V::Value::from_scalar(0.0));
            let high = high.map(value).transpose()?.unwrap_or(V::Value::from_scalar(1.0));
            Arc::new(Perlin::with_range(
                tex_space(*space),
                check_scale(*scale)?,
                *octaves,
                *seed,
                low,
                high,
            ))
        }
        TextureDesc::Mix { control, a, b } => Arc::new(Mix {
            control: build_param(material, what, control)?,
            a: build_param(material, what, a)?,
            b: build_param(material, what, b)?,
        }),
    };
    Ok(texture)
}

fn tex_space(space: umbra_core::TexSpace) -> TexSpace {
    match space {
        umbra_core::TexSpace::Uv => TexSpace::Uv,
        umbra_core::TexSpace::Position => TexSpace::Position,
    }
}

fn add_surface(scene: &mut Scene, desc: &SurfaceDesc, material: Arc<dyn Material>) -> RenderResult<()> {
    let invalid = |msg: String| Err(RenderError::InvalidSurface(msg));

    let surface: Arc<dyn Surface> = match &desc.shape {
        ShapeDesc::Sphere { center, radius } => {
            if !(*radius > 0.0) {
                return invalid(format!("sphere radius {} must be positive", radius));
            }
            Arc::new(Sphere::new(vec3(*center), *radius, material))
        }
        ShapeDesc::Ellipse { corner, edge1, edge2 } => {
            check_edges("ellipse", vec3(*edge1), vec3(*edge2))?;
            Arc::new(Ellipse::new(vec3(*corner), vec3(*edge1), vec3(*edge2), material))
        }
        ShapeDesc::Cylinder { base, axis, radius } => {
            if !(*radius > 0.0) || vec3(*axis).length_squared() == 0.0 {
                return invalid(format!("cylinder radius {} / axis {:?} is degenerate", radius, axis));
            }
            Arc::new(Cylinder::from_axis(vec3(*base), vec3(*axis), *radius, material))
        }
        ShapeDesc::Triangle { v0, v1, v2 } => {
            let (a, b, c) = (vec3(*v0), vec3(*v1), vec3(*v2));
            check_edges("triangle", b - a, c - a)?;
            Arc::new(Tripar::triangle(a, b, c, material))
        }
        ShapeDesc::Parallelogram { corner, edge1, edge2 } => {
            check_edges("parallelogram", vec3(*edge1), vec3(*edge2))?;
            Arc::new(Tripar::parallelogram(vec3(*corner), vec3(*edge1), vec3(*edge2), material))
        }
        ShapeDesc::Mesh { .. } => {
            let mut mesh = match desc.shape.to_mesh() {
                Some(mesh) => mesh?,
                None => return invalid("mesh shape without mesh data".into()),
            };
            // Bake the transform into the vertices rather than instancing
            // every face
            if let Some(xform) = &desc.transform {
                mesh.transform(&xform.to_mat4());
            }
            log::debug!(
                "Mesh: {} vertices, {} triangles",
                mesh.vertex_count(),
                mesh.triangle_count()
            );
            return scene.add_mesh(&MeshSurface::new(mesh, material));
        }
    };

    let surface = match &desc.transform {
        Some(xform) => Arc::new(Instance::new(xform.to_mat4(), surface)) as Arc<dyn Surface>,
        None => surface,
    };
    scene.add_surface(surface)
}

fn check_edges(what: &str, e1: Vec3, e2: Vec3) -> RenderResult<()> {
    if e1.cross(e2).length_squared() > 0.0 {
        Ok(())
    } else {
        Err(RenderError::InvalidSurface(format!("{} has zero area", what)))
    }
}

enum Built {
    Light(Box<dyn Light>),
    /// Lights with geometry become emitting surfaces
    Surface(Arc<dyn Surface>),
}

fn build_light(desc: &LightDesc) -> RenderResult<Built> {
    let direction = |d: [f32; 3]| {
        let d = vec3(d);
        if d.length_squared() > 0.0 {
            Ok(d.normalize())
        } else {
            Err(RenderError::InvalidLight("zero-length direction".into()))
        }
    };

    let light: Box<dyn Light> = match desc {
        LightDesc::Point {
            position,
            intensity,
            spot,
        } => {
            let mut light = PointLight::new(vec3(*position), vec3(*intensity));
            if let Some(spot) = spot {
                light = light.with_spot(Spot::new(direction(spot.direction)?, spot.angle, spot.fringe));
            }
            Box::new(light)
        }
        LightDesc::Sphere {
            position,
            radius,
            intensity,
        } => {
            if !(*radius > 0.0) {
                return Err(RenderError::InvalidLight(format!(
                    "sphere light radius {} must be positive",
                    radius
                )));
            }
            Box::new(SphereLight::new(vec3(*position), *radius, vec3(*intensity)))
        }
        LightDesc::Far {
            direction: dir,
            angle,
            intensity,
        } => Box::new(FarLight::new(direction(*dir)?, angle.to_radians(), vec3(*intensity))),
        LightDesc::Environ { radiance } => Box::new(EnvironLight::new(vec3(*radiance))),
        LightDesc::Rect {
            corner,
            edge1,
            edge2,
            radiance,
        } => {
            check_edges("rect light", vec3(*edge1), vec3(*edge2))?;
            return Ok(Built::Surface(Arc::new(Tripar::parallelogram(
                vec3(*corner),
                vec3(*edge1),
                vec3(*edge2),
                Arc::new(Glow::new(vec3(*radiance))),
            ))));
        }
    };
    Ok(Built::Light(light))
}

fn build_camera(desc: &CameraDesc, aspect: f32) -> Camera {
    Camera::new()
        .with_position(vec3(desc.look_from), vec3(desc.look_at), vec3(desc.up))
        .with_lens(desc.vfov, desc.aperture, desc.focus_dist)
        .with_aspect(aspect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::load_scene_from_str;

    const SCENE: &str = r#"{
        "render": { "width": 32, "height": 24, "samples_per_pixel": 2 },
        "camera": { "look_from": [0, 3, -4], "look_at": [0, 0, 0] },
        "materials": [
            { "name": "white", "type": "lambert", "color": [0.8, 0.8, 0.8] },
            { "name": "lamp", "type": "glow", "color": [4, 4, 4], "underlying": "white" },
            { "name": "veil", "type": "stencil", "opacity": [0.5, 0.5, 0.5], "underlying": "white" }
        ],
        "surfaces": [
            { "type": "sphere", "material": "white", "center": [0, 0, 0], "radius": 1 },
            { "type": "parallelogram", "material": "lamp",
              "corner": [-1, 3, -1], "edge1": [2, 0, 0], "edge2": [0, 0, 2] },
            { "type": "sphere", "material": "veil", "center": [0, 0, 0], "radius": 1,
              "transform": { "translate": [3, 0, 0], "scale": [1, 2, 1] } },
            { "type": "mesh", "material": "white",
              "positions": [[-5, -1, -5], [5, -1, -5], [5, -1, 5], [-5, -1, 5]],
              "indices": [0, 2, 1, 0, 3, 2] }
        ],
        "lights": [
            { "type": "point", "position": [0, 5, 0], "intensity": [25, 25, 25],
              "spot": { "direction": [0, -1, 0], "angle": 60, "fringe": 10 } },
            { "type": "far", "direction": [1, 1, 0], "angle": 0.5, "intensity": [1, 1, 1] },
            { "type": "rect", "corner": [-1, 4, -1], "edge1": [2, 0, 0], "edge2": [0, 0, 2],
              "radiance": [2, 2, 2] }
        ]
    }"#;

    #[test]
    fn test_build_scene() {
        let desc = load_scene_from_str(SCENE).expect("parses");
        let loaded = build_scene(&desc).expect("builds");

        // sphere, lamp, instanced sphere, two mesh faces, rect light geometry
        assert_eq!(loaded.scene.surfaces().len(), 6);
        // point + far + the lamp and rect emitters
        assert_eq!(loaded.scene.lights().len(), 4);
        assert_eq!(loaded.params.width, 32);
        assert!((loaded.camera.position() - Vec3::new(0.0, 3.0, -4.0)).length() < 1e-6);

        // the instance is stretched to y = 2
        assert!(loaded.scene.bbox().contains(Vec3::new(3.0, 1.9, 0.0), 1e-4));
    }

    #[test]
    fn test_rejects_degenerate_geometry() {
        let mut desc = load_scene_from_str(SCENE).expect("parses");
        desc.surfaces[0].shape = ShapeDesc::Sphere {
            center: [0.0; 3],
            radius: 0.0,
        };
        assert!(matches!(build_scene(&desc), Err(RenderError::InvalidSurface(_))));

        let mut desc = load_scene_from_str(SCENE).expect("parses");
        desc.lights[1] = LightDesc::Far {
            direction: [0.0; 3],
            angle: 0.0,
            intensity: [1.0; 3],
        };
        assert!(matches!(build_scene(&desc), Err(RenderError::InvalidLight(_))));
    }

    #[test]
    fn test_demo_scenes_build() {
        for (name, json) in [
            ("cornell", include_str!("../../../demos/cornell.json")),
            ("spheres", include_str!("../../../demos/spheres.json")),
        ] {
            let desc = load_scene_from_str(json).unwrap_or_else(|e| panic!("{}: {}", name, e));
            let loaded = build_scene(&desc).unwrap_or_else(|e| panic!("{}: {}", name, e));
            assert!(!loaded.scene.lights().is_empty(), "{} has no lights", name);
        }
    }

    #[test]
    fn test_textured_materials() {
        let json = SCENE.replace(
            r#""type": "lambert", "color": [0.8, 0.8, 0.8] }"#,
            r#""type": "cook_torrance", "m": 0.2,
                "color": { "type": "check", "even": [0.8, 0.1, 0.1], "odd": [0.1, 0.1, 0.8], "scale": 4 },
                "gloss_color": { "type": "mix", "control": { "type": "perlin", "seed": 3 },
                                 "a": [0.2, 0.2, 0.2], "b": [1, 1, 1] },
                "bump": { "type": "perlin", "scale": 10, "high": 0.01 } }"#,
        );
        let mut desc = load_scene_from_str(&json).expect("parses");
        assert!(matches!(desc.materials[0].kind, MaterialKind::CookTorrance { .. }));
        let loaded = build_scene(&desc).expect("builds");
        assert!(loaded
            .scene
            .surfaces()
            .iter()
            .any(|s| s.material().bump_map().is_some()));

        // a negative color hidden in a texture is still rejected
        desc.materials[0].kind = MaterialKind::Lambert {
            color: Param::Texture(Box::new(TextureDesc::Check {
                even: [0.5; 3],
                odd: [-0.5, 0.0, 0.0],
                scale: 1.0,
                space: umbra_core::TexSpace::Uv,
            })),
            bump: None,
        };
        assert!(matches!(build_scene(&desc), Err(RenderError::InvalidMaterial { .. })));

        desc.materials[0].kind = MaterialKind::Lambert {
            color: [0.5; 3].into(),
            bump: Some(Param::Texture(Box::new(TextureDesc::Perlin {
                scale: 1.0,
                octaves: 0,
                seed: 0,
                space: umbra_core::TexSpace::Position,
                low: None,
                high: None,
            }))),
        };
        assert!(matches!(build_scene(&desc), Err(RenderError::InvalidMaterial { .. })));
    }

    #[test]
    fn test_invalid_material_parameter() {
        let mut desc = load_scene_from_str(SCENE).expect("parses");
        desc.materials[0].kind = MaterialKind::Glass {
            ior: -1.0,
            absorption: [0.0; 3],
        };
        assert!(matches!(build_scene(&desc), Err(RenderError::InvalidMaterial { .. })));
    }
}
