//! Scene description types.
//!
//! These mirror the JSON scene format one-to-one and carry no rendering
//! state; the renderer converts a validated `SceneDesc` into its own
//! surfaces, materials and lights.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use umbra_math::{EulerRot, Mat4, Quat, Vec3};

use crate::config::RenderConfig;
use crate::mesh::Mesh;
use crate::{CoreError, CoreResult};

/// Convert a JSON triple into a vector.
#[inline]
pub fn vec3(a: [f32; 3]) -> Vec3 {
    Vec3::from_array(a)
}

fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_vfov() -> f32 {
    40.0
}

fn default_ior() -> f32 {
    1.5
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn white_param() -> Param<[f32; 3]> {
    Param::Const(white())
}

fn default_tex_scale() -> f32 {
    1.0
}

fn default_octaves() -> u32 {
    4
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// A complete scene: settings, camera, materials, geometry and lights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDesc {
    #[serde(default)]
    pub render: RenderConfig,
    pub camera: CameraDesc,
    #[serde(default)]
    pub materials: Vec<MaterialDesc>,
    #[serde(default)]
    pub surfaces: Vec<SurfaceDesc>,
    #[serde(default)]
    pub lights: Vec<LightDesc>,
}

/// Pinhole or thin-lens camera placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDesc {
    pub look_from: [f32; 3],
    pub look_at: [f32; 3],
    #[serde(default = "default_up")]
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    #[serde(default = "default_vfov")]
    pub vfov: f32,
    /// Lens aperture diameter; 0 is a pinhole
    #[serde(default)]
    pub aperture: f32,
    /// Distance to the plane in focus; defaults to the look-at distance
    #[serde(default)]
    pub focus_dist: Option<f32>,
}

/// A named material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub name: String,
    #[serde(flatten)]
    pub kind: MaterialKind,
}

/// Material parameters, tagged by `"type"`.
///
/// Lambert, Cook-Torrance and mirror colors may be textured, and those
/// materials accept an optional `bump` height field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialKind {
    Lambert {
        color: Param<[f32; 3]>,
        #[serde(default)]
        bump: Option<Param<f32>>,
    },
    CookTorrance {
        color: Param<[f32; 3]>,
        gloss_color: Param<[f32; 3]>,
        /// Microfacet slope (roughness)
        m: f32,
        #[serde(default = "default_ior")]
        ior: f32,
        /// Extinction coefficient, non-zero for conductors
        #[serde(default)]
        ior_k: f32,
        #[serde(default)]
        bump: Option<Param<f32>>,
    },
    Mirror {
        #[serde(default = "white_param")]
        reflectance: Param<[f32; 3]>,
        #[serde(default = "default_ior")]
        ior: f32,
        #[serde(default)]
        ior_k: f32,
        /// Diffuse color under the mirror coating
        #[serde(default)]
        color: Param<[f32; 3]>,
        #[serde(default)]
        bump: Option<Param<f32>>,
    },
    Glass {
        #[serde(default = "default_ior")]
        ior: f32,
        #[serde(default)]
        absorption: [f32; 3],
    },
    ThinGlass {
        #[serde(default = "white")]
        color: [f32; 3],
        #[serde(default = "default_ior")]
        ior: f32,
    },
    Glow {
        color: [f32; 3],
        #[serde(default)]
        underlying: Option<String>,
    },
    Stencil {
        opacity: [f32; 3],
        underlying: String,
    },
}

/// A material parameter: a plain value or a texture producing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param<V> {
    Const(V),
    Texture(Box<TextureDesc<V>>),
}

impl<V: Default> Default for Param<V> {
    fn default() -> Self {
        Param::Const(V::default())
    }
}

impl<V> From<V> for Param<V> {
    fn from(v: V) -> Self {
        Param::Const(v)
    }
}

/// Coordinates a procedural texture is evaluated in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TexSpace {
    /// Surface parameterization
    #[default]
    Uv,
    /// World-space position
    Position,
}

/// Procedural textures, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextureDesc<V> {
    /// Alternating cells of size `1 / scale`
    Check {
        even: V,
        odd: V,
        #[serde(default = "default_tex_scale")]
        scale: f32,
        #[serde(default)]
        space: TexSpace,
    },
    /// Fractal gradient noise blending from `low` (default 0) to `high`
    /// (default 1)
    Perlin {
        #[serde(default = "default_tex_scale")]
        scale: f32,
        #[serde(default = "default_octaves")]
        octaves: u32,
        #[serde(default)]
        seed: u64,
        #[serde(default)]
        space: TexSpace,
        low: Option<V>,
        high: Option<V>,
    },
    /// `a` where `control` is 0, `b` where it is 1
    Mix {
        control: Param<f32>,
        a: Param<V>,
        b: Param<V>,
    },
}

impl MaterialKind {
    /// Names of other materials this one wraps.
    fn references(&self) -> Option<&str> {
        match self {
            MaterialKind::Glow { underlying, .. } => underlying.as_deref(),
            MaterialKind::Stencil { underlying, .. } => Some(underlying.as_str()),
            _ => None,
        }
    }
}

/// Translation, rotation (XYZ Euler, degrees) and scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformDesc {
    #[serde(default)]
    pub translate: [f32; 3],
    #[serde(default)]
    pub rotate: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
}

impl TransformDesc {
    /// Object-to-world matrix: scale, then rotate, then translate.
    pub fn to_mat4(&self) -> Mat4 {
        let [rx, ry, rz] = self.rotate.map(f32::to_radians);
        Mat4::from_scale_rotation_translation(
            vec3(self.scale),
            Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            vec3(self.translate),
        )
    }
}

/// One piece of geometry with its material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceDesc {
    pub material: String,
    /// Optional object-to-world transform; the surface becomes an instance
    #[serde(default)]
    pub transform: Option<TransformDesc>,
    #[serde(flatten)]
    pub shape: ShapeDesc,
}

/// Geometric shapes, tagged by `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDesc {
    Sphere {
        center: [f32; 3],
        radius: f32,
    },
    /// Ellipse inscribed in the parallelogram `corner`, `edge1`, `edge2`
    Ellipse {
        corner: [f32; 3],
        edge1: [f32; 3],
        edge2: [f32; 3],
    },
    /// Open cylinder from `base` along `axis` (axis length is the height)
    Cylinder {
        base: [f32; 3],
        axis: [f32; 3],
        radius: f32,
    },
    Triangle {
        v0: [f32; 3],
        v1: [f32; 3],
        v2: [f32; 3],
    },
    Parallelogram {
        corner: [f32; 3],
        edge1: [f32; 3],
        edge2: [f32; 3],
    },
    Mesh {
        positions: Vec<[f32; 3]>,
        indices: Vec<u32>,
        #[serde(default)]
        normals: Option<Vec<[f32; 3]>>,
        /// Compute smooth vertex normals when none are given
        #[serde(default)]
        smooth: bool,
    },
}

impl ShapeDesc {
    /// Build the mesh for a `Mesh` shape; `None` for other shapes.
    pub fn to_mesh(&self) -> Option<CoreResult<Mesh>> {
        match self {
            ShapeDesc::Mesh {
                positions,
                indices,
                normals,
                smooth,
            } => {
                let positions = positions.iter().copied().map(vec3).collect();
                let normals = normals
                    .as_ref()
                    .map(|ns| ns.iter().copied().map(vec3).collect());
                Some(Mesh::new(positions, indices.clone(), normals).map(|mut mesh| {
                    if *smooth && !mesh.has_normals() {
                        mesh.compute_normals();
                    }
                    mesh
                }))
            }
            _ => None,
        }
    }
}

/// Spotlight cone for a point light.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotDesc {
    pub direction: [f32; 3],
    /// Full cone angle in degrees
    pub angle: f32,
    /// Width of the soft edge in degrees
    #[serde(default)]
    pub fringe: f32,
}

/// Light sources, tagged by `"type"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LightDesc {
    Point {
        position: [f32; 3],
        intensity: [f32; 3],
        #[serde(default)]
        spot: Option<SpotDesc>,
    },
    Sphere {
        position: [f32; 3],
        radius: f32,
        intensity: [f32; 3],
    },
    /// Distant light; `direction` points toward the light
    Far {
        direction: [f32; 3],
        /// Full apparent angle in degrees
        #[serde(default)]
        angle: f32,
        intensity: [f32; 3],
    },
    Environ {
        radiance: [f32; 3],
    },
    /// Rectangular area light, emitting on the `edge1 x edge2` side
    Rect {
        corner: [f32; 3],
        edge1: [f32; 3],
        edge2: [f32; 3],
        radiance: [f32; 3],
    },
}

impl SceneDesc {
    /// Check cross references: unique material names, every referenced
    /// material exists, and wrapper materials do not form cycles.
    pub fn validate(&self) -> CoreResult<()> {
        self.render.validate()?;

        let mut by_name: HashMap<&str, &MaterialDesc> = HashMap::new();
        for mat in &self.materials {
            if by_name.insert(mat.name.as_str(), mat).is_some() {
                return Err(CoreError::InvalidScene(format!(
                    "material '{}' defined twice",
                    mat.name
                )));
            }
        }

        for mat in &self.materials {
            let mut current = mat;
            let mut depth = 0;
            while let Some(next) = current.kind.references() {
                current = by_name
                    .get(next)
                    .ok_or_else(|| CoreError::UnknownMaterial(next.to_string()))?;
                depth += 1;
                if depth > self.materials.len() {
                    return Err(CoreError::InvalidScene(format!(
                        "material '{}' wraps itself",
                        mat.name
                    )));
                }
            }
        }

        for surface in &self.surfaces {
            if !by_name.contains_key(surface.material.as_str()) {
                return Err(CoreError::UnknownMaterial(surface.material.clone()));
            }
            if let Some(mesh) = surface.shape.to_mesh() {
                mesh?;
            }
        }

        let from = vec3(self.camera.look_from);
        let at = vec3(self.camera.look_at);
        if (at - from).length_squared() == 0.0 {
            return Err(CoreError::InvalidScene(
                "camera look_from and look_at coincide".into(),
            ));
        }

        Ok(())
    }

    /// Look up a material by name.
    pub fn material(&self, name: &str) -> Option<&MaterialDesc> {
        self.materials.iter().find(|m| m.name == name)
    }
}
