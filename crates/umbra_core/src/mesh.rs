//! Triangle mesh geometry.
//!
//! Meshes are plain vertex/index buffers; the renderer turns each face into
//! its own triangle surface sharing these buffers.

use crate::{CoreError, CoreResult};
use umbra_math::{Aabb, Mat4, Mat4Ext, Vec3};

/// A mesh consisting of vertex positions, optional normals, and triangle indices.
///
/// Faces use counter-clockwise winding: the geometric normal of face
/// `[a, b, c]` is `(b - a) x (c - a)`.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals, one per vertex when present
    pub normals: Option<Vec<Vec3>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh, checking that every index refers to a vertex and
    /// that normals (if given) match the vertex count.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> CoreResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(CoreError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(CoreError::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad,
                positions.len()
            )));
        }
        if let Some(normals) = &normals {
            if normals.len() != positions.len() {
                return Err(CoreError::InvalidMesh(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    positions.len()
                )));
            }
        }
        if positions.iter().any(|p| !p.is_finite()) {
            return Err(CoreError::InvalidMesh("non-finite vertex position".into()));
        }

        let bounds = Aabb::enclosing(positions.iter().copied());
        Ok(Self {
            positions,
            normals,
            indices,
            bounds,
        })
    }

    /// Compute smooth vertex normals by averaging area-weighted face normals.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for face in self.indices.chunks_exact(3) {
            let [a, b, c] = [face[0] as usize, face[1] as usize, face[2] as usize];
            let face_normal = (self.positions[b] - self.positions[a])
                .cross(self.positions[c] - self.positions[a]);
            normals[a] += face_normal;
            normals[b] += face_normal;
            normals[c] += face_normal;
        }

        for normal in &mut normals {
            // Unreferenced or degenerate vertices keep a default up normal
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Apply a transform to positions and normals.
    pub fn transform(&mut self, xform: &Mat4) {
        for p in &mut self.positions {
            *p = xform.transform_point3(*p);
        }
        if let Some(normals) = &mut self.normals {
            let inv = xform.inverse();
            for n in normals.iter_mut() {
                *n = inv.transform_normal_by_inverse(*n);
            }
        }
        self.bounds = Aabb::enclosing(self.positions.iter().copied());
    }

    /// Check if the mesh has normals.
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Vertex indices of triangle `i`.
    pub fn triangle(&self, i: usize) -> [usize; 3] {
        let base = i * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        Mesh::new(positions, vec![0, 1, 2, 0, 2, 3], None).expect("valid mesh")
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = quad();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.triangle(1), [0, 2, 3]);
        assert!(!mesh.has_normals());
    }

    #[test]
    fn test_compute_normals_ccw() {
        let mut mesh = quad();
        mesh.compute_normals();

        for normal in mesh.normals.as_ref().expect("normals computed") {
            assert!((normal.z - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_rejects_bad_indices() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        assert!(matches!(
            Mesh::new(positions.clone(), vec![0, 1, 3], None),
            Err(CoreError::InvalidMesh(_))
        ));
        assert!(matches!(
            Mesh::new(positions.clone(), vec![0, 1], None),
            Err(CoreError::InvalidMesh(_))
        ));
        assert!(matches!(
            Mesh::new(positions, vec![0, 1, 2], Some(vec![Vec3::Z])),
            Err(CoreError::InvalidMesh(_))
        ));
    }

    #[test]
    fn test_transform_updates_bounds() {
        let mut mesh = quad();
        mesh.compute_normals();
        mesh.transform(&Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)));

        assert!((mesh.bounds.centroid().z - 5.0).abs() < 0.001);
        let n = mesh.normals.as_ref().expect("normals kept")[0];
        assert!((n - Vec3::Z).length() < 0.001);
    }
}
