//! Shared-vertex FMDL mesh
//!
//! Vertices are deduplicated by position and attributes; faces reference
//! them by index. Every vertex in a mesh carries exactly the attributes its
//! [`VertexFields`] declare.

use std::collections::BTreeSet;

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::document::{BoneId, MaterialId};

/// Hard per-mesh vertex limit of the format (16-bit indices)
pub const MAX_VERTICES: usize = 65535;

/// Hard per-mesh face limit of the format
pub const MAX_FACES: usize = 21845;

/// Hard per-mesh bone group limit of the format
pub const MAX_BONE_GROUP_BONES: usize = 32;

/// Maximum number of UV channels a vertex can carry
pub const MAX_UV_CHANNELS: usize = 2;

/// Extension header marking meshes whose material needs the antiblur workaround
pub const EXT_ANTIBLUR: &str = "Has-Antiblur-Meshes";

/// Extension header marking meshes with an authored bounding box
pub const EXT_CUSTOM_BOUNDING_BOX: &str = "Custom-Bounding-Box-Meshes";

/// A single shared vertex
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec4,
    pub tangent: Vec4,
    pub color: Option<[f32; 4]>,
    pub uv: Vec<Vec2>,
    /// Skin weights in bone group order; weights need not sum to one
    pub bone_mapping: Vec<(BoneId, f32)>,
}

/// Triangle referencing three vertices of the owning mesh
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub vertices: [u32; 3],
}

impl Face {
    pub fn new(a: u32, b: u32, c: u32) -> Self {
        Self { vertices: [a, b, c] }
    }
}

/// Attributes populated on every vertex of a mesh
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexFields {
    pub has_normal: bool,
    pub has_tangent: bool,
    pub has_color: bool,
    pub has_bone_mapping: bool,
    pub uv_count: u8,
    pub high_precision_uv: bool,
}

/// Violations reported by [`Mesh::check_invariants`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshInvariantError {
    #[error("{0} UV channels declared, at most 2 are supported")]
    UvCount(u8),

    #[error("vertex {vertex} does not match the declared {field} field")]
    VertexFields { vertex: usize, field: &'static str },

    #[error("vertex {vertex} is weighted to bone {bone}, which is not in the bone group")]
    BoneNotInGroup { vertex: usize, bone: usize },

    #[error("bone group references missing bone {0}")]
    BoneOutOfRange(usize),

    #[error("face {face} references missing vertex {index}")]
    FaceIndex { face: usize, index: u32 },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
    pub material_instance: MaterialId,
    /// Bones referenced by this mesh's vertices, in first-reference order
    pub bone_group: Vec<BoneId>,
    pub vertex_fields: VertexFields,
    pub alpha_flags: u8,
    pub shadow_flags: u8,
    pub extension_headers: BTreeSet<String>,
}

impl Mesh {
    /// Extension headers are matched case-insensitively
    pub fn has_extension_header(&self, header: &str) -> bool {
        self.extension_headers
            .iter()
            .any(|h| h.eq_ignore_ascii_case(header))
    }

    pub fn add_extension_header(&mut self, header: &str) {
        if !self.has_extension_header(header) {
            self.extension_headers.insert(header.to_string());
        }
    }

    /// Whether the second UV channel differs from the first anywhere
    pub fn has_distinct_uv_channels(&self) -> bool {
        self.vertex_fields.uv_count >= 2
            && self
                .vertices
                .iter()
                .any(|v| v.uv.len() >= 2 && v.uv[0] != v.uv[1])
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|v| v.position)
    }

    /// Check the vertex field and bone group invariants
    pub fn check_invariants(&self, bone_count: usize) -> Result<(), MeshInvariantError> {
        let fields = &self.vertex_fields;
        if usize::from(fields.uv_count) > MAX_UV_CHANNELS {
            return Err(MeshInvariantError::UvCount(fields.uv_count));
        }

        if let Some(bone) = self.bone_group.iter().find(|b| b.0 >= bone_count) {
            return Err(MeshInvariantError::BoneOutOfRange(bone.0));
        }

        for (index, vertex) in self.vertices.iter().enumerate() {
            let mismatch = |field| MeshInvariantError::VertexFields {
                vertex: index,
                field,
            };
            if vertex.color.is_some() != fields.has_color {
                return Err(mismatch("color"));
            }
            if vertex.uv.len() != usize::from(fields.uv_count) {
                return Err(mismatch("uv"));
            }
            if !fields.has_bone_mapping && !vertex.bone_mapping.is_empty() {
                return Err(mismatch("bone mapping"));
            }
            for (bone, _) in &vertex.bone_mapping {
                if !self.bone_group.contains(bone) {
                    return Err(MeshInvariantError::BoneNotInGroup {
                        vertex: index,
                        bone: bone.0,
                    });
                }
            }
        }

        let vertex_count = self.vertices.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if let Some(&index) = face.vertices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshInvariantError::FaceIndex {
                    face: face_index,
                    index,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(uv: Vec<Vec2>) -> Vertex {
        Vertex {
            position: Vec3::ZERO,
            normal: Vec4::new(0.0, 1.0, 0.0, 1.0),
            tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
            uv,
            ..Default::default()
        }
    }

    fn mesh_with(vertices: Vec<Vertex>, uv_count: u8) -> Mesh {
        Mesh {
            faces: vec![Face::new(0, 0, 0)],
            vertices,
            vertex_fields: VertexFields {
                has_normal: true,
                has_tangent: true,
                uv_count,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_extension_header_case_insensitive() {
        let mut mesh = Mesh::default();
        mesh.add_extension_header(EXT_ANTIBLUR);
        mesh.add_extension_header("has-antiblur-meshes");
        assert_eq!(mesh.extension_headers.len(), 1);
        assert!(mesh.has_extension_header("HAS-ANTIBLUR-MESHES"));
        assert!(!mesh.has_extension_header(EXT_CUSTOM_BOUNDING_BOX));
    }

    #[test]
    fn test_distinct_uv_channels() {
        let same = mesh_with(vec![vertex(vec![Vec2::ONE, Vec2::ONE])], 2);
        assert!(!same.has_distinct_uv_channels());
        let different = mesh_with(vec![vertex(vec![Vec2::ONE, Vec2::ZERO])], 2);
        assert!(different.has_distinct_uv_channels());
    }

    #[test]
    fn test_invariants_uv_mismatch() {
        let mesh = mesh_with(vec![vertex(vec![Vec2::ZERO])], 2);
        assert_eq!(
            mesh.check_invariants(0),
            Err(MeshInvariantError::VertexFields {
                vertex: 0,
                field: "uv"
            })
        );
    }

    #[test]
    fn test_invariants_bone_not_in_group() {
        let mut v = vertex(vec![Vec2::ZERO]);
        v.bone_mapping.push((BoneId(1), 1.0));
        let mut mesh = mesh_with(vec![v], 1);
        mesh.vertex_fields.has_bone_mapping = true;
        mesh.bone_group = vec![BoneId(0)];
        assert_eq!(
            mesh.check_invariants(2),
            Err(MeshInvariantError::BoneNotInGroup { vertex: 0, bone: 1 })
        );

        mesh.bone_group.push(BoneId(1));
        assert_eq!(mesh.check_invariants(2), Ok(()));
    }

    #[test]
    fn test_invariants_face_index() {
        let mut mesh = mesh_with(vec![vertex(vec![])], 0);
        mesh.faces.push(Face::new(0, 1, 0));
        assert_eq!(
            mesh.check_invariants(0),
            Err(MeshInvariantError::FaceIndex { face: 1, index: 1 })
        );
    }
}
