//! Types shared by welding and expansion

use fmdl_common::{slerp, BoneId, Face, Vertex};
use glam::{Vec2, Vec3};

/// Per-corner attributes of a triangulated authoring mesh, in host space
///
/// Every array holds three entries per triangle, corner `3 * t + k` being
/// corner `k` of triangle `t`.
#[derive(Clone, Debug, Default)]
pub struct LoopLayers {
    /// Vertex slot of each corner
    pub slots: Vec<u32>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub colors: Option<Vec<[f32; 4]>>,
    /// One or two UV channels, V already flipped to the format's convention
    pub uv_channels: Vec<Vec<Vec2>>,
}

impl LoopLayers {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.slots.len() / 3
    }
}

/// Distinct attribute bundle found at one position
///
/// Corners that match an existing loop are folded into it; the loop then
/// becomes a single output vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct Loop {
    pub normal: Vec3,
    pub color: Option<[f32; 4]>,
    pub uv: Vec<Vec2>,
    /// Raw tangents of every merged corner, in merge order
    pub tangents: Vec<Vec3>,
    /// Corner indices resolved to this loop
    pub corners: Vec<usize>,
}

impl Loop {
    /// Loop for a single corner
    pub fn from_corner(layers: &LoopLayers, corner: usize) -> Self {
        Self {
            normal: layers.normals[corner],
            color: layers.colors.as_ref().map(|c| c[corner]),
            uv: layers.uv_channels.iter().map(|c| c[corner]).collect(),
            tangents: vec![layers.tangents[corner]],
            corners: vec![corner],
        }
    }

    /// Whether two loops can share a vertex
    ///
    /// Colours and UVs must be exactly equal; normals only approximately.
    pub fn matches(&self, other: &Loop, normal_similarity: f32) -> bool {
        self.color == other.color
            && self.uv == other.uv
            && self.normal.dot(other.normal) >= normal_similarity
    }

    /// Fold `other` into this loop
    ///
    /// The normal moves toward the newcomer in proportion to its share of
    /// the contributing corners.
    pub fn merge(&mut self, other: Loop) {
        self.tangents.extend(other.tangents);
        self.corners.extend(other.corners);
        self.normal = slerp(self.normal, other.normal, 1.0 / self.corners.len() as f32);
    }
}

/// Shared-vertex geometry produced by welding
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeldedGeometry {
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
}

/// Per-slot skin weights keyed by document bone
pub type SlotWeights = Vec<(BoneId, f32)>;
