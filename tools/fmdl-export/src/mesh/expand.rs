//! Vertex expansion: shared vertices back to face corners
//!
//! Vertex slots are the unique vertex positions, in first-appearance order.
//! Each face contributes its three corners in reversed order, which undoes
//! the winding flip applied by [`super::weld::weld_loops`].

use fmdl_common::{flip_v, format_to_host, position_key, FmdlDocument, Mesh, PositionKey};
use glam::Vec3;
use hashbrown::HashMap;

use super::uv_layers::{UV_MAP_COLOR, UV_MAP_NORMALS};
use crate::error::{FmdlError, Result};
use crate::scene::{AuthoringMesh, ColorLayer, UvLayer};

/// Normals shorter than this are left as they are
const MIN_NORMALIZE_LENGTH: f32 = 0.01;

pub const COLOR_LAYER_NAME: &str = "Col";

/// Expand a document mesh into a host authoring mesh
///
/// Materials and the armature reference are left for the caller to fill in.
pub fn expand_mesh(doc: &FmdlDocument, mesh: &Mesh, name: &str) -> Result<AuthoringMesh> {
    let fields = mesh.vertex_fields;
    if usize::from(fields.uv_count) > fmdl_common::MAX_UV_CHANNELS {
        return Err(FmdlError::UnsupportedUvCount {
            mesh: name.to_string(),
            count: fields.uv_count,
        });
    }

    let mut slot_of: HashMap<PositionKey, u32> = HashMap::new();
    let mut slot_vertices: Vec<usize> = Vec::new();
    for (index, vertex) in mesh.vertices.iter().enumerate() {
        slot_of.entry(position_key(vertex.position)).or_insert_with(|| {
            slot_vertices.push(index);
            slot_vertices.len() as u32 - 1
        });
    }

    let corner_vertices: Vec<usize> = mesh
        .faces
        .iter()
        .flat_map(|f| f.vertices.iter().rev().map(|&v| v as usize))
        .collect();
    if let Some(&bad) = corner_vertices.iter().find(|&&v| v >= mesh.vertices.len()) {
        return Err(FmdlError::InvalidMesh {
            mesh: name.to_string(),
            reason: format!("face references missing vertex {}", bad),
        });
    }

    let corner = |c: usize| &mesh.vertices[corner_vertices[c]];

    let positions: Vec<Vec3> = slot_vertices
        .iter()
        .map(|&v| format_to_host(mesh.vertices[v].position))
        .collect();
    let polygons: Vec<Vec<u32>> = corner_vertices
        .chunks(3)
        .map(|tri| {
            tri.iter()
                .map(|&v| slot_of[&position_key(mesh.vertices[v].position)])
                .collect()
        })
        .collect();

    let normals: Vec<Vec3> = if fields.has_normal {
        (0..corner_vertices.len())
            .map(|c| {
                let n = format_to_host(corner(c).normal.truncate());
                if n.length() < MIN_NORMALIZE_LENGTH { n } else { n.normalize() }
            })
            .collect()
    } else {
        flat_normals(&positions, &polygons)
    };

    let tangents: Vec<Vec3> = if fields.has_tangent {
        (0..corner_vertices.len())
            .map(|c| format_to_host(corner(c).tangent.truncate()))
            .collect()
    } else {
        Vec::new()
    };

    let mut color_layers = Vec::new();
    if fields.has_color {
        color_layers.push(ColorLayer {
            name: COLOR_LAYER_NAME.to_string(),
            colors: (0..corner_vertices.len())
                .map(|c| corner(c).color.unwrap_or([1.0; 4]))
                .collect(),
        });
    }

    let uv_channel = |channel: usize| -> Vec<glam::Vec2> {
        (0..corner_vertices.len())
            .map(|c| corner(c).uv.get(channel).copied().map(flip_v).unwrap_or_default())
            .collect()
    };
    let mut uv_layers = Vec::new();
    if fields.uv_count >= 1 {
        uv_layers.push(UvLayer {
            name: UV_MAP_COLOR.to_string(),
            uvs: uv_channel(0),
        });
    }
    if fields.uv_count >= 2 && mesh.has_distinct_uv_channels() {
        uv_layers.push(UvLayer {
            name: UV_MAP_NORMALS.to_string(),
            uvs: uv_channel(1),
        });
    }

    let (vertex_groups, weights) = if fields.has_bone_mapping {
        let groups: Vec<String> = mesh
            .bone_group
            .iter()
            .map(|&b| doc.bone(b).name.clone())
            .collect();
        let weights: Vec<Vec<(u32, f32)>> = slot_vertices
            .iter()
            .map(|&v| {
                mesh.vertices[v]
                    .bone_mapping
                    .iter()
                    .filter_map(|(bone, weight)| {
                        mesh.bone_group
                            .iter()
                            .position(|b| b == bone)
                            .map(|g| (g as u32, *weight))
                    })
                    .collect()
            })
            .collect();
        (groups, weights)
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(AuthoringMesh {
        positions,
        polygons,
        normals,
        tangents,
        color_layers,
        uv_layers,
        vertex_groups,
        weights,
        materials: Vec::new(),
        high_precision_uvs: fields.high_precision_uv,
        armature: None,
    })
}

/// One normal per corner, shared by all corners of a polygon
pub(crate) fn flat_normals(positions: &[Vec3], polygons: &[Vec<u32>]) -> Vec<Vec3> {
    polygons
        .iter()
        .flat_map(|polygon| {
            let p = |i: usize| positions[polygon[i] as usize];
            let normal = if polygon.len() >= 3 {
                (p(1) - p(0)).cross(p(2) - p(0)).normalize_or_zero()
            } else {
                Vec3::ZERO
            };
            std::iter::repeat_n(normal, polygon.len())
        })
        .collect()
}
