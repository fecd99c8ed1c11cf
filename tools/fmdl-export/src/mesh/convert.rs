//! Authoring mesh to document mesh conversion

use fmdl_common::{
    flip_v, BoneId, MaterialId, Mesh, VertexFields, EXT_ANTIBLUR,
};
use glam::Vec3;
use hashbrown::HashMap;
use tracing::debug;

use super::expand::flat_normals;
use super::types::{LoopLayers, SlotWeights};
use super::uv_layers::{resolve_uv_layers, UvSelection};
use super::weld::weld_loops;
use crate::error::{FmdlError, Result};
use crate::scene::{AuthoringMesh, Material};
use crate::settings::WeldPolicy;

/// Fan-triangulate the polygons and gather per-corner layers
///
/// Triangle `(0, i, i + 1)` of each polygon copies the attributes of the
/// polygon corners it uses.
pub fn triangulate_layers(name: &str, mesh: &AuthoringMesh, uv: UvSelection) -> Result<LoopLayers> {
    let corner_count = mesh.corner_count();
    let invalid = |reason: String| FmdlError::InvalidMesh {
        mesh: name.to_string(),
        reason,
    };
    let check_len = |what: &str, len: usize| {
        if len == corner_count {
            Ok(())
        } else {
            Err(invalid(format!(
                "{} has {} entries for {} corners",
                what, len, corner_count
            )))
        }
    };

    if let Some(slot) = mesh
        .polygons
        .iter()
        .flatten()
        .find(|&&s| s as usize >= mesh.positions.len())
    {
        return Err(invalid(format!("polygon references missing vertex {}", slot)));
    }
    if let Some(small) = mesh.polygons.iter().find(|p| p.len() < 3) {
        return Err(invalid(format!("polygon with {} corners", small.len())));
    }

    let normals = if mesh.normals.is_empty() {
        flat_normals(&mesh.positions, &mesh.polygons)
    } else {
        check_len("normals", mesh.normals.len())?;
        mesh.normals.clone()
    };
    if !mesh.tangents.is_empty() {
        check_len("tangents", mesh.tangents.len())?;
    }
    let colors = match mesh.color_layers.first() {
        Some(layer) => {
            check_len("color layer", layer.colors.len())?;
            Some(layer.colors.as_slice())
        }
        None => None,
    };
    let uv_sources: Vec<&[glam::Vec2]> = std::iter::once(uv.color)
        .chain(uv.normals)
        .map(|layer| {
            let uvs = &mesh.uv_layers[layer].uvs;
            check_len("UV layer", uvs.len()).map(|_| uvs.as_slice())
        })
        .collect::<Result<_>>()?;

    let triangle_count = mesh.triangle_count();
    let mut layers = LoopLayers {
        slots: Vec::with_capacity(3 * triangle_count),
        normals: Vec::with_capacity(3 * triangle_count),
        tangents: Vec::with_capacity(3 * triangle_count),
        colors: colors.map(|_| Vec::with_capacity(3 * triangle_count)),
        uv_channels: vec![Vec::with_capacity(3 * triangle_count); uv_sources.len()],
    };

    let mut start = 0;
    for polygon in &mesh.polygons {
        for i in 1..polygon.len() - 1 {
            for k in [0, i, i + 1] {
                let corner = start + k;
                layers.slots.push(polygon[k]);
                layers.normals.push(normals[corner]);
                layers
                    .tangents
                    .push(mesh.tangents.get(corner).copied().unwrap_or(Vec3::ZERO));
                if let (Some(out), Some(src)) = (layers.colors.as_mut(), colors) {
                    out.push(src[corner]);
                }
                for (out, src) in layers.uv_channels.iter_mut().zip(&uv_sources) {
                    out.push(flip_v(src[corner]));
                }
            }
        }
        start += polygon.len();
    }

    Ok(layers)
}

/// Convert one authoring mesh into a document mesh
///
/// `bones` maps vertex group names to document bones; every vertex group
/// of the mesh must be present.
pub fn export_mesh(
    name: &str,
    mesh: &AuthoringMesh,
    material: &Material,
    material_id: MaterialId,
    bones: &HashMap<String, BoneId>,
    policy: &WeldPolicy,
) -> Result<Mesh> {
    let mut fields = VertexFields {
        has_normal: true,
        has_tangent: true,
        ..Default::default()
    };

    match mesh.color_layers.len() {
        0 => {}
        1 => fields.has_color = true,
        _ => return Err(FmdlError::MultipleColorLayers(name.to_string())),
    }

    let uv = resolve_uv_layers(name, mesh, material)?;
    fields.uv_count = uv.uv_count();
    fields.high_precision_uv = mesh.high_precision_uvs;

    let bone_group: Vec<BoneId> = mesh
        .vertex_groups
        .iter()
        .filter_map(|group| bones.get(group).copied())
        .collect();
    fields.has_bone_mapping = !bone_group.is_empty();

    let weights: Vec<SlotWeights> = (0..mesh.positions.len())
        .map(|slot| {
            mesh.weights
                .get(slot)
                .map(|slot_weights| {
                    slot_weights
                        .iter()
                        .filter_map(|&(group, weight)| {
                            bone_group.get(group as usize).map(|&bone| (bone, weight))
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    let layers = triangulate_layers(name, mesh, uv)?;
    let geometry = weld_loops(&mesh.positions, &weights, &layers, policy);

    debug!(
        "Mesh '{}': {} vertices, {} faces, {} bones",
        name,
        geometry.vertices.len(),
        geometry.faces.len(),
        bone_group.len()
    );

    let mut result = Mesh {
        vertices: geometry.vertices,
        faces: geometry.faces,
        material_instance: material_id,
        bone_group,
        vertex_fields: fields,
        alpha_flags: material.alpha_flags,
        shadow_flags: material.shadow_flags,
        ..Default::default()
    };
    if material.antiblur {
        result.add_extension_header(EXT_ANTIBLUR);
    }
    Ok(result)
}
