//! Capacity validation of finished documents

use fmdl_common::{FmdlDocument, MeshId, MAX_BONE_GROUP_BONES, MAX_FACES, MAX_VERTICES};

use crate::error::{FmdlError, Result};

/// Name used for a mesh in messages
///
/// The first group holding exactly this one mesh names it, unless that
/// name is empty; otherwise the mesh is called `mesh_id <index>`.
pub fn mesh_display_name(doc: &FmdlDocument, mesh: MeshId) -> String {
    doc.mesh_groups
        .iter()
        .find(|g| g.meshes.len() == 1 && g.meshes[0] == mesh)
        .map(|g| g.name.as_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("mesh_id {}", mesh.0))
}

/// Every capacity violation in the document, in mesh order
pub fn capacity_violations(doc: &FmdlDocument) -> Vec<String> {
    let mut errors = Vec::new();
    for id in doc.mesh_ids() {
        let mesh = doc.mesh(id);
        let name = || mesh_display_name(doc, id);

        if mesh.vertices.len() > MAX_VERTICES {
            errors.push(format!(
                "Mesh '{}' contains {} vertices out of a maximum of {}",
                name(),
                mesh.vertices.len(),
                MAX_VERTICES
            ));
        }
        if mesh.faces.len() > MAX_FACES {
            errors.push(format!(
                "Mesh '{}' contains {} faces out of a maximum of {}",
                name(),
                mesh.faces.len(),
                MAX_FACES
            ));
        }
        if mesh.bone_group.len() > MAX_BONE_GROUP_BONES {
            errors.push(format!(
                "Mesh '{}' bone group contains {} bones out of a maximum of {}",
                name(),
                mesh.bone_group.len(),
                MAX_BONE_GROUP_BONES
            ));
        }
    }
    errors
}

/// Fail with every capacity violation at once
pub fn validate(doc: &FmdlDocument) -> Result<()> {
    let errors = capacity_violations(doc);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(FmdlError::Validation(errors))
    }
}
