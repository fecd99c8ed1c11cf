//! FMDL document to scene import

use fmdl_common::{FmdlDocument, MeshId, MAX_UV_CHANNELS};
use hashbrown::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::context::ConversionContext;
use crate::error::{FmdlError, Result};
use crate::material::{import_materials, material_key};
use crate::mesh::expand_mesh;
use crate::mesh_group::{import_mesh_tree, AUTO_MESH_NAME_PREFIX};
use crate::scene::{ObjectId, ObjectKind, Scene};
use crate::settings::ImportSettings;
use crate::skeleton::build_armature;

/// Name of the armature object created on import
pub const ARMATURE_OBJECT_NAME: &str = "Skeleton";

/// Object names for every mesh
///
/// A mesh alone in a named group takes the group's name; the others are
/// numbered `mesh_id 0`, `mesh_id 1`, ... in document order.
pub fn import_mesh_names(doc: &FmdlDocument) -> Vec<String> {
    let mut names: HashMap<MeshId, String> = HashMap::new();
    for group in &doc.mesh_groups {
        if let [mesh] = group.meshes.as_slice() {
            if !group.name.is_empty() {
                names.insert(*mesh, group.name.clone());
            }
        }
    }

    let mut next_index = 0;
    doc.mesh_ids()
        .map(|id| match names.remove(&id) {
            Some(name) => name,
            None => {
                let name = format!("{}{}", AUTO_MESH_NAME_PREFIX, next_index);
                next_index += 1;
                name
            }
        })
        .collect()
}

/// Import a document into the scene
///
/// Extensions are decoded first. Returns the root object holding the
/// imported hierarchy and armature.
pub fn import_fmdl(
    scene: &mut Scene,
    doc: FmdlDocument,
    filename: &Path,
    settings: &ImportSettings,
    ctx: &ConversionContext,
) -> Result<ObjectId> {
    let doc = ctx.codecs.decode(doc, &settings.extensions)?;
    let names = import_mesh_names(&doc);

    for (mesh, name) in doc.meshes.iter().zip(&names) {
        if usize::from(mesh.vertex_fields.uv_count) > MAX_UV_CHANNELS {
            return Err(FmdlError::UnsupportedUvCount {
                mesh: name.clone(),
                count: mesh.vertex_fields.uv_count,
            });
        }
    }
    doc.check_references()?;

    let materials = import_materials(scene, &doc);
    info!("Imported {} materials", materials.len());

    let armature = if doc.bones.is_empty() {
        None
    } else {
        let armature = build_armature(&doc, ctx.skeleton);
        info!("Imported {} bones", armature.bones.len());
        Some(scene.add_object(ARMATURE_OBJECT_NAME, None, ObjectKind::Armature(armature)))
    };

    let mut mesh_objects = Vec::with_capacity(doc.meshes.len());
    for (mesh, name) in doc.meshes.iter().zip(&names) {
        let mut authoring = expand_mesh(&doc, mesh, name)?;
        let material = materials
            .get(&material_key(mesh))
            .map(|&index| scene.materials[index].name.clone());
        authoring.materials = vec![material];
        if mesh.vertex_fields.has_bone_mapping {
            authoring.armature = armature;
        }
        debug!(
            "Mesh '{}': {} vertex slots, {} polygons",
            name,
            authoring.positions.len(),
            authoring.polygons.len()
        );
        mesh_objects.push(scene.add_object(name, None, ObjectKind::Mesh(authoring)));
    }

    let root = import_mesh_tree(
        scene,
        &doc,
        &mesh_objects,
        filename,
        settings.effective_bounding_box_mode(),
    );
    if let Some(armature) = armature {
        scene.set_parent(armature, Some(root));
    }

    info!("Imported {} meshes into '{}'", mesh_objects.len(), scene.object(root).name);
    Ok(root)
}
