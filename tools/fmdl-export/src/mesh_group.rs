//! Mesh group trees
//!
//! Export mirrors the host parent/child graph into the document's mesh
//! group forest. Import rebuilds scene objects from that forest below a
//! synthesized root object.

use fmdl_common::{FmdlDocument, MeshGroupId, MeshId, EXT_CUSTOM_BOUNDING_BOX};
use glam::Vec3;
use hashbrown::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

use crate::scene::{simplify_name, Lattice, ObjectId, ObjectKind, Scene};
use crate::settings::BoundingBoxMode;

/// Prefix of mesh object names generated on import
pub const AUTO_MESH_NAME_PREFIX: &str = "mesh_id ";

/// Smallest lattice extent created on import
const MIN_LATTICE_SIZE: f32 = 1.0e-6;

/// Nearest mesh or empty ancestor of `object` below `root`
pub fn determine_parent(scene: &Scene, object: ObjectId, root: Option<ObjectId>) -> Option<ObjectId> {
    let mut parent = scene.object(object).parent;
    while let Some(candidate) = parent {
        if Some(candidate) == root {
            return None;
        }
        match scene.object(candidate).kind {
            ObjectKind::Mesh(_) | ObjectKind::Empty { .. } => return Some(candidate),
            _ => parent = scene.object(candidate).parent,
        }
    }
    None
}

struct GroupBuilder<'a> {
    scene: &'a Scene,
    parents: HashMap<ObjectId, Option<ObjectId>>,
    groups: HashMap<ObjectId, MeshGroupId>,
}

impl GroupBuilder<'_> {
    /// Group for `object`, creating it and any missing ancestor groups
    fn ensure_group(&mut self, object: ObjectId, doc: &mut FmdlDocument) -> MeshGroupId {
        let mut chain = Vec::new();
        let mut current = Some(object);
        while let Some(id) = current {
            if self.groups.contains_key(&id) {
                break;
            }
            chain.push(id);
            current = self.parents.get(&id).copied().flatten();
        }

        for &id in chain.iter().rev() {
            let parent = self
                .parents
                .get(&id)
                .copied()
                .flatten()
                .and_then(|p| self.groups.get(&p).copied());
            let name = simplify_name(&self.scene.object(id).name);
            let group = doc.add_mesh_group(name, parent);
            self.groups.insert(id, group);
        }

        self.groups[&object]
    }
}

/// Build the mesh group forest for exported meshes
///
/// `meshes` pairs every exported mesh object with its document mesh, in
/// export order. Mesh objects named `mesh_id ...` that nothing hangs off
/// are not given their own named group: a lone one is placed straight in
/// its parent's group, others get an empty-named group each.
pub fn export_mesh_groups(
    scene: &Scene,
    meshes: &[(ObjectId, MeshId)],
    root: Option<ObjectId>,
    doc: &mut FmdlDocument,
) {
    let mut parents: HashMap<ObjectId, Option<ObjectId>> = HashMap::new();
    for &(object, _) in meshes {
        let mut current = Some(object);
        while let Some(id) = current {
            if parents.contains_key(&id) {
                break;
            }
            let parent = determine_parent(scene, id, root);
            parents.insert(id, parent);
            current = parent;
        }
    }

    let used_as_parent: HashSet<ObjectId> = parents.values().flatten().copied().collect();
    let mut siblings: HashMap<Option<ObjectId>, usize> = HashMap::new();
    for &(object, _) in meshes {
        *siblings.entry(parents[&object]).or_default() += 1;
    }

    let mut builder = GroupBuilder {
        scene,
        parents,
        groups: HashMap::new(),
    };

    for &(object, mesh) in meshes {
        let auto_named = scene.object(object).name.starts_with(AUTO_MESH_NAME_PREFIX);
        let group = if auto_named && !used_as_parent.contains(&object) {
            let parent = builder.parents[&object];
            let parent_group = parent.map(|p| builder.ensure_group(p, doc));
            match parent_group {
                Some(group) if siblings[&parent] == 1 => group,
                _ => doc.add_mesh_group("", parent_group),
            }
        } else {
            builder.ensure_group(object, doc)
        };
        doc.mesh_groups[group.0].meshes.push(mesh);
    }

    debug!("Built {} mesh groups for {} meshes", doc.mesh_groups.len(), meshes.len());
}

/// Reorder meshes to follow mesh group order
///
/// Returns the new id of every old mesh id.
pub fn sort_meshes_by_group(doc: &mut FmdlDocument) -> Vec<MeshId> {
    let mut order: Vec<MeshId> = Vec::with_capacity(doc.meshes.len());
    let mut placed = vec![false; doc.meshes.len()];
    let grouped = doc.mesh_groups.iter().flat_map(|g| g.meshes.iter().copied());
    for id in grouped.chain(doc.mesh_ids()) {
        if !placed[id.0] {
            placed[id.0] = true;
            order.push(id);
        }
    }

    let mut remap = vec![MeshId(0); doc.meshes.len()];
    for (new, old) in order.iter().enumerate() {
        remap[old.0] = MeshId(new);
    }

    let mut old_meshes: Vec<Option<fmdl_common::Mesh>> =
        std::mem::take(&mut doc.meshes).into_iter().map(Some).collect();
    doc.meshes = order
        .iter()
        .filter_map(|old| old_meshes[old.0].take())
        .collect();
    for group in &mut doc.mesh_groups {
        for mesh in &mut group.meshes {
            *mesh = remap[mesh.0];
        }
    }

    remap
}

/// Name of the root object created on import: `<parent dir>/<file stem>`
pub fn import_root_name(filename: &Path) -> String {
    let stem = filename
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = filename
        .parent()
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if dir.is_empty() {
        stem
    } else {
        format!("{}/{}", dir, stem)
    }
}

/// Add a lattice child showing a bounding box; extents are clamped to a
/// minimum size
pub fn add_bounding_box_lattice(scene: &mut Scene, mesh_object: ObjectId, min: Vec3, max: Vec3) -> ObjectId {
    let max = min + (max - min).max(Vec3::splat(MIN_LATTICE_SIZE));
    let name = format!("Bounding box for {}", scene.object(mesh_object).name);
    scene.add_object(&name, Some(mesh_object), ObjectKind::Lattice(Lattice { min, max }))
}

/// Rebuild scene objects for the document's mesh groups
///
/// `mesh_objects[i]` is the scene object of document mesh `i`. Returns the
/// synthesized root object, named from `filename`.
pub fn import_mesh_tree(
    scene: &mut Scene,
    doc: &FmdlDocument,
    mesh_objects: &[ObjectId],
    filename: &Path,
    mode: BoundingBoxMode,
) -> ObjectId {
    let root = scene.add_object(
        &import_root_name(filename),
        None,
        ObjectKind::Empty {
            fmdl_filename: Some(filename.to_string_lossy().into_owned()),
        },
    );

    let mut stack: Vec<(MeshGroupId, ObjectId)> = doc
        .root_mesh_groups()
        .into_iter()
        .rev()
        .map(|g| (g, root))
        .collect();

    while let Some((mut id, parent)) = stack.pop() {
        let mut group = doc.mesh_group(id);
        while group.name.is_empty() && group.meshes.is_empty() && group.children.len() == 1 {
            id = group.children[0];
            group = doc.mesh_group(id);
        }

        let object = match group.meshes.as_slice() {
            [mesh] => mesh_objects[mesh.0],
            meshes => {
                let empty = scene.add_object(&group.name, None, ObjectKind::empty());
                for mesh in meshes {
                    scene.set_parent(mesh_objects[mesh.0], Some(empty));
                }
                empty
            }
        };
        scene.set_parent(object, Some(parent));

        for &mesh in &group.meshes {
            let wanted = match mode {
                BoundingBoxMode::All => true,
                BoundingBoxMode::Custom => doc.mesh(mesh).has_extension_header(EXT_CUSTOM_BOUNDING_BOX),
                BoundingBoxMode::None => false,
            };
            if wanted {
                let (min, max) = group.bounding_box.to_host();
                add_bounding_box_lattice(scene, mesh_objects[mesh.0], min, max);
            }
        }

        for &child in group.children.iter().rev() {
            stack.push((child, object));
        }
    }

    root
}
