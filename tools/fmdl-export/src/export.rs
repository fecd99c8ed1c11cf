//! Scene to FMDL document export

use fmdl_common::{BoundingBox, FmdlDocument, MeshId, EXT_CUSTOM_BOUNDING_BOX};
use hashbrown::HashMap;
use tracing::{info, warn};

use crate::bounds::compute_bounding_boxes;
use crate::context::ConversionContext;
use crate::error::{FmdlError, Result};
use crate::material::export_materials;
use crate::mesh::export_mesh;
use crate::mesh_group::{export_mesh_groups, sort_meshes_by_group};
use crate::scene::{ObjectId, ObjectKind, Scene};
use crate::settings::ExportSettings;
use crate::skeleton::build_bones;
use crate::validation::validate;

/// Mesh objects with geometry below `object`, including itself, children
/// visited in name order
fn find_mesh_objects(scene: &Scene, object: ObjectId, found: &mut Vec<ObjectId>) {
    let mut stack = vec![object];
    while let Some(id) = stack.pop() {
        if scene.mesh(id).is_some_and(|m| !m.polygons.is_empty()) {
            found.push(id);
        }
        stack.extend(scene.children(id).into_iter().rev());
    }
}

/// Mesh objects to export and the object the export is rooted at
///
/// Without a root name the whole scene is exported, rooted at the parent
/// of the scene's only armature when that parent is top-level. A root that
/// is itself a mesh is exported along with its subtree, rooted at its own
/// parent.
pub fn list_mesh_objects(scene: &Scene, root_name: Option<&str>) -> (Vec<ObjectId>, Option<ObjectId>) {
    let root = match root_name {
        Some(name) => {
            let found = scene.find(name);
            if found.is_none() {
                warn!("Root object '{}' not found, exporting the whole scene", name);
            }
            found
        }
        None => None,
    };

    let mut meshes = Vec::new();
    match root {
        Some(root) => {
            find_mesh_objects(scene, root, &mut meshes);
            let root_is_mesh = scene.mesh(root).is_some_and(|m| !m.polygons.is_empty());
            let root = if root_is_mesh { scene.object(root).parent } else { Some(root) };
            (meshes, root)
        }
        None => {
            for id in scene.roots() {
                find_mesh_objects(scene, id, &mut meshes);
            }
            let armatures: Vec<ObjectId> = scene
                .ids()
                .filter(|&id| matches!(scene.object(id).kind, ObjectKind::Armature(_)))
                .collect();
            let root = match armatures.as_slice() {
                [armature] => scene
                    .object(*armature)
                    .parent
                    .filter(|&p| scene.object(p).parent.is_none()),
                _ => None,
            };
            (meshes, root)
        }
    }
}

/// Bone names used by the meshes, in first-reference order
fn referenced_bones(scene: &Scene, meshes: &[ObjectId]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for mesh in meshes.iter().filter_map(|&id| scene.mesh(id)) {
        for group in &mesh.vertex_groups {
            if !names.contains(group) {
                names.push(group.clone());
            }
        }
    }
    names
}

/// The single material of a mesh object
fn mesh_material<'a>(scene: &'a Scene, object: ObjectId) -> Result<&'a str> {
    let name = &scene.object(object).name;
    let materials: Vec<&str> = scene
        .mesh(object)
        .map(|m| {
            m.materials
                .iter()
                .flatten()
                .map(String::as_str)
                .filter(|n| !n.is_empty())
                .collect()
        })
        .unwrap_or_default();
    match materials.as_slice() {
        [] => Err(FmdlError::MissingMaterial(name.clone())),
        [material] => Ok(*material),
        [first, second, ..] => Err(FmdlError::MultipleMaterials {
            mesh: name.clone(),
            first: first.to_string(),
            second: second.to_string(),
        }),
    }
}

/// The authored bounding box of a mesh object, from its lattice child
fn custom_bounding_box(scene: &Scene, object: ObjectId) -> Result<Option<BoundingBox>> {
    let mut lattices = scene
        .children(object)
        .into_iter()
        .filter_map(|child| match &scene.object(child).kind {
            ObjectKind::Lattice(lattice) => Some(*lattice),
            _ => None,
        });
    let Some(lattice) = lattices.next() else {
        return Ok(None);
    };
    if lattices.next().is_some() {
        return Err(FmdlError::ConflictingBoundingBoxes(scene.object(object).name.clone()));
    }
    Ok(Some(BoundingBox::from_host(lattice.min, lattice.max)))
}

/// Export a scene into an FMDL document
///
/// The document is fully built, extension encoded and validated; capacity
/// violations of all meshes are reported together.
pub fn export_fmdl(
    scene: &Scene,
    settings: &ExportSettings,
    ctx: &ConversionContext,
) -> Result<FmdlDocument> {
    scene.validate()?;
    let (mesh_objects, root) = list_mesh_objects(scene, settings.root_object.as_deref());
    info!("Exporting {} mesh objects", mesh_objects.len());

    let mut doc = FmdlDocument::new();
    let material_ids = export_materials(scene, &mesh_objects, &mut doc)?;

    let (bones, bones_by_name) = build_bones(&referenced_bones(scene, &mesh_objects), ctx.skeleton);
    doc.bones = bones;
    info!("Exported {} bones", doc.bones.len());

    let mut exported: Vec<(ObjectId, MeshId)> = Vec::with_capacity(mesh_objects.len());
    let mut custom_boxes: HashMap<MeshId, BoundingBox> = HashMap::new();
    for &object in &mesh_objects {
        let name = &scene.object(object).name;
        let Some(authoring) = scene.mesh(object) else {
            continue;
        };
        let material_name = mesh_material(scene, object)?;
        let (Some(&material_id), Some(material_index)) = (
            material_ids.get(material_name),
            scene.find_material(material_name),
        ) else {
            return Err(FmdlError::UnknownMaterial {
                mesh: name.clone(),
                material: material_name.to_string(),
            });
        };

        let mut mesh = export_mesh(
            name,
            authoring,
            &scene.materials[material_index],
            material_id,
            &bones_by_name,
            &ctx.weld,
        )?;
        let custom = custom_bounding_box(scene, object)?;
        if custom.is_some() {
            mesh.add_extension_header(EXT_CUSTOM_BOUNDING_BOX);
        }

        let id = doc.add_mesh(mesh);
        if let Some(bbox) = custom {
            custom_boxes.insert(id, bbox);
        }
        exported.push((object, id));
    }

    export_mesh_groups(scene, &exported, root, &mut doc);
    let remap = sort_meshes_by_group(&mut doc);
    let custom_boxes: HashMap<MeshId, BoundingBox> = custom_boxes
        .into_iter()
        .map(|(id, bbox)| (remap[id.0], bbox))
        .collect();
    compute_bounding_boxes(&mut doc, &custom_boxes);

    let doc = ctx.codecs.encode(doc, &settings.extensions)?;
    validate(&doc)?;

    info!(
        "Exported {} meshes in {} mesh groups",
        doc.meshes.len(),
        doc.mesh_groups.len()
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AuthoringMesh, Lattice, Material, UvLayer};
    use crate::skeleton::SkeletonTable;
    use glam::{Vec2, Vec3};

    fn triangle(material: Option<&str>) -> ObjectKind {
        ObjectKind::Mesh(AuthoringMesh {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            polygons: vec![vec![0, 1, 2]],
            normals: vec![Vec3::Z; 3],
            tangents: vec![Vec3::X; 3],
            uv_layers: vec![UvLayer {
                name: "UVMap".to_string(),
                uvs: vec![Vec2::ZERO, Vec2::X, Vec2::Y],
            }],
            materials: material.map(|m| vec![Some(m.to_string())]).unwrap_or_default(),
            ..Default::default()
        })
    }

    fn scene_with_material() -> Scene {
        let mut scene = Scene::new();
        scene.add_material(Material {
            name: "mat".to_string(),
            ..Default::default()
        });
        scene
    }

    #[test]
    fn test_list_without_root_uses_armature_parent() {
        let mut scene = scene_with_material();
        let top = scene.add_object("Model", None, ObjectKind::empty());
        scene.add_object("Skeleton", Some(top), ObjectKind::Armature(Default::default()));
        let b = scene.add_object("b", Some(top), triangle(Some("mat")));
        let a = scene.add_object("a", Some(top), triangle(Some("mat")));
        let loose = scene.add_object("loose", None, triangle(Some("mat")));
        scene.add_object("empty mesh", None, ObjectKind::Mesh(AuthoringMesh::default()));

        let (meshes, root) = list_mesh_objects(&scene, None);
        assert_eq!(meshes, vec![a, b, loose]);
        assert_eq!(root, Some(top));
    }

    #[test]
    fn test_list_mesh_root_uses_its_parent() {
        let mut scene = scene_with_material();
        let top = scene.add_object("Model", None, ObjectKind::empty());
        let body = scene.add_object("Body", Some(top), triangle(Some("mat")));
        let child = scene.add_object("Child", Some(body), triangle(Some("mat")));
        let (meshes, root) = list_mesh_objects(&scene, Some("Body"));
        assert_eq!(meshes, vec![body, child]);
        assert_eq!(root, Some(top));
    }

    #[test]
    fn test_list_unknown_root_exports_everything() {
        let mut scene = scene_with_material();
        let a = scene.add_object("a", None, triangle(Some("mat")));
        let (meshes, root) = list_mesh_objects(&scene, Some("missing"));
        assert_eq!(meshes, vec![a]);
        assert_eq!(root, None);
    }

    #[test]
    fn test_missing_and_multiple_materials() {
        let skeleton = SkeletonTable::new();
        let ctx = ConversionContext::new(&skeleton);

        let mut scene = scene_with_material();
        scene.add_object("bare", None, triangle(None));
        let err = export_fmdl(&scene, &ExportSettings::default(), &ctx).unwrap_err();
        assert_eq!(err.to_string(), "Mesh 'bare' does not have an associated material.");

        let mut scene = scene_with_material();
        scene.add_material(Material {
            name: "other".to_string(),
            ..Default::default()
        });
        let mut kind = triangle(Some("mat"));
        if let ObjectKind::Mesh(mesh) = &mut kind {
            mesh.materials.push(Some("other".to_string()));
        }
        scene.add_object("double", None, kind);
        let err = export_fmdl(&scene, &ExportSettings::default(), &ctx).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mesh 'double' has multiple associated materials, including 'mat' and 'other'."
        );
    }

    #[test]
    fn test_broken_parent_links_rejected() {
        let skeleton = SkeletonTable::new();
        let ctx = ConversionContext::new(&skeleton);

        let mut scene = scene_with_material();
        let a = scene.add_object("A", None, triangle(Some("mat")));
        let b = scene.add_object("B", Some(a), ObjectKind::empty());
        scene.set_parent(a, Some(b));
        let settings = ExportSettings {
            root_object: Some("A".to_string()),
            ..Default::default()
        };
        let err = export_fmdl(&scene, &settings, &ctx).unwrap_err();
        assert!(matches!(err, FmdlError::ParentCycle(_)));

        let mut scene = scene_with_material();
        scene.add_object("A", Some(ObjectId(7)), triangle(Some("mat")));
        let err = export_fmdl(&scene, &ExportSettings::default(), &ctx).unwrap_err();
        assert!(matches!(err, FmdlError::DanglingParent { parent: 7, .. }));
    }

    #[test]
    fn test_custom_bounding_box() {
        let skeleton = SkeletonTable::new();
        let ctx = ConversionContext::new(&skeleton);
        let mut scene = scene_with_material();
        let mesh = scene.add_object("Body", None, triangle(Some("mat")));
        let lattice = Lattice {
            min: Vec3::new(-1.0, -2.0, 0.0),
            max: Vec3::new(1.0, 2.0, 3.0),
        };
        scene.add_object("box", Some(mesh), ObjectKind::Lattice(lattice));

        let doc = export_fmdl(&scene, &ExportSettings::default(), &ctx).unwrap();
        assert!(doc.meshes[0].has_extension_header(EXT_CUSTOM_BOUNDING_BOX));
        assert_eq!(
            doc.mesh_groups[0].bounding_box,
            BoundingBox::from_host(lattice.min, lattice.max)
        );

        scene.add_object("box", Some(mesh), ObjectKind::Lattice(lattice));
        let err = export_fmdl(&scene, &ExportSettings::default(), &ctx).unwrap_err();
        assert!(matches!(err, FmdlError::ConflictingBoundingBoxes(_)));
    }
}
