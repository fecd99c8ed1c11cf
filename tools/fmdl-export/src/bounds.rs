//! Bounding box aggregation for bones, meshes and mesh groups

use fmdl_common::{BoundingBox, FmdlDocument, Mesh, MeshGroupId, MeshId};
use glam::Vec3;
use hashbrown::HashMap;
use tracing::debug;

/// Set every bone's box to the extent of the vertices it influences
///
/// Only meshes declaring bone mappings contribute. Bones influencing no
/// vertex get [`BoundingBox::DEGENERATE`].
pub fn compute_bone_bounding_boxes(doc: &mut FmdlDocument) {
    let mut positions: Vec<Vec<Vec3>> = vec![Vec::new(); doc.bones.len()];
    for mesh in doc.meshes.iter().filter(|m| m.vertex_fields.has_bone_mapping) {
        for vertex in &mesh.vertices {
            for (bone, _) in &vertex.bone_mapping {
                if let Some(list) = positions.get_mut(bone.0) {
                    list.push(vertex.position);
                }
            }
        }
    }

    for (bone, points) in doc.bones.iter_mut().zip(positions) {
        bone.bounding_box = BoundingBox::from_points(points).unwrap_or(BoundingBox::DEGENERATE);
    }
}

/// The custom box if one was given, else the extent of the vertices
pub fn mesh_bounding_box(mesh: &Mesh, custom: Option<&BoundingBox>) -> BoundingBox {
    match custom {
        Some(bbox) => *bbox,
        None => BoundingBox::from_points(mesh.positions()).unwrap_or(BoundingBox::DEGENERATE),
    }
}

/// Set every mesh group's box to the union of its meshes and subgroups
///
/// Computed post-order without recursion. Groups with no geometry below
/// them get [`BoundingBox::DEGENERATE`], which still takes part in the
/// parent's union.
pub fn compute_mesh_group_bounding_boxes(
    doc: &mut FmdlDocument,
    custom: &HashMap<MeshId, BoundingBox>,
) {
    let mut computed: Vec<Option<BoundingBox>> = vec![None; doc.mesh_groups.len()];

    for root in doc.root_mesh_groups() {
        let mut stack: Vec<(MeshGroupId, bool)> = vec![(root, false)];
        while let Some((id, children_done)) = stack.pop() {
            let group = doc.mesh_group(id);
            if !children_done {
                stack.push((id, true));
                for &child in group.children.iter().rev() {
                    if computed[child.0].is_none() {
                        stack.push((child, false));
                    }
                }
                continue;
            }

            let mesh_boxes = group
                .meshes
                .iter()
                .map(|&m| mesh_bounding_box(doc.mesh(m), custom.get(&m)));
            let child_boxes = group
                .children
                .iter()
                .map(|c| computed[c.0].unwrap_or(BoundingBox::DEGENERATE));
            let bbox = BoundingBox::union_all(mesh_boxes.chain(child_boxes))
                .unwrap_or(BoundingBox::DEGENERATE);
            debug!("Mesh group '{}' bounding box {:?}", group.name, bbox);
            computed[id.0] = Some(bbox);
        }
    }

    for (group, bbox) in doc.mesh_groups.iter_mut().zip(computed) {
        group.bounding_box = bbox.unwrap_or(BoundingBox::DEGENERATE);
    }
}

/// Bone boxes, then mesh group boxes
pub fn compute_bounding_boxes(doc: &mut FmdlDocument, custom: &HashMap<MeshId, BoundingBox>) {
    compute_bone_bounding_boxes(doc);
    compute_mesh_group_bounding_boxes(doc, custom);
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmdl_common::{Bone, BoneId, Face, Vertex, VertexFields};

    fn mesh_at(points: &[Vec3], bone: Option<BoneId>) -> Mesh {
        Mesh {
            vertices: points
                .iter()
                .map(|&position| Vertex {
                    position,
                    bone_mapping: bone.map(|b| vec![(b, 1.0)]).unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            faces: vec![Face::new(0, 1, 2)],
            bone_group: bone.into_iter().collect(),
            vertex_fields: VertexFields {
                has_bone_mapping: bone.is_some(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_bone_boxes() {
        let mut doc = FmdlDocument::new();
        let root = doc.add_bone(Bone::new("sk_root", None));
        doc.add_bone(Bone::new("sk_unused", Some(root)));
        doc.add_mesh(mesh_at(
            &[Vec3::ONE, Vec3::new(2.0, -1.0, 0.5), Vec3::ZERO],
            Some(root),
        ));
        compute_bone_bounding_boxes(&mut doc);
        assert_eq!(
            doc.bones[0].bounding_box,
            BoundingBox::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(2.0, 1.0, 1.0))
        );
        assert!(doc.bones[1].bounding_box.is_degenerate());
    }

    #[test]
    fn test_bone_boxes_ignore_meshes_without_mapping() {
        let mut doc = FmdlDocument::new();
        let root = doc.add_bone(Bone::new("sk_root", None));
        let mut mesh = mesh_at(&[Vec3::ONE, Vec3::ONE, Vec3::ONE], Some(root));
        mesh.vertex_fields.has_bone_mapping = false;
        doc.add_mesh(mesh);
        compute_bone_bounding_boxes(&mut doc);
        assert!(doc.bones[0].bounding_box.is_degenerate());
    }

    #[test]
    fn test_custom_box_overrides_vertices() {
        let mesh = mesh_at(&[Vec3::ZERO, Vec3::ONE, Vec3::X], None);
        let custom = BoundingBox::new(Vec3::splat(-5.0), Vec3::splat(5.0));
        assert_eq!(mesh_bounding_box(&mesh, Some(&custom)), custom);
        assert_eq!(
            mesh_bounding_box(&mesh, None),
            BoundingBox::new(Vec3::ZERO, Vec3::ONE)
        );
    }

    #[test]
    fn test_group_boxes_post_order() {
        let mut doc = FmdlDocument::new();
        let a = doc.add_mesh(mesh_at(&[Vec3::ONE, Vec3::splat(2.0), Vec3::ONE], None));
        let b = doc.add_mesh(mesh_at(&[Vec3::splat(-3.0), Vec3::splat(-2.0), Vec3::splat(-2.0)], None));
        let root = doc.add_mesh_group("root", None);
        let left = doc.add_mesh_group("left", Some(root));
        let right = doc.add_mesh_group("right", Some(root));
        let deep = doc.add_mesh_group("deep", Some(right));
        doc.mesh_groups[left.0].meshes.push(a);
        doc.mesh_groups[deep.0].meshes.push(b);

        compute_mesh_group_bounding_boxes(&mut doc, &HashMap::new());

        assert_eq!(
            doc.mesh_group(deep).bounding_box,
            BoundingBox::new(Vec3::splat(-3.0), Vec3::splat(-2.0))
        );
        assert_eq!(doc.mesh_group(right).bounding_box, doc.mesh_group(deep).bounding_box);
        assert_eq!(
            doc.mesh_group(root).bounding_box,
            BoundingBox::new(Vec3::splat(-3.0), Vec3::splat(2.0))
        );
        for id in doc.mesh_group_ids() {
            let group = doc.mesh_group(id);
            for &child in &group.children {
                assert!(group.bounding_box.contains(&doc.mesh_group(child).bounding_box));
            }
        }
    }

    #[test]
    fn test_empty_group_is_degenerate() {
        let mut doc = FmdlDocument::new();
        let root = doc.add_mesh_group("root", None);
        let empty = doc.add_mesh_group("empty", Some(root));
        let m = doc.add_mesh(mesh_at(&[Vec3::ONE, Vec3::splat(2.0), Vec3::ONE], None));
        doc.mesh_groups[root.0].meshes.push(m);

        compute_mesh_group_bounding_boxes(&mut doc, &HashMap::new());

        assert!(doc.mesh_group(empty).bounding_box.is_degenerate());
        // The degenerate child still counts, so the root covers the origin
        let bbox = doc.mesh_group(root).bounding_box;
        assert!(bbox.contains(&BoundingBox::DEGENERATE));
        assert!(bbox.contains(&BoundingBox::new(Vec3::ONE, Vec3::splat(2.0))));
    }

    #[test]
    fn test_custom_box_in_group() {
        let mut doc = FmdlDocument::new();
        let m = doc.add_mesh(mesh_at(&[Vec3::ZERO, Vec3::ONE, Vec3::X], None));
        let group = doc.add_mesh_group("g", None);
        doc.mesh_groups[group.0].meshes.push(m);
        let custom = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(4.0));
        let mut boxes = HashMap::new();
        boxes.insert(m, custom);
        compute_bounding_boxes(&mut doc, &boxes);
        assert_eq!(doc.mesh_group(group).bounding_box, custom);
    }
}
