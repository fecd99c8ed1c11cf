//! Human-readable export summary

use fmdl_common::{MAX_BONE_GROUP_BONES, MAX_FACES, MAX_VERTICES};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use tracing::warn;

use crate::scene::{simplify_name, Material, ObjectId, ObjectKind, Scene};
use crate::skeleton::SkeletonKnowledgeBase;

/// Unknown bones listed per line
const UNKNOWN_BONES_PER_LINE: usize = 6;

fn splitting_summary(vertices: usize, faces: usize, bones: usize) -> String {
    let mut output = String::new();
    if vertices > MAX_VERTICES {
        let _ = writeln!(output, "\t\tvertices > {}", MAX_VERTICES);
    }
    if faces > MAX_FACES {
        let _ = writeln!(output, "\t\tfaces > {}", MAX_FACES);
    }
    if bones > MAX_BONE_GROUP_BONES {
        let _ = writeln!(output, "\t\tbones > {}", MAX_BONE_GROUP_BONES);
    }
    if !output.is_empty() {
        output.insert_str(0, "\tMesh will be split to fit within fmdl limitations:\n");
    }
    output
}

fn material_summary(scene: &Scene, material: &Material) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "\tMaterial [{}]:", simplify_name(&material.name));
    let _ = writeln!(output, "\t\tshader \"{}\"", material.shader);
    let _ = writeln!(output, "\t\ttechnique \"{}\"", material.technique);
    let _ = writeln!(
        output,
        "\t\tantiblur measures: {}",
        if material.antiblur { "yes" } else { "no" }
    );
    let _ = writeln!(output, "\t\talpha flags {}", material.alpha_flags);
    let _ = writeln!(output, "\t\tshadow flags {}", material.shadow_flags);
    for parameter in &material.parameters {
        let [a, b, c, d] = parameter.values;
        let _ = writeln!(
            output,
            "\t\tparameter [{}] = [{:.2}, {:.2}, {:.2}, {:.2}]",
            parameter.name, a, b, c, d
        );
    }
    for texture in &material.textures {
        let (directory, filename) = match scene.find_image(&texture.image) {
            Some(index) => (
                scene.images[index].directory.as_str(),
                scene.images[index].filename.as_str(),
            ),
            None => ("", texture.image.as_str()),
        };
        let _ = writeln!(output, "\t\ttexture [{}] = ", texture.role);
        let _ = writeln!(output, "\t\t\t\"{}\"", directory);
        let _ = writeln!(output, "\t\t\t\t\"{}\"", filename);
    }
    output
}

/// Report which skeleton body parts and versions the bones need
///
/// A bone is attributed to a body part that some other bone of the mesh
/// requires exclusively, else to the last body part (by name) containing
/// it. Each body part reports the highest minimum version among its bones.
fn skeleton_summary(bones: &[String], kb: &dyn SkeletonKnowledgeBase) -> String {
    let mut body_part_bones: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for name in kb.bone_names() {
        if let Some(known) = kb.lookup(name) {
            for membership in &known.membership {
                body_part_bones
                    .entry(membership.body_part.as_str())
                    .or_default()
                    .insert(name);
            }
        }
    }

    let exclusive = |body_part: &str, bone: &str| {
        body_part_bones
            .iter()
            .all(|(other, bones)| *other == body_part || !bones.contains(bone))
    };

    let mut sorted: Vec<&str> = bones.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let required: BTreeSet<&str> = body_part_bones
        .iter()
        .filter(|(part, members)| {
            sorted
                .iter()
                .any(|bone| members.contains(bone) && exclusive(part, bone))
        })
        .map(|(part, _)| *part)
        .collect();

    let mut versions: BTreeMap<&str, &str> = BTreeMap::new();
    let mut unknown: Vec<&str> = Vec::new();
    for &bone in &sorted {
        let in_part = |part: &&str| body_part_bones.get(*part).is_some_and(|b| b.contains(bone));
        let selected = required
            .iter()
            .find(|p| in_part(p))
            .or_else(|| body_part_bones.keys().rev().find(|p| in_part(p)))
            .copied();

        let Some(part) = selected else {
            unknown.push(bone);
            continue;
        };
        let minimum = kb
            .lookup(bone)
            .into_iter()
            .flat_map(|known| known.membership.iter())
            .filter(|m| m.body_part == part)
            .map(|m| m.version.as_str())
            .min();
        if let Some(minimum) = minimum {
            let version = versions.entry(part).or_insert(minimum);
            if *version < minimum {
                *version = minimum;
            }
        }
    }

    let mut output = String::new();
    match (versions.len(), unknown.is_empty()) {
        (0, true) => output.push_str("\tSkeleton: none\n"),
        (1, true) => {
            for (part, version) in &versions {
                let _ = writeln!(output, "\tSkeleton: {} {}", version, part);
            }
        }
        _ => {
            output.push_str("\tSkeleton:\n");
            for (part, version) in &versions {
                let _ = writeln!(output, "\t\tFound bones for {} {}", version, part);
            }
            if !unknown.is_empty() {
                output.push_str("\t\tFound unknown bones:\n");
                for chunk in unknown.chunks(UNKNOWN_BONES_PER_LINE) {
                    let quoted: Vec<String> = chunk.iter().map(|b| format!("\"{}\"", b)).collect();
                    let _ = writeln!(output, "\t\t\t{}", quoted.join(", "));
                }
            }
        }
    }
    output
}

fn mesh_summary(
    scene: &Scene,
    object: ObjectId,
    root: Option<ObjectId>,
    kb: &dyn SkeletonKnowledgeBase,
) -> String {
    let Some(mesh) = scene.mesh(object) else {
        return String::new();
    };
    let lattices = scene
        .children(object)
        .into_iter()
        .filter(|&c| matches!(scene.object(c).kind, ObjectKind::Lattice(_)))
        .count();

    let mut output = String::new();
    let _ = writeln!(output, "Mesh [{}]", scene.path_name(object, root));
    let _ = writeln!(output, "\tVertices: {}", mesh.positions.len());
    let _ = writeln!(output, "\tFaces: {}", mesh.polygons.len());
    let _ = writeln!(output, "\tBones: {}", mesh.vertex_groups.len());
    match mesh.color_layers.len() {
        0 => {}
        1 => output.push_str("\tMesh has vertex color information\n"),
        _ => output.push_str("\tMesh has inconsistent vertex color information\n"),
    }
    match lattices {
        0 => {}
        1 => output.push_str("\tMesh has custom bounding box\n"),
        _ => output.push_str("\tMesh has inconsistent bounding box\n"),
    }
    output.push_str(&splitting_summary(
        mesh.positions.len(),
        mesh.polygons.len(),
        mesh.vertex_groups.len(),
    ));

    match mesh.materials.as_slice() {
        [slot] => match slot.as_deref().and_then(|name| scene.find_material(name)) {
            Some(index) => output.push_str(&material_summary(scene, &scene.materials[index])),
            None => output.push_str("\tMaterial: none\n"),
        },
        [] => output.push_str("\tMaterial: none\n"),
        _ => output.push_str("\tMaterial: inconsistent\n"),
    }

    output.push_str(&skeleton_summary(&mesh.vertex_groups, kb));
    output
}

/// Summarize what an export of `root_name` (or the whole scene) contains
pub fn export_summary(scene: &Scene, root_name: Option<&str>, kb: &dyn SkeletonKnowledgeBase) -> String {
    if let Err(err) = scene.validate() {
        warn!("Cannot summarize scene: {}", err);
        return format!("Export summary\n------------------------------\n{}\n", err);
    }
    let root = root_name.and_then(|name| {
        let found = scene.find(name);
        if found.is_none() {
            warn!("Root object '{}' not found, summarizing the whole scene", name);
        }
        found
    });
    let has_geometry = |id: ObjectId| scene.mesh(id).is_some_and(|m| !m.polygons.is_empty());

    let mut output = String::new();
    let mut meshes: BTreeMap<String, ObjectId> = BTreeMap::new();
    match root {
        None => {
            output.push_str("Export summary\n");
            for id in scene.ids().filter(|&id| has_geometry(id)) {
                meshes.insert(scene.path_name(id, None), id);
            }
        }
        Some(root) => {
            let _ = writeln!(output, "Export summary for {}", scene.path_name(root, None));
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                if has_geometry(id) {
                    meshes.insert(scene.path_name(id, Some(root)), id);
                }
                stack.extend(scene.children(id));
            }
        }
    }
    output.push_str("------------------------------\n");

    for &id in meshes.values() {
        output.push_str(&mesh_summary(scene, id, root, kb));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{AuthoringMesh, ColorLayer, Image, MaterialParameter, MaterialTexture};
    use crate::skeleton::{KnownBone, Membership, SkeletonTable};
    use glam::Vec3;

    fn knowledge_base() -> SkeletonTable {
        let mut table = SkeletonTable::new();
        let mut add = |name: &str, memberships: &[(&str, &str)]| {
            table.insert(
                name,
                KnownBone {
                    parent: None,
                    start: Vec3::ZERO,
                    end: Vec3::Y,
                    membership: memberships
                        .iter()
                        .map(|(version, body_part)| Membership {
                            version: version.to_string(),
                            body_part: body_part.to_string(),
                        })
                        .collect(),
                },
            );
        };
        add("sk_head", &[("2016", "face"), ("2016", "body")]);
        add("sk_eye", &[("2018", "face")]);
        add("sk_chest", &[("2016", "body")]);
        add("sk_hand", &[("2016", "body"), ("2020", "body")]);
        table
    }

    fn bones(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_skeleton_none() {
        assert_eq!(skeleton_summary(&[], &knowledge_base()), "\tSkeleton: none\n");
    }

    #[test]
    fn test_skeleton_single_body_part() {
        let kb = knowledge_base();
        assert_eq!(
            skeleton_summary(&bones(&["sk_hand", "sk_chest"]), &kb),
            "\tSkeleton: 2016 body\n"
        );
        // sk_head is shared, sk_eye pins it to the face
        assert_eq!(
            skeleton_summary(&bones(&["sk_head", "sk_eye"]), &kb),
            "\tSkeleton: 2018 face\n"
        );
    }

    #[test]
    fn test_skeleton_unknown_bones_chunked() {
        let kb = knowledge_base();
        let names = bones(&["sk_chest", "a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(
            skeleton_summary(&names, &kb),
            "\tSkeleton:\n\
             \t\tFound bones for 2016 body\n\
             \t\tFound unknown bones:\n\
             \t\t\t\"a\", \"b\", \"c\", \"d\", \"e\", \"f\"\n\
             \t\t\t\"g\"\n"
        );
    }

    #[test]
    fn test_summary_of_cyclic_scene_reports_error() {
        let mut scene = Scene::new();
        let a = scene.add_object("A", None, ObjectKind::empty());
        let b = scene.add_object("B", Some(a), ObjectKind::empty());
        scene.set_parent(a, Some(b));
        assert_eq!(
            export_summary(&scene, None, &knowledge_base()),
            "Export summary\n------------------------------\nObject 'A' is its own ancestor.\n"
        );
    }

    #[test]
    fn test_splitting_summary() {
        assert_eq!(splitting_summary(10, 10, 10), "");
        assert_eq!(
            splitting_summary(70000, 10, 33),
            "\tMesh will be split to fit within fmdl limitations:\n\t\tvertices > 65535\n\t\tbones > 32\n"
        );
    }

    #[test]
    fn test_export_summary() {
        let mut scene = Scene::new();
        scene.images.push(Image {
            name: "tex".to_string(),
            filename: "body_alp.dds".to_string(),
            directory: "/Assets/tex".to_string(),
        });
        scene.add_material(Material {
            name: "skin.001".to_string(),
            shader: "fox3DDF_Skin".to_string(),
            technique: "fox3DDF_Skin".to_string(),
            parameters: vec![MaterialParameter {
                name: "MatParamIndex_0".to_string(),
                values: [0.0, 0.5, 1.0, 0.25],
            }],
            textures: vec![MaterialTexture {
                image: "tex".to_string(),
                role: "Base_Tex_SRGB".to_string(),
                uv_map: None,
            }],
            alpha_flags: 128,
            ..Default::default()
        });
        let root = scene.add_object("Model", None, ObjectKind::empty());
        let body = scene.add_object(
            "Body",
            Some(root),
            ObjectKind::Mesh(AuthoringMesh {
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                polygons: vec![vec![0, 1, 2]],
                color_layers: vec![ColorLayer {
                    name: "Col".to_string(),
                    colors: vec![[1.0; 4]; 3],
                }],
                vertex_groups: bones(&["sk_chest"]),
                materials: vec![Some("skin.001".to_string())],
                ..Default::default()
            }),
        );
        scene.add_object("Hidden", Some(body), ObjectKind::Mesh(AuthoringMesh::default()));

        let summary = export_summary(&scene, Some("Model"), &knowledge_base());
        assert_eq!(
            summary,
            "Export summary for Model\n\
             ------------------------------\n\
             Mesh [Body]\n\
             \tVertices: 3\n\
             \tFaces: 1\n\
             \tBones: 1\n\
             \tMesh has vertex color information\n\
             \tMaterial [skin]:\n\
             \t\tshader \"fox3DDF_Skin\"\n\
             \t\ttechnique \"fox3DDF_Skin\"\n\
             \t\tantiblur measures: no\n\
             \t\talpha flags 128\n\
             \t\tshadow flags 0\n\
             \t\tparameter [MatParamIndex_0] = [0.00, 0.50, 1.00, 0.25]\n\
             \t\ttexture [Base_Tex_SRGB] = \n\
             \t\t\t\"/Assets/tex\"\n\
             \t\t\t\t\"body_alp.dds\"\n\
             \tSkeleton: 2016 body\n"
        );

        let whole = export_summary(&scene, None, &knowledge_base());
        assert!(whole.starts_with("Export summary\n"));
        assert!(whole.contains("Mesh [Model/Body]\n"));
    }
}
