//! Skeleton knowledge base and bone tree construction
//!
//! Meshes only carry bone names (their vertex groups). Parents and bind
//! positions come from a [`SkeletonKnowledgeBase`] describing the canonical
//! skeleton. Bone positions in the knowledge base are in format space.

use anyhow::{Context, Result};
use fmdl_common::{format_to_host, Bone, BoneId, FmdlDocument};
use glam::Vec3;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::scene::{Armature, ArmatureBone};

/// Squared distance below which two bone positions coincide
const BONE_DISTANCE_EPSILON_SQUARED: f32 = 1.0e-10;

/// Offset applied to the tail of a zero-length bone
const DEGENERATE_BONE_OFFSET: f32 = 1.0e-5;

/// Canonical data for one bone
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KnownBone {
    #[serde(default)]
    pub parent: Option<String>,
    pub start: Vec3,
    pub end: Vec3,
    /// Skeleton versions and body parts this bone belongs to
    #[serde(default)]
    pub membership: Vec<Membership>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub version: String,
    pub body_part: String,
}

/// Read-only source of canonical bone data
pub trait SkeletonKnowledgeBase {
    fn lookup(&self, name: &str) -> Option<&KnownBone>;

    /// Every bone name known, in no particular order
    fn bone_names(&self) -> Vec<&str>;
}

/// Knowledge base backed by a TOML table
///
/// ```toml
/// [bones.sk_chest]
/// parent = "sk_belly"
/// start = [0.0, 1.2, 0.0]
/// end = [0.0, 1.4, 0.0]
/// membership = [{ version = "2016", body_part = "body" }]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonTable {
    #[serde(default)]
    pub bones: HashMap<String, KnownBone>,
}

impl SkeletonTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a skeleton table from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read skeleton table: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse a skeleton table from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse skeleton table")
    }

    pub fn insert(&mut self, name: &str, bone: KnownBone) {
        self.bones.insert(name.to_string(), bone);
    }
}

impl SkeletonKnowledgeBase for SkeletonTable {
    fn lookup(&self, name: &str) -> Option<&KnownBone> {
        self.bones.get(name)
    }

    fn bone_names(&self) -> Vec<&str> {
        self.bones.keys().map(String::as_str).collect()
    }
}

/// Nearest knowledge-base ancestor of `name` that is in `present`
///
/// Unknown bones and bones whose whole ancestry is absent have no parent.
pub fn resolve_parent(
    name: &str,
    present: &HashSet<&str>,
    kb: &dyn SkeletonKnowledgeBase,
) -> Option<String> {
    let mut parent = kb.lookup(name)?.parent.clone();
    let limit = present.len() + kb.bone_names().len();
    let mut steps = 0;
    while let Some(candidate) = parent {
        if present.contains(candidate.as_str()) {
            return Some(candidate);
        }
        steps += 1;
        if steps > limit {
            warn!("Skeleton knowledge base has a parent cycle at '{}'", candidate);
            return None;
        }
        parent = kb.lookup(&candidate).and_then(|b| b.parent.clone());
    }
    None
}

/// Whether `child` attaches seamlessly to `parent`
///
/// Only holds when `parent` is the child's direct knowledge-base parent
/// and the parent's end meets the child's start.
pub fn is_connected(child: &str, parent: &str, kb: &dyn SkeletonKnowledgeBase) -> bool {
    let (Some(child_bone), Some(parent_bone)) = (kb.lookup(child), kb.lookup(parent)) else {
        return false;
    };
    child_bone.parent.as_deref() == Some(parent)
        && parent_bone.end.distance_squared(child_bone.start) < BONE_DISTANCE_EPSILON_SQUARED
}

/// Build the document bones for a set of referenced bone names
///
/// Bones are emitted parents first; otherwise in first-reference order.
/// Returns the bones and a name lookup table.
pub fn build_bones(
    referenced: &[String],
    kb: &dyn SkeletonKnowledgeBase,
) -> (Vec<Bone>, HashMap<String, BoneId>) {
    let present: HashSet<&str> = referenced.iter().map(String::as_str).collect();
    let parents: HashMap<&str, Option<String>> = referenced
        .iter()
        .map(|name| (name.as_str(), resolve_parent(name, &present, kb)))
        .collect();

    let mut bones = Vec::with_capacity(referenced.len());
    let mut ids: HashMap<String, BoneId> = HashMap::new();

    for name in referenced {
        // Collect the chain of unbuilt ancestors, then build it top-down
        let mut chain: Vec<&str> = Vec::new();
        let mut current = Some(name.as_str());
        while let Some(bone) = current {
            if ids.contains_key(bone) || chain.contains(&bone) {
                break;
            }
            chain.push(bone);
            current = parents.get(bone).and_then(|p| p.as_deref());
        }

        for &bone in chain.iter().rev() {
            let parent = parents
                .get(bone)
                .and_then(|p| p.as_deref())
                .and_then(|p| ids.get(p).copied());
            let mut fmdl_bone = Bone::new(bone, parent);
            match kb.lookup(bone) {
                Some(known) => fmdl_bone.global_position = known.start.extend(1.0),
                None => debug!("Bone '{}' is not in the skeleton knowledge base", bone),
            }
            ids.insert(bone.to_string(), BoneId(bones.len()));
            bones.push(fmdl_bone);
        }
    }

    (bones, ids)
}

/// Build a host armature for the bones of a document
///
/// Known bones take their head and tail from the knowledge base and their
/// parent from the knowledge base hierarchy. Unknown bones keep the
/// document parent and use their stored positions.
pub fn build_armature(doc: &FmdlDocument, kb: &dyn SkeletonKnowledgeBase) -> Armature {
    let present: HashSet<&str> = doc.bones.iter().map(|b| b.name.as_str()).collect();

    let parents: Vec<Option<BoneId>> = doc
        .bones
        .iter()
        .map(|bone| match kb.lookup(&bone.name) {
            Some(_) => resolve_parent(&bone.name, &present, kb).and_then(|p| doc.find_bone(&p)),
            None => bone.parent,
        })
        .collect();

    let mut armature = Armature::default();
    let mut built: HashMap<BoneId, usize> = HashMap::new();

    for id in doc.bone_ids() {
        let mut chain: Vec<BoneId> = Vec::new();
        let mut current = Some(id);
        while let Some(bone) = current {
            if built.contains_key(&bone) || chain.contains(&bone) {
                break;
            }
            chain.push(bone);
            current = parents[bone.0];
        }

        for &bone_id in chain.iter().rev() {
            let bone = doc.bone(bone_id);
            let parent_index = parents[bone_id.0].and_then(|p| built.get(&p).copied());

            let (head, mut tail, connected) = match kb.lookup(&bone.name) {
                Some(known) => {
                    let connected = parents[bone_id.0]
                        .map(|p| is_connected(&bone.name, &doc.bone(p).name, kb))
                        .unwrap_or(false);
                    (format_to_host(known.start), format_to_host(known.end), connected)
                }
                None => (
                    format_to_host(bone.local_position.truncate()),
                    format_to_host(bone.global_position.truncate()),
                    false,
                ),
            };

            if head.distance_squared(tail) < BONE_DISTANCE_EPSILON_SQUARED {
                warn!("Bone '{}' has zero length, offsetting its tail", bone.name);
                tail = head - Vec3::new(0.0, 0.0, DEGENERATE_BONE_OFFSET);
            }

            built.insert(bone_id, armature.bones.len());
            armature.bones.push(ArmatureBone {
                name: bone.name.clone(),
                head,
                tail,
                parent: parent_index,
                connected: connected && parent_index.is_some(),
            });
        }
    }

    armature
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(parent: Option<&str>, start: Vec3, end: Vec3) -> KnownBone {
        KnownBone {
            parent: parent.map(str::to_string),
            start,
            end,
            membership: Vec::new(),
        }
    }

    /// A -> B -> C with every end meeting the next start
    fn chain_table() -> SkeletonTable {
        let mut kb = SkeletonTable::new();
        kb.insert("A", known(None, Vec3::ZERO, Vec3::Y));
        kb.insert("B", known(Some("A"), Vec3::Y, Vec3::Y));
        kb.insert("C", known(Some("B"), Vec3::Y, Vec3::Y * 2.0));
        kb
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_skip_ancestor_parent() {
        let kb = chain_table();
        let (bones, ids) = build_bones(&names(&["C", "A"]), &kb);
        let a = ids["A"];
        let c = ids["C"];
        assert_eq!(bones[c.0].parent, Some(a));
        assert!(a.0 < c.0, "parents are emitted first");
        // A's end meets C's start, but A is not C's direct parent
        assert!(!is_connected("C", "A", &kb));
    }

    #[test]
    fn test_direct_parent_connected() {
        let kb = chain_table();
        assert!(is_connected("B", "A", &kb));
        assert!(is_connected("C", "B", &kb));
    }

    #[test]
    fn test_unknown_bone_is_root_at_origin() {
        let kb = chain_table();
        let (bones, ids) = build_bones(&names(&["mystery", "B"]), &kb);
        let mystery = &bones[ids["mystery"].0];
        assert_eq!(mystery.parent, None);
        assert_eq!(mystery.global_position, glam::Vec4::new(0.0, 0.0, 0.0, 1.0));
        // B's parent A is not referenced, so B is a root too
        assert_eq!(bones[ids["B"].0].parent, None);
        assert_eq!(bones[ids["B"].0].global_position, Vec3::Y.extend(1.0));
    }

    #[test]
    fn test_bones_in_first_reference_order() {
        let kb = SkeletonTable::new();
        let (bones, _) = build_bones(&names(&["x", "y", "z"]), &kb);
        let order: Vec<&str> = bones.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_knowledge_base_cycle_terminates() {
        let mut kb = SkeletonTable::new();
        kb.insert("P", known(Some("Q"), Vec3::ZERO, Vec3::X));
        kb.insert("Q", known(Some("P"), Vec3::ZERO, Vec3::X));
        let present: HashSet<&str> = ["R"].into_iter().collect();
        assert_eq!(resolve_parent("P", &present, &kb), None);
    }

    #[test]
    fn test_armature_skip_ancestor_not_connected() {
        let kb = chain_table();
        let (bones, _) = build_bones(&names(&["A", "C"]), &kb);
        let doc = FmdlDocument {
            bones,
            ..Default::default()
        };
        let armature = build_armature(&doc, &kb);
        let a = armature.find("A").unwrap();
        let c = armature.find("C").unwrap();
        assert_eq!(armature.bones[c].parent, Some(a));
        assert!(!armature.bones[c].connected);
    }

    #[test]
    fn test_armature_degenerate_bone_gets_tail() {
        let kb = chain_table();
        let (bones, _) = build_bones(&names(&["B", "unknown"]), &kb);
        let doc = FmdlDocument {
            bones,
            ..Default::default()
        };
        let armature = build_armature(&doc, &kb);
        for bone in &armature.bones {
            assert!(bone.head.distance_squared(bone.tail) > 0.0, "{}", bone.name);
        }
        let b = &armature.bones[armature.find("B").unwrap()];
        assert_eq!(b.tail, b.head - Vec3::new(0.0, 0.0, DEGENERATE_BONE_OFFSET));
    }

    #[test]
    fn test_parse_table() {
        let kb = SkeletonTable::parse(
            r#"
[bones.sk_belly]
start = [0.0, 1.0, 0.0]
end = [0.0, 1.2, 0.0]

[bones.sk_chest]
parent = "sk_belly"
start = [0.0, 1.2, 0.0]
end = [0.0, 1.4, 0.0]
membership = [{ version = "2016", body_part = "body" }]
"#,
        )
        .unwrap();
        let chest = kb.lookup("sk_chest").unwrap();
        assert_eq!(chest.parent.as_deref(), Some("sk_belly"));
        assert_eq!(chest.membership[0].body_part, "body");
        assert!(is_connected("sk_chest", "sk_belly", &kb));
    }
}
