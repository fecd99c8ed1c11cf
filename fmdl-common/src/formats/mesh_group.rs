//! Mesh group hierarchy

use serde::{Deserialize, Serialize};

use super::document::{MeshGroupId, MeshId};
use crate::math::BoundingBox;

/// Node of the mesh group forest
///
/// A group usually holds either meshes or subgroups, but both are allowed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshGroup {
    pub name: String,
    pub parent: Option<MeshGroupId>,
    pub children: Vec<MeshGroupId>,
    pub meshes: Vec<MeshId>,
    pub bounding_box: BoundingBox,
    pub visible: bool,
}

impl MeshGroup {
    pub fn new(name: &str, parent: Option<MeshGroupId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            meshes: Vec::new(),
            bounding_box: BoundingBox::DEGENERATE,
            visible: true,
        }
    }

    /// Neither meshes nor subgroups
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.meshes.is_empty()
    }
}
