//! Skeleton bones
//!
//! Bones form a forest through their parent links. Positions are bind-pose
//! positions in format space with w = 1.0.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use super::document::BoneId;
use crate::math::BoundingBox;

/// Homogeneous origin used for bones without a known bind position
pub const ORIGIN: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    /// Unique within a document
    pub name: String,
    pub parent: Option<BoneId>,
    /// Head position of the bone
    pub global_position: Vec4,
    /// Tail position for known bones, zero for unknown ones
    pub local_position: Vec4,
    pub bounding_box: BoundingBox,
}

impl Bone {
    pub fn new(name: &str, parent: Option<BoneId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            global_position: ORIGIN,
            local_position: Vec4::ZERO,
            bounding_box: BoundingBox::DEGENERATE,
        }
    }
}
