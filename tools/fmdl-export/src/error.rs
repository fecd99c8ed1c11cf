//! Conversion errors

use fmdl_common::DocumentError;

/// Failure of an export or import call
///
/// Authoring mistakes name the offending mesh so they can be shown to the
/// user as-is. Capacity violations are collected into a single
/// [`FmdlError::Validation`].
#[derive(Debug, thiserror::Error)]
pub enum FmdlError {
    #[error("Mesh '{mesh}' has {count} UV maps, but at most 2 are supported.")]
    TooManyUvChannels { mesh: String, count: usize },

    #[error("Mesh '{mesh}' declares {count} UV channels; no support for more than 2 UV maps.")]
    UnsupportedUvCount { mesh: String, count: u8 },

    #[error("Mesh '{0}' has more than one color layer.")]
    MultipleColorLayers(String),

    #[error("Mesh '{0}' does not have an associated material.")]
    MissingMaterial(String),

    #[error("Mesh '{mesh}' has multiple associated materials, including '{first}' and '{second}'.")]
    MultipleMaterials {
        mesh: String,
        first: String,
        second: String,
    },

    #[error("Mesh '{0}' does not have a UV map.")]
    MissingUvMap(String),

    #[error("Mesh '{mesh}' has ambiguous UV maps: {reason}.")]
    AmbiguousUvMaps { mesh: String, reason: String },

    #[error("Mesh '{0}' has multiple conflicting custom bounding boxes.")]
    ConflictingBoundingBoxes(String),

    #[error("Mesh '{mesh}' uses unknown material '{material}'.")]
    UnknownMaterial { mesh: String, material: String },

    #[error("Material '{material}' references unknown image '{image}'.")]
    UnknownImage { material: String, image: String },

    #[error("Mesh '{mesh}' is malformed: {reason}.")]
    InvalidMesh { mesh: String, reason: String },

    #[error("{}", .0.join("\n"))]
    Validation(Vec<String>),

    #[error("Object '{object}' has a parent ({parent}) that is not in the scene.")]
    DanglingParent { object: String, parent: usize },

    #[error("Object '{0}' is its own ancestor.")]
    ParentCycle(String),

    #[error("{codec} codec failed: {message}")]
    Codec { codec: String, message: String },

    #[error("Invalid FMDL document: {0}")]
    InvalidDocument(#[from] DocumentError),
}

impl FmdlError {
    /// Human-readable messages carried by this error
    pub fn messages(&self) -> Vec<String> {
        match self {
            FmdlError::Validation(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

pub type Result<T> = std::result::Result<T, FmdlError>;
