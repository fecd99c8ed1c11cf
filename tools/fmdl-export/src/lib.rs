//! fmdl-export library
//!
//! Converts host scenes into FMDL documents and back: welds per-corner
//! authoring data into shared vertices, builds the skeleton, mesh-group tree
//! and bounding boxes, and validates the result against the format limits.

pub mod bounds;
pub mod context;
pub mod error;
pub mod export;
pub mod extensions;
pub mod import;
pub mod io;
pub mod material;
pub mod mesh;
pub mod mesh_group;
pub mod scene;
pub mod settings;
pub mod skeleton;
pub mod summary;
pub mod validation;

// Re-export the document model from fmdl-common
pub use fmdl_common::{BoundingBox, FmdlDocument, MAX_BONE_GROUP_BONES, MAX_FACES, MAX_VERTICES};

// Re-export key types for conversion
pub use context::ConversionContext;
pub use error::{FmdlError, Result};
pub use export::export_fmdl;
pub use extensions::{DocumentCodec, ExtensionCodecs, Passthrough};
pub use import::import_fmdl;
pub use scene::{ChangeTracker, ObjectId, ObjectKind, Scene};
pub use settings::{BoundingBoxMode, ExportSettings, FmdlConfig, ImportSettings, WeldPolicy};
pub use skeleton::{SkeletonKnowledgeBase, SkeletonTable};
pub use summary::export_summary;
