//! Mesh conversion (authoring corners <-> welded .fmdl vertices)

mod convert;
mod expand;
mod tangent;
mod types;
mod uv_layers;
mod weld;

// Re-export public API
pub use convert::{export_mesh, triangulate_layers};
pub use expand::{expand_mesh, COLOR_LAYER_NAME};
pub use tangent::{average_tangent, fallback_tangent};
pub use types::{Loop, LoopLayers, SlotWeights, WeldedGeometry};
pub use uv_layers::{resolve_uv_layers, UvSelection, UV_MAP_COLOR, UV_MAP_NORMALS};
pub use weld::weld_loops;
