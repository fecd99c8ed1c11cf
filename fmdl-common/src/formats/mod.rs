//! FMDL document model
//!
//! Plain data mirroring what the binary serializer reads and writes.
//! Cross references (bone parents, bone groups, materials, textures, mesh
//! groups) are typed indices into the owning [`FmdlDocument`] arrays, so the
//! model is an acyclic arena rather than a pointer graph.

pub mod document;
pub mod material;
pub mod mesh;
pub mod mesh_group;
pub mod skeleton;

pub use document::*;
pub use material::*;
pub use mesh::*;
pub use mesh_group::*;
pub use skeleton::*;
