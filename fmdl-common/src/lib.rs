//! Shared types for the FMDL exchange format
//!
//! Provides the in-memory document model handed to (and received from) the
//! binary serializer, plus the vector helpers and hard format limits used by
//! the conversion tooling.

pub mod formats;
pub mod math;

pub use formats::*;
pub use math::{
    flip_v, format_to_host, host_to_format, position_key, slerp, BoundingBox, PositionKey,
};
