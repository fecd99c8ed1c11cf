//! Math helpers for FMDL geometry
//!
//! FMDL stores geometry Y-up while the authoring application works Z-up.
//! All conversions between the two go through [`host_to_format`] and
//! [`format_to_host`], which only swap and negate components and are
//! therefore exact.

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Tolerance used by [`slerp`] to detect parallel and opposite directions
const SLERP_PARALLEL_EPSILON: f32 = 1.0e-6;

/// Hashable key for exact position equality
///
/// `-0.0` and `0.0` compare equal as floats, so the key is built from
/// `p + 0.0`, which folds negative zero onto positive zero.
pub type PositionKey = [u32; 3];

/// Build the dictionary key used to deduplicate vertices by position
pub fn position_key(position: Vec3) -> PositionKey {
    let p = position + Vec3::ZERO;
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}

/// Convert a host-space (Z-up) vector to format space (Y-up)
#[inline]
pub fn host_to_format(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

/// Convert a format-space (Y-up) vector to host space (Z-up)
#[inline]
pub fn format_to_host(v: Vec3) -> Vec3 {
    Vec3::new(v.x, -v.z, v.y)
}

/// Flip the V coordinate (the format's texture origin is the top-left corner)
#[inline]
pub fn flip_v(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y)
}

/// Spherical interpolation between the directions of two vectors
///
/// Both inputs are normalized first and the result is a unit vector.
/// Zero-length or directly opposite inputs cannot be interpolated; in
/// that case `a` is returned unchanged.
pub fn slerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let (Some(a_dir), Some(b_dir)) = (a.try_normalize(), b.try_normalize()) else {
        return a;
    };

    let cos_omega = a_dir.dot(b_dir);
    if cos_omega < -1.0 + SLERP_PARALLEL_EPSILON {
        return a;
    }

    let (w0, w1) = if cos_omega < 1.0 - SLERP_PARALLEL_EPSILON {
        let omega = cos_omega.acos();
        let sin_omega = omega.sin();
        (
            ((1.0 - t) * omega).sin() / sin_omega,
            (t * omega).sin() / sin_omega,
        )
    } else {
        (1.0 - t, t)
    };

    a_dir * w0 + b_dir * w1
}

/// Axis-aligned bounding box with homogeneous (w = 1.0) corners
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec4,
    pub max: Vec4,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::DEGENERATE
    }
}

impl BoundingBox {
    /// Zero-volume box at the origin, used when nothing contributes geometry
    pub const DEGENERATE: Self = Self {
        min: Vec4::new(0.0, 0.0, 0.0, 1.0),
        max: Vec4::new(0.0, 0.0, 0.0, 1.0),
    };

    /// Create a box from 3D corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.extend(1.0),
            max: max.extend(1.0),
        }
    }

    /// Smallest box containing every point, or `None` for an empty iterator
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self::new(min, max))
    }

    /// Smallest box containing every box, or `None` for an empty iterator
    pub fn union_all<I: IntoIterator<Item = BoundingBox>>(boxes: I) -> Option<Self> {
        let mut iter = boxes.into_iter();
        let first = iter.next()?;
        Some(iter.fold(first, |acc, b| acc.union(&b)))
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self::new(
            self.min.truncate().min(other.min.truncate()),
            self.max.truncate().max(other.max.truncate()),
        )
    }

    /// Whether `other` lies entirely within this box
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min.truncate().cmple(other.min.truncate()).all()
            && self.max.truncate().cmpge(other.max.truncate()).all()
    }

    /// Whether the box has zero extent on every axis
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Return the box converted from host space to format space
    ///
    /// The Y/Z swap negates one axis, so min and max trade places on it.
    pub fn from_host(min: Vec3, max: Vec3) -> Self {
        let a = host_to_format(min);
        let b = host_to_format(max);
        Self::new(a.min(b), a.max(b))
    }

    /// Return the host-space (min, max) corners of this format-space box
    pub fn to_host(&self) -> (Vec3, Vec3) {
        let a = format_to_host(self.min.truncate());
        let b = format_to_host(self.max.truncate());
        (a.min(b), a.max(b))
    }
}
