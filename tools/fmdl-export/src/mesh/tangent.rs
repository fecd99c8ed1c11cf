//! Tangent averaging for welded vertices

use fmdl_common::slerp;
use glam::Vec3;
use tracing::trace;

use crate::settings::WeldPolicy;

/// Make up a tangent perpendicular to `normal`
///
/// Crosses the coordinate axis least aligned with the normal with the
/// normal itself. The result is unit length.
pub fn fallback_tangent(normal: Vec3) -> Vec3 {
    let axis = [Vec3::X, Vec3::Y, Vec3::Z]
        .into_iter()
        .fold(None::<Vec3>, |best, axis| match best {
            Some(b) if b.dot(normal).abs() <= axis.dot(normal).abs() => Some(b),
            _ => Some(axis),
        })
        .unwrap_or(Vec3::X);
    axis.cross(normal).try_normalize().unwrap_or(Vec3::X)
}

/// Average the raw tangents of the corners merged into one vertex
///
/// Degenerate tangents are dropped. The first survivor seeds the average;
/// later tangents are folded in with decreasing weight, except those
/// pointing against the running average, which are retried on the next
/// pass. A pass that folds nothing in ends the loop and drops the rest.
pub fn average_tangent(tangents: &[Vec3], normal: Vec3, policy: &WeldPolicy) -> Vec3 {
    let mut usable = tangents
        .iter()
        .copied()
        .filter(|t| t.length_squared() > policy.degenerate_tangent_length_squared);

    let Some(first) = usable.next() else {
        trace!("No usable tangent, deriving one from the normal");
        return fallback_tangent(normal);
    };

    let mut average = first;
    let mut weight = 1.0f32;
    let mut remaining: Vec<Vec3> = usable.collect();

    while !remaining.is_empty() {
        let mut skipped = Vec::new();
        for &tangent in &remaining {
            if average.dot(tangent) < policy.tangent_opposite {
                skipped.push(tangent);
            } else {
                weight += 1.0;
                average = slerp(average, tangent, 1.0 / weight);
            }
        }
        if skipped.len() == remaining.len() {
            break;
        }
        remaining = skipped;
    }

    average.try_normalize().unwrap_or(average)
}
