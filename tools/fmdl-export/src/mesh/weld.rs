//! Loop welding: face corners to shared vertices
//!
//! Corners are bucketed by exact position (and skin weights, which live on
//! vertex slots). Inside a bucket each corner either joins the first
//! matching [`Loop`] or starts a new one; every loop becomes one vertex.

use fmdl_common::{host_to_format, position_key, Face, PositionKey, Vertex};
use glam::Vec3;
use hashbrown::HashMap;
use tracing::debug;

use super::tangent::average_tangent;
use super::types::{Loop, LoopLayers, SlotWeights, WeldedGeometry};
use crate::settings::WeldPolicy;

/// Bucket identity: exact position plus exact skin weights
type BucketKey = (PositionKey, Vec<(usize, u32)>);

struct Bucket {
    position: Vec3,
    slot: usize,
    loops: Vec<Loop>,
}

fn bucket_key(position: Vec3, weights: &SlotWeights) -> BucketKey {
    (
        position_key(position),
        weights.iter().map(|(b, w)| (b.0, w.to_bits())).collect(),
    )
}

/// Weld a triangulated corner mesh into shared vertices
///
/// `positions` and `weights` are per vertex slot, in host space. Buckets key
/// on the exact position together with the slot's skin weights, so
/// differently skinned slots at one position never share a vertex. Output
/// vertices are in format space, ordered by first slot of each bucket and
/// then by loop creation; faces keep triangle order with reversed winding.
pub fn weld_loops(
    positions: &[Vec3],
    weights: &[SlotWeights],
    layers: &LoopLayers,
    policy: &WeldPolicy,
) -> WeldedGeometry {
    let no_weights = SlotWeights::new();
    let slot_weights = |slot: usize| weights.get(slot).unwrap_or(&no_weights);

    let mut buckets: Vec<Bucket> = Vec::new();
    let mut bucket_index: HashMap<BucketKey, usize> = HashMap::new();
    let mut slot_bucket: Vec<usize> = Vec::with_capacity(positions.len());
    for (slot, &position) in positions.iter().enumerate() {
        let key = bucket_key(position, slot_weights(slot));
        let index = *bucket_index.entry(key).or_insert_with(|| {
            buckets.push(Bucket {
                position,
                slot,
                loops: Vec::new(),
            });
            buckets.len() - 1
        });
        slot_bucket.push(index);
    }

    for corner in 0..layers.len() {
        let bucket = &mut buckets[slot_bucket[layers.slots[corner] as usize]];
        let candidate = Loop::from_corner(layers, corner);
        match bucket
            .loops
            .iter_mut()
            .find(|l| l.matches(&candidate, policy.normal_similarity))
        {
            Some(existing) => existing.merge(candidate),
            None => bucket.loops.push(candidate),
        }
    }

    let mut vertices = Vec::new();
    let mut corner_vertex = vec![0u32; layers.len()];
    for bucket in &buckets {
        for l in &bucket.loops {
            let index = vertices.len() as u32;
            for &corner in &l.corners {
                corner_vertex[corner] = index;
            }
            let normal = l.normal.try_normalize().unwrap_or(l.normal);
            let tangent = average_tangent(&l.tangents, normal, policy);
            vertices.push(Vertex {
                position: host_to_format(bucket.position),
                normal: host_to_format(normal).extend(1.0),
                tangent: host_to_format(tangent).extend(1.0),
                color: l.color,
                uv: l.uv.clone(),
                bone_mapping: slot_weights(bucket.slot).clone(),
            });
        }
    }

    let faces: Vec<Face> = (0..layers.triangle_count())
        .map(|t| {
            let base = 3 * t;
            Face::new(
                corner_vertex[base + 2],
                corner_vertex[base + 1],
                corner_vertex[base],
            )
        })
        .collect();

    debug!(
        "Welded {} corners into {} vertices ({} positions)",
        layers.len(),
        vertices.len(),
        buckets.len()
    );

    WeldedGeometry { vertices, faces }
}
