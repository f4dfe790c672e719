//! Frame-count normalization
//!
//! The timeline and every layer's slot map describe the same frame count.
//! [`normalize`] is the only place that reconciles them after a structural
//! edit; mutators never patch slots themselves.

use crate::models::{Artwork, DEFAULT_FRAME_DURATION};
use crate::raster::RasterBuffer;

/// Frame count implied by the artwork: the larger of the timeline length and
/// the biggest per-layer slot count.
pub fn how_many_frames(artwork: &Artwork) -> usize {
    let by_layer = artwork
        .layers
        .iter()
        .map(|layer| layer.frames.len())
        .max()
        .unwrap_or(0);
    artwork.frames.len().max(by_layer)
}

/// Normalize using [`DEFAULT_FRAME_DURATION`] for any added timeline entries.
pub fn normalize(artwork: &Artwork) -> Artwork {
    normalize_with(artwork, DEFAULT_FRAME_DURATION)
}

/// Restore the frame-count invariant.
///
/// 1. Widen the timeline (with `default_duration`) if some layer holds more
///    slots than the timeline has entries. Layers may widen the timeline;
///    the timeline never widens a layer beyond the fill in step 3.
/// 2. Drop slot keys above the frame count.
/// 3. Fill missing or `None` slots in `1..=frame_count` with an empty buffer.
///
/// Idempotent: a normalized artwork passes through unchanged.
pub fn normalize_with(artwork: &Artwork, default_duration: u32) -> Artwork {
    let mut result = artwork.clone();

    let target = how_many_frames(&result);
    if result.frames.len() < target {
        tracing::debug!(
            from = result.frames.len(),
            to = target,
            "widening timeline to match layer frames"
        );
        result.frames.resize(target, default_duration);
    }

    let frame_count = result.frames.len() as u32;
    for layer in &mut result.layers {
        layer.frames.retain(|key, _| (1..=frame_count).contains(key));
        for key in 1..=frame_count {
            let slot = layer.frames.entry(key).or_insert(None);
            if slot.is_none() {
                *slot = Some(RasterBuffer::empty());
            }
        }
    }

    result
}

/// True if every layer holds exactly keys `1..=frame_count`, all filled.
pub fn is_normalized(artwork: &Artwork) -> bool {
    let frame_count = artwork.frames.len() as u32;
    artwork.layers.iter().all(|layer| {
        layer.frames.len() == frame_count as usize
            && (1..=frame_count).all(|key| matches!(layer.frames.get(&key), Some(Some(_))))
    })
}
