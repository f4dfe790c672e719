//! Structural edits on an artwork
//!
//! Every function takes the current artwork and returns the next one; the
//! input is never modified. Results that can change layer or frame
//! cardinality go through [`normalize`](crate::validate::normalize) before
//! they are returned. Persistence is layered on top by
//! [`Session`](crate::session::Session).
//!
//! Indices are 0-based positions (layers) or 0-based timeline indices
//! (frames). An index that does not exist makes the edit a no-op.

use crate::models::{Artwork, Layer, DEFAULT_FRAME_DURATION};
use crate::raster::{buffer_equals, RasterBuffer};
use crate::validate::{normalize, normalize_with};

/// Append a new layer named `Layer {n+1}` with one empty slot per frame.
pub fn add_layer(artwork: &Artwork) -> Artwork {
    let name = format!("Layer {}", artwork.layers.len() + 1);
    let mut next = artwork.clone();
    next.layers.push(Layer::new(name, artwork.frames.len()));
    normalize(&next)
}

/// Append a frame, reusing the last frame's duration.
pub fn add_frame(artwork: &Artwork) -> Artwork {
    add_frame_with(artwork, DEFAULT_FRAME_DURATION)
}

/// Append a frame; `default_duration` is used when the timeline is empty.
pub fn add_frame_with(artwork: &Artwork, default_duration: u32) -> Artwork {
    let duration = artwork.frames.last().copied().unwrap_or(default_duration);
    let mut next = artwork.clone();
    next.frames.push(duration);
    let new_key = next.frames.len() as u32;
    for layer in &mut next.layers {
        layer.frames.insert(new_key, Some(RasterBuffer::empty()));
    }
    normalize_with(&next, default_duration)
}

/// Swap the layer at `index` with the one before it.
pub fn move_layer_up(artwork: &Artwork, index: usize) -> Artwork {
    if index == 0 || index >= artwork.layers.len() {
        return artwork.clone();
    }
    let mut next = artwork.clone();
    next.layers.swap(index, index - 1);
    next
}

/// Swap the layer at `index` with the one after it.
pub fn move_layer_down(artwork: &Artwork, index: usize) -> Artwork {
    if index + 1 >= artwork.layers.len() {
        return artwork.clone();
    }
    let mut next = artwork.clone();
    next.layers.swap(index, index + 1);
    next
}

/// Remove the layer at `index`. The last remaining layer is never removed.
pub fn delete_layer(artwork: &Artwork, index: usize) -> Artwork {
    if artwork.layers.len() <= 1 || index >= artwork.layers.len() {
        return artwork.clone();
    }
    let mut next = artwork.clone();
    next.layers.remove(index);
    normalize(&next)
}

/// Remove timeline entry `index` and slot `index + 1` from every layer.
///
/// Later slots move down one key so they stay aligned with the timeline.
pub fn delete_frame(artwork: &Artwork, index: usize) -> Artwork {
    if index >= artwork.frames.len() {
        return artwork.clone();
    }
    let removed_key = index as u32 + 1;
    let mut next = artwork.clone();
    next.frames.remove(index);
    for layer in &mut next.layers {
        let slots = std::mem::take(&mut layer.frames);
        layer.frames = slots
            .into_iter()
            .filter(|(key, _)| *key != removed_key)
            .map(|(key, slot)| {
                if key > removed_key {
                    (key - 1, slot)
                } else {
                    (key, slot)
                }
            })
            .collect();
    }
    normalize(&next)
}

fn update_layer(artwork: &Artwork, index: usize, f: impl FnOnce(&mut Layer)) -> Artwork {
    let mut next = artwork.clone();
    match next.layers.get_mut(index) {
        Some(layer) => f(layer),
        None => tracing::warn!(index, layers = artwork.layers.len(), "no layer at index"),
    }
    next
}

/// Flip the visibility of the layer at `index`.
pub fn toggle_visible(artwork: &Artwork, index: usize) -> Artwork {
    update_layer(artwork, index, |layer| layer.visible = !layer.visible)
}

/// Flip the lock of the layer at `index`.
pub fn toggle_locked(artwork: &Artwork, index: usize) -> Artwork {
    update_layer(artwork, index, |layer| layer.locked = !layer.locked)
}

pub fn show_layer(artwork: &Artwork, index: usize) -> Artwork {
    update_layer(artwork, index, |layer| layer.visible = true)
}

pub fn hide_layer(artwork: &Artwork, index: usize) -> Artwork {
    update_layer(artwork, index, |layer| layer.visible = false)
}

pub fn lock_layer(artwork: &Artwork, index: usize) -> Artwork {
    update_layer(artwork, index, |layer| layer.locked = true)
}

pub fn unlock_layer(artwork: &Artwork, index: usize) -> Artwork {
    update_layer(artwork, index, |layer| layer.locked = false)
}

/// Set the opacity of the layer at `index`, clamped to `[0, 1]`.
pub fn set_opacity(artwork: &Artwork, index: usize, opacity: f32) -> Artwork {
    let opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
    update_layer(artwork, index, |layer| layer.opacity = opacity)
}

/// Rename the layer at `index`. Its identity is unchanged.
pub fn rename_layer(artwork: &Artwork, index: usize, name: &str) -> Artwork {
    update_layer(artwork, index, |layer| layer.name = name.to_string())
}

/// Set the duration (ms) of timeline entry `index`.
pub fn set_frame_duration(artwork: &Artwork, index: usize, duration: u32) -> Artwork {
    let mut next = artwork.clone();
    if let Some(entry) = next.frames.get_mut(index) {
        *entry = duration;
    }
    next
}

/// Replace the raster in `layer`'s slot for timeline entry `frame`.
///
/// Locked layers and unchanged rasters leave the artwork as it was.
pub fn set_frame(artwork: &Artwork, layer: usize, frame: usize, buffer: RasterBuffer) -> Artwork {
    let key = frame as u32 + 1;
    let Some(target) = artwork.layers.get(layer) else {
        return artwork.clone();
    };
    if target.locked || frame >= artwork.frames.len() {
        return artwork.clone();
    }
    if let Some(current) = target.frame(key) {
        if buffer_equals(current, &buffer) {
            return artwork.clone();
        }
    }
    let mut next = artwork.clone();
    next.layers[layer].frames.insert(key, Some(buffer));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::is_normalized;

    fn two_layers() -> Artwork {
        add_layer(&Artwork::default())
    }

    #[test]
    fn test_add_layer() {
        let art = add_frame(&Artwork::default());
        let next = add_layer(&art);
        assert_eq!(next.layers.len(), 2);
        let layer = &next.layers[1];
        assert_eq!(layer.name, "Layer 2");
        assert_eq!(layer.id.name, "Layer 2");
        assert_eq!(layer.opacity, 1.0);
        assert!(layer.visible && !layer.locked);
        assert_eq!(layer.frames.len(), 2);
        assert_ne!(next.layers[0].id, next.layers[1].id);
        // input untouched
        assert_eq!(art.layers.len(), 1);
    }

    #[test]
    fn test_add_frame_three_times() {
        let mut art = Artwork::default();
        for _ in 0..3 {
            art = add_frame(&art);
        }
        assert_eq!(art.frames, vec![100, 100, 100, 100]);
        for layer in &art.layers {
            assert_eq!(layer.frames.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_add_frame_copies_last_duration() {
        let mut art = Artwork::default();
        art.frames = vec![100, 250];
        art = normalize(&art);
        let next = add_frame(&art);
        assert_eq!(next.frames, vec![100, 250, 250]);
    }

    #[test]
    fn test_add_frame_empty_timeline_uses_default() {
        let mut art = Artwork::default();
        art.frames.clear();
        art.layers[0].frames.clear();
        let next = add_frame_with(&art, 80);
        assert_eq!(next.frames, vec![80]);
        assert!(is_normalized(&next));
    }

    #[test]
    fn test_new_slots_are_not_aliased() {
        let art = add_frame(&two_layers());
        let mut next = art.clone();
        next.layers[0]
            .frames
            .insert(2, Some(RasterBuffer::filled(1, 1, [1, 1, 1, 1])));
        assert_eq!(next.layers[1].frame(2), Some(&RasterBuffer::empty()));
        assert_eq!(art.layers[0].frame(2), Some(&RasterBuffer::empty()));
    }

    #[test]
    fn test_move_layer_boundaries() {
        let art = two_layers();
        assert_eq!(move_layer_up(&art, 0), art);
        assert_eq!(move_layer_down(&art, 1), art);
        assert_eq!(move_layer_down(&art, 7), art);
    }

    #[test]
    fn test_move_layer_swaps() {
        let art = two_layers();
        let up = move_layer_up(&art, 1);
        assert_eq!(up.layers[0].id, art.layers[1].id);
        assert_eq!(up.layers[1].id, art.layers[0].id);
        let down = move_layer_down(&art, 0);
        assert_eq!(down, up);
    }

    #[test]
    fn test_delete_layer() {
        let art = two_layers();
        let next = delete_layer(&art, 0);
        assert_eq!(next.layers, vec![art.layers[1].clone()]);
        assert_eq!(delete_layer(&next, 0), next);
    }

    #[test]
    fn test_delete_frame_shifts_later_slots() {
        let mut art = Artwork::default();
        for _ in 0..2 {
            art = add_frame(&art);
        }
        let marked = RasterBuffer::filled(1, 1, [3, 3, 3, 3]);
        art = set_frame(&art, 0, 2, marked.clone());
        art = set_frame_duration(&art, 2, 300);

        let next = delete_frame(&art, 1);
        assert_eq!(next.frames, vec![100, 300]);
        assert_eq!(next.layers[0].frame(2), Some(&marked));
        assert!(is_normalized(&next));
    }

    #[test]
    fn test_delete_frame_out_of_range() {
        let art = Artwork::default();
        assert_eq!(delete_frame(&art, 3), art);
    }

    #[test]
    fn test_toggles_and_setters() {
        let art = Artwork::default();
        let hidden = toggle_visible(&art, 0);
        assert!(!hidden.layers[0].visible);
        assert!(toggle_visible(&hidden, 0).layers[0].visible);
        let locked = toggle_locked(&art, 0);
        assert!(locked.layers[0].locked);

        assert!(!hide_layer(&art, 0).layers[0].visible);
        assert!(show_layer(&hidden, 0).layers[0].visible);
        assert!(lock_layer(&art, 0).layers[0].locked);
        assert!(!unlock_layer(&locked, 0).layers[0].locked);
        assert_eq!(toggle_visible(&art, 5), art);
    }

    #[test]
    fn test_set_opacity_clamps() {
        let art = Artwork::default();
        assert_eq!(set_opacity(&art, 0, 2.0).layers[0].opacity, 1.0);
        assert_eq!(set_opacity(&art, 0, -1.0).layers[0].opacity, 0.0);
        assert_eq!(set_opacity(&art, 0, 0.25).layers[0].opacity, 0.25);
    }

    #[test]
    fn test_rename_keeps_identity() {
        let art = Artwork::default();
        let next = rename_layer(&art, 0, "Sky");
        assert_eq!(next.layers[0].name, "Sky");
        assert_eq!(next.layers[0].id, art.layers[0].id);
    }

    #[test]
    fn test_set_frame_respects_lock() {
        let art = lock_layer(&Artwork::default(), 0);
        let next = set_frame(&art, 0, 0, RasterBuffer::new(4, 4));
        assert_eq!(next, art);
    }

    #[test]
    fn test_invariant_after_edit_sequence() {
        let mut art = Artwork::default();
        let edits: [fn(&Artwork) -> Artwork; 10] = [
            add_frame,
            add_layer,
            add_frame,
            |a| delete_frame(a, 0),
            add_layer,
            |a| move_layer_up(a, 2),
            |a| delete_layer(a, 1),
            add_frame,
            |a| delete_frame(a, 2),
            |a| toggle_locked(a, 0),
        ];
        for edit in &edits {
            art = edit(&art);
            assert!(is_normalized(&art));
        }
        let count = art.frames.len() as u32;
        for layer in &art.layers {
            assert_eq!(
                layer.frames.keys().copied().collect::<Vec<_>>(),
                (1..=count).collect::<Vec<_>>()
            );
        }
    }
}
