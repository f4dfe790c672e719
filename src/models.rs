//! Data models for artworks (layers, frame slots, timeline)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::identity::LayerId;
use crate::raster::RasterBuffer;

/// Duration (ms) given to frames when nothing else is known.
pub const DEFAULT_FRAME_DURATION: u32 = 100;

/// A layer's frame slots, keyed by 1-based frame index.
///
/// `None` is allowed transiently; normalization replaces it with an empty
/// buffer.
pub type FrameSlots = BTreeMap<u32, Option<RasterBuffer>>;

/// One entry in the layer stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub opacity: f32,
    pub visible: bool,
    pub locked: bool,
    pub frames: FrameSlots,
}

impl Layer {
    /// A visible, unlocked, fully opaque layer with `frame_count` empty slots.
    pub fn new(name: impl Into<String>, frame_count: usize) -> Self {
        let name = name.into();
        let frames = (1..=frame_count as u32)
            .map(|key| (key, Some(RasterBuffer::empty())))
            .collect();
        Self {
            id: LayerId::generate(&name),
            name,
            opacity: 1.0,
            visible: true,
            locked: false,
            frames,
        }
    }

    /// Raster held at a 1-based frame index.
    pub fn frame(&self, key: u32) -> Option<&RasterBuffer> {
        self.frames.get(&key).and_then(|slot| slot.as_ref())
    }
}

/// Ordered layers plus the shared frame timeline.
///
/// The timeline length is the frame count; every layer holds exactly the
/// slot keys `1..=frame_count` once normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub layers: Vec<Layer>,
    pub frames: Vec<u32>,
}

impl Artwork {
    /// A fresh artwork seeded from a canvas configuration: one layer, one
    /// frame of the configured size filled with the background.
    pub fn new(config: &CanvasConfig) -> Self {
        let mut layer = Layer::new("Layer 1", 1);
        layer.frames.insert(
            1,
            Some(RasterBuffer::filled(
                config.width,
                config.height,
                config.background.rgba(),
            )),
        );
        Self {
            layers: vec![layer],
            frames: vec![DEFAULT_FRAME_DURATION],
        }
    }

    /// Number of frames, as defined by the timeline.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Position of the layer with the given identity.
    pub fn layer_index(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    /// Total animation length in milliseconds.
    pub fn total_duration(&self) -> u64 {
        self.frames.iter().map(|&d| d as u64).sum()
    }
}

impl Default for Artwork {
    /// One layer, one frame, 1x1 empty raster.
    fn default() -> Self {
        Self {
            layers: vec![Layer::new("Layer 1", 1)],
            frames: vec![DEFAULT_FRAME_DURATION],
        }
    }
}

/// Background fill for a new artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    #[default]
    Transparent,
    White,
    Black,
}

impl Background {
    pub fn rgba(self) -> [u8; 4] {
        match self {
            Background::Transparent => [0, 0, 0, 0],
            Background::White => [255, 255, 255, 255],
            Background::Black => [0, 0, 0, 255],
        }
    }
}

/// "New artwork" settings supplied by the setup flow.
///
/// Dimensions are taken as given; clamping is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub background: Background,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 16,
            height: 16,
            background: Background::Transparent,
            session_key: None,
        }
    }
}
