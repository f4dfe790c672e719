//! Persistence of artworks and undo history to session storage
//!
//! # Storage layout
//!
//! | Key              | Value                                   |
//! |------------------|-----------------------------------------|
//! | `artworkObject`  | current artwork document (JSON)         |
//! | `history`        | JSON array of artwork documents         |
//! | `historyPointer` | integer index into `history`            |
//!
//! Inside a document every raster is stored in the lossless text form (see
//! [`crate::raster::encode_text`]) as a JSON string, keyed by 1-based frame
//! index:
//!
//! ```json
//! {"layers": [{"id": "eyJuYW1l...", "name": "Layer 1", "opacity": 1.0,
//!              "visible": true, "locked": false,
//!              "frames": {"1": "{\"width\":1,\"height\":1,\"data\":[0,0,0,0]}"}}],
//!  "frames": [100]}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::identity::{IdentityError, LayerId};
use crate::models::{Artwork, FrameSlots, Layer};
use crate::raster::{self, CodecError};
use crate::storage::{SessionStorage, StorageError};

/// Key holding the current artwork.
pub const ARTWORK_KEY: &str = "artworkObject";
/// Key holding the undo history.
pub const HISTORY_KEY: &str = "history";

/// Error type for persistence operations
#[derive(Debug, Error)]
pub enum PersistError {
    /// Underlying storage failed; the previous value is still intact
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Stored document is not valid JSON of the expected shape
    #[error("invalid stored document: {0}")]
    Document(#[from] serde_json::Error),
    /// A stored layer id could not be decoded
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// A raster could not be encoded or (in the image path) decoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Pointer key paired with a history key (`history` -> `historyPointer`).
pub fn pointer_key(history_key: &str) -> String {
    format!("{}Pointer", history_key)
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredArtwork {
    layers: Vec<StoredLayer>,
    frames: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredLayer {
    id: String,
    name: String,
    opacity: f32,
    visible: bool,
    locked: bool,
    frames: BTreeMap<String, Option<String>>,
}

/// How rasters are written inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RasterForm {
    Text,
    Image,
}

fn to_stored(artwork: &Artwork, form: RasterForm) -> Result<StoredArtwork, PersistError> {
    let mut layers = Vec::with_capacity(artwork.layers.len());
    for layer in &artwork.layers {
        let mut frames = BTreeMap::new();
        for (key, slot) in &layer.frames {
            let encoded = match slot {
                Some(buffer) => Some(match form {
                    RasterForm::Text => raster::encode_text(buffer),
                    RasterForm::Image => raster::encode_image(buffer)?,
                }),
                None => None,
            };
            frames.insert(key.to_string(), encoded);
        }
        layers.push(StoredLayer {
            id: layer.id.encode(),
            name: layer.name.clone(),
            opacity: layer.opacity,
            visible: layer.visible,
            locked: layer.locked,
            frames,
        });
    }
    Ok(StoredArtwork {
        layers,
        frames: artwork.frames.clone(),
    })
}

fn frame_key(layer: &str, key: &str) -> Option<u32> {
    match key.parse::<u32>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(layer, key, "skipping non-numeric frame key");
            None
        }
    }
}

fn from_stored_text(stored: StoredArtwork) -> Result<Artwork, PersistError> {
    let mut layers = Vec::with_capacity(stored.layers.len());
    for layer in stored.layers {
        let mut frames = FrameSlots::new();
        for (key, value) in &layer.frames {
            let Some(index) = frame_key(&layer.name, key) else {
                continue;
            };
            frames.insert(index, value.as_deref().map(raster::decode_text));
        }
        layers.push(Layer {
            id: LayerId::decode(&layer.id)?,
            name: layer.name,
            opacity: layer.opacity,
            visible: layer.visible,
            locked: layer.locked,
            frames,
        });
    }
    Ok(Artwork {
        layers,
        frames: stored.frames,
    })
}

async fn from_stored_image(stored: StoredArtwork) -> Result<Artwork, PersistError> {
    let mut layers = Vec::with_capacity(stored.layers.len());
    for layer in stored.layers {
        let mut frames = FrameSlots::new();
        // One slot at a time; no two decodes for the same slot overlap.
        for (key, value) in &layer.frames {
            let Some(index) = frame_key(&layer.name, key) else {
                continue;
            };
            let buffer = match value {
                Some(url) => Some(raster::decode_image(url).await?),
                None => None,
            };
            frames.insert(index, buffer);
        }
        layers.push(Layer {
            id: LayerId::decode(&layer.id)?,
            name: layer.name,
            opacity: layer.opacity,
            visible: layer.visible,
            locked: layer.locked,
            frames,
        });
    }
    Ok(Artwork {
        layers,
        frames: stored.frames,
    })
}

/// Serialize an artwork to its durable JSON document (text rasters).
pub fn serialize_artwork(artwork: &Artwork) -> Result<String, PersistError> {
    Ok(serde_json::to_string(&to_stored(artwork, RasterForm::Text)?)?)
}

/// Parse a durable JSON document. Bad rasters become empty buffers.
pub fn deserialize_artwork(json: &str) -> Result<Artwork, PersistError> {
    let stored: StoredArtwork = serde_json::from_str(json)?;
    from_stored_text(stored)
}

/// Serialize with every raster as a PNG data URL.
///
/// Smaller for large canvases; used for export, not for session storage.
pub fn serialize_compact(artwork: &Artwork) -> Result<String, PersistError> {
    Ok(serde_json::to_string(&to_stored(artwork, RasterForm::Image)?)?)
}

/// Parse a compact document, decoding every image.
///
/// Unlike the text path, an undecodable image rejects the whole load with
/// [`CodecError::ImageLoadError`]: there are no known dimensions to fall
/// back to.
pub async fn deserialize_compact(json: &str) -> Result<Artwork, PersistError> {
    let stored: StoredArtwork = serde_json::from_str(json)?;
    from_stored_image(stored).await
}

/// Reads and writes artworks and history through a [`SessionStorage`].
#[derive(Debug)]
pub struct PersistenceGateway<S> {
    storage: S,
}

impl<S: SessionStorage> PersistenceGateway<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Store `artwork` under `key`, replacing any previous value.
    ///
    /// The document is fully built before the write, so a failed write leaves
    /// the previous value in place.
    pub fn save(&mut self, artwork: &Artwork, key: &str) -> Result<(), PersistError> {
        let json = serialize_artwork(artwork)?;
        self.storage.set(key, &json)?;
        tracing::debug!(key, bytes = json.len(), "saved artwork");
        Ok(())
    }

    /// Load the artwork at `key`, or a fresh default artwork if none is stored.
    pub fn load(&self, key: &str) -> Result<Artwork, PersistError> {
        match self.storage.get(key)? {
            Some(json) => deserialize_artwork(&json),
            None => {
                tracing::debug!(key, "no stored artwork, starting fresh");
                Ok(Artwork::default())
            }
        }
    }

    /// Overwrite the artwork at `key` with a fresh default artwork.
    pub fn reset_artwork(&mut self, key: &str) -> Result<Artwork, PersistError> {
        let fresh = Artwork::default();
        self.save(&fresh, key)?;
        Ok(fresh)
    }

    /// Store an ordered list of snapshots under `key`.
    pub fn save_history(&mut self, stack: &[Artwork], key: &str) -> Result<(), PersistError> {
        let stored = stack
            .iter()
            .map(|artwork| to_stored(artwork, RasterForm::Text))
            .collect::<Result<Vec<_>, _>>()?;
        let json = serde_json::to_string(&stored)?;
        self.storage.set(key, &json)?;
        tracing::debug!(key, snapshots = stack.len(), "saved history");
        Ok(())
    }

    /// Load snapshots stored under `key`; empty if nothing is stored.
    pub fn load_history(&self, key: &str) -> Result<Vec<Artwork>, PersistError> {
        let Some(json) = self.storage.get(key)? else {
            return Ok(Vec::new());
        };
        let stored: Vec<StoredArtwork> = serde_json::from_str(&json)?;
        stored.into_iter().map(from_stored_text).collect()
    }

    /// Store the current-position pointer for the history at `key`.
    pub fn save_history_pointer(&mut self, pointer: usize, key: &str) -> Result<(), PersistError> {
        self.storage
            .set(&pointer_key(key), &serde_json::to_string(&pointer)?)?;
        Ok(())
    }

    /// Load the pointer for the history at `key`, if stored.
    pub fn load_history_pointer(&self, key: &str) -> Result<Option<usize>, PersistError> {
        match self.storage.get(&pointer_key(key))? {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    /// Remove the history at `key` and its pointer.
    pub fn reset_history(&mut self, key: &str) -> Result<(), PersistError> {
        self.storage.remove(key)?;
        self.storage.remove(&pointer_key(key))?;
        Ok(())
    }
}
