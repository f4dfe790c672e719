//! Editing session: the current artwork, its history, and their storage
//!
//! A [`Session`] is created when editing starts ([`Session::open`]), mutated
//! only through [`Session::apply`] and the wrappers around it, and cleared by
//! [`Session::reset`]. Each applied edit is normalized, then written to
//! storage together with its history entry before it becomes current.

use crate::history::History;
use crate::models::{Artwork, CanvasConfig, DEFAULT_FRAME_DURATION};
use crate::persist::{PersistError, PersistenceGateway, ARTWORK_KEY, HISTORY_KEY};
use crate::raster::RasterBuffer;
use crate::storage::SessionStorage;
use crate::store;
use crate::validate::normalize_with;

/// Keys and defaults a session runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub artwork_key: String,
    pub history_key: String,
    pub default_duration: u32,
    pub history_limit: Option<usize>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            artwork_key: ARTWORK_KEY.to_string(),
            history_key: HISTORY_KEY.to_string(),
            default_duration: DEFAULT_FRAME_DURATION,
            history_limit: None,
        }
    }
}

/// Live editing state bound to a storage backend.
///
/// The history stays empty until the first edit; opening a session never
/// writes to storage.
#[derive(Debug)]
pub struct Session<S> {
    gateway: PersistenceGateway<S>,
    settings: SessionSettings,
    artwork: Artwork,
    history: History,
}

impl<S: SessionStorage> Session<S> {
    /// Restore a session from storage, starting fresh if nothing is stored.
    pub fn open(storage: S, settings: SessionSettings) -> Result<Self, PersistError> {
        let gateway = PersistenceGateway::new(storage);
        let artwork = normalize_with(
            &gateway.load(&settings.artwork_key)?,
            settings.default_duration,
        );
        let snapshots = gateway.load_history(&settings.history_key)?;
        let pointer = gateway.load_history_pointer(&settings.history_key)?;
        let mut history = History::from_parts(snapshots, pointer);
        history.set_limit(settings.history_limit);

        tracing::debug!(
            layers = artwork.layers.len(),
            frames = artwork.frames.len(),
            history = history.len(),
            "session opened"
        );
        Ok(Self {
            gateway,
            settings,
            artwork,
            history,
        })
    }

    pub fn artwork(&self) -> &Artwork {
        &self.artwork
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn into_storage(self) -> S {
        self.gateway.into_inner()
    }

    /// Apply an edit. No-op edits are neither saved nor recorded.
    ///
    /// If saving fails the current artwork, the history and the stored
    /// documents stay as they were.
    pub fn apply(&mut self, edit: impl FnOnce(&Artwork) -> Artwork) -> Result<&Artwork, PersistError> {
        let next = normalize_with(&edit(&self.artwork), self.settings.default_duration);
        if next == self.artwork {
            return Ok(&self.artwork);
        }
        let mut history = self.history.clone();
        if history.is_empty() {
            history.record(&self.artwork);
        }
        history.record(&next);
        self.commit(next, history)?;
        Ok(&self.artwork)
    }

    /// Discard everything and start a new artwork from `canvas`.
    pub fn start_new(&mut self, canvas: &CanvasConfig) -> Result<&Artwork, PersistError> {
        self.replace_all(Artwork::new(canvas))
    }

    /// Reset to a default artwork and clear the stored history.
    pub fn reset(&mut self) -> Result<&Artwork, PersistError> {
        self.replace_all(Artwork::default())
    }

    fn replace_all(&mut self, artwork: Artwork) -> Result<&Artwork, PersistError> {
        let mut history = History::new();
        history.set_limit(self.settings.history_limit);
        history.record(&artwork);
        self.commit(artwork, history)?;
        Ok(&self.artwork)
    }

    /// Step back in history. Returns `false` if there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, PersistError> {
        let Some(previous) = self.history.peek_undo().cloned() else {
            return Ok(false);
        };
        self.restore(previous, self.history.pointer() - 1)?;
        self.history.undo();
        Ok(true)
    }

    /// Step forward in history. Returns `false` if there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, PersistError> {
        let Some(next) = self.history.peek_redo().cloned() else {
            return Ok(false);
        };
        self.restore(next, self.history.pointer() + 1)?;
        self.history.redo();
        Ok(true)
    }

    /// Store a history snapshot as the artwork and `pointer` as the position.
    fn restore(&mut self, artwork: Artwork, pointer: usize) -> Result<(), PersistError> {
        self.gateway
            .save_history_pointer(pointer, &self.settings.history_key)?;
        if let Err(e) = self.gateway.save(&artwork, &self.settings.artwork_key) {
            self.roll_back(false);
            return Err(e);
        }
        self.artwork = artwork;
        Ok(())
    }

    /// Write `history` then `artwork`, and make both current.
    ///
    /// The artwork is written last. If any write fails the stored history is
    /// put back and nothing in memory changes.
    fn commit(&mut self, artwork: Artwork, history: History) -> Result<(), PersistError> {
        self.gateway
            .save_history(history.snapshots(), &self.settings.history_key)?;
        let written = self
            .gateway
            .save_history_pointer(history.pointer(), &self.settings.history_key)
            .and_then(|()| self.gateway.save(&artwork, &self.settings.artwork_key));
        if let Err(e) = written {
            self.roll_back(true);
            return Err(e);
        }
        self.artwork = artwork;
        self.history = history;
        Ok(())
    }

    fn roll_back(&mut self, snapshots: bool) {
        if let Err(e) = self.write_history(snapshots) {
            tracing::warn!(error = %e, "stored history no longer matches the session");
        }
    }

    fn write_history(&mut self, snapshots: bool) -> Result<(), PersistError> {
        let key = &self.settings.history_key;
        if self.history.is_empty() {
            return self.gateway.reset_history(key);
        }
        if snapshots {
            self.gateway.save_history(self.history.snapshots(), key)?;
        }
        self.gateway.save_history_pointer(self.history.pointer(), key)
    }

    pub fn add_layer(&mut self) -> Result<&Artwork, PersistError> {
        self.apply(store::add_layer)
    }

    pub fn add_frame(&mut self) -> Result<&Artwork, PersistError> {
        let default_duration = self.settings.default_duration;
        self.apply(|a| store::add_frame_with(a, default_duration))
    }

    pub fn move_layer_up(&mut self, index: usize) -> Result<&Artwork, PersistError> {
        self.apply(|a| store::move_layer_up(a, index))
    }

    pub fn move_layer_down(&mut self, index: usize) -> Result<&Artwork, PersistError> {
        self.apply(|a| store::move_layer_down(a, index))
    }

    pub fn delete_layer(&mut self, index: usize) -> Result<&Artwork, PersistError> {
        self.apply(|a| store::delete_layer(a, index))
    }

    pub fn delete_frame(&mut self, index: usize) -> Result<&Artwork, PersistError> {
        self.apply(|a| store::delete_frame(a, index))
    }

    pub fn toggle_visible(&mut self, index: usize) -> Result<&Artwork, PersistError> {
        self.apply(|a| store::toggle_visible(a, index))
    }

    pub fn toggle_locked(&mut self, index: usize) -> Result<&Artwork, PersistError> {
        self.apply(|a| store::toggle_locked(a, index))
    }

    pub fn set_frame_duration(&mut self, index: usize, ms: u32) -> Result<&Artwork, PersistError> {
        self.apply(|a| store::set_frame_duration(a, index, ms))
    }

    pub fn set_frame(
        &mut self,
        layer: usize,
        frame: usize,
        buffer: RasterBuffer,
    ) -> Result<&Artwork, PersistError> {
        self.apply(|a| store::set_frame(a, layer, frame, buffer))
    }
}
