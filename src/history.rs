//! Undo/redo history of artwork snapshots

use crate::models::Artwork;

/// Snapshots plus the index of the current one.
///
/// Every snapshot is an owned deep copy; nothing is shared with the live
/// artwork.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct History {
    snapshots: Vec<Artwork>,
    pointer: usize,
    limit: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps at most `limit` snapshots, dropping the oldest.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            pointer: 0,
            limit: Some(limit.max(1)),
        }
    }

    /// Rebuild from persisted parts. A pointer past the end is clamped.
    pub fn from_parts(snapshots: Vec<Artwork>, pointer: Option<usize>) -> Self {
        let last = snapshots.len().saturating_sub(1);
        let pointer = pointer.unwrap_or(last).min(last);
        Self {
            snapshots,
            pointer,
            limit: None,
        }
    }

    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit.map(|l| l.max(1));
        self.enforce_limit();
    }

    pub fn snapshots(&self) -> &[Artwork] {
        &self.snapshots
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshot at the current position.
    pub fn current(&self) -> Option<&Artwork> {
        self.snapshots.get(self.pointer)
    }

    /// Record a new state: discard any redo tail, then append a copy.
    ///
    /// Returns `false` without recording if `artwork` equals the current
    /// snapshot.
    pub fn record(&mut self, artwork: &Artwork) -> bool {
        if self.current() == Some(artwork) {
            return false;
        }
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.pointer + 1);
        }
        self.snapshots.push(artwork.clone());
        self.pointer = self.snapshots.len() - 1;
        self.enforce_limit();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.snapshots.len()
    }

    /// Snapshot [`History::undo`] would step back to, without moving.
    pub fn peek_undo(&self) -> Option<&Artwork> {
        if !self.can_undo() {
            return None;
        }
        self.snapshots.get(self.pointer - 1)
    }

    /// Snapshot [`History::redo`] would step forward to, without moving.
    pub fn peek_redo(&self) -> Option<&Artwork> {
        self.snapshots.get(self.pointer + 1)
    }

    /// Step back; returns the now-current snapshot.
    pub fn undo(&mut self) -> Option<&Artwork> {
        if !self.can_undo() {
            return None;
        }
        self.pointer -= 1;
        self.current()
    }

    /// Step forward; returns the now-current snapshot.
    pub fn redo(&mut self) -> Option<&Artwork> {
        if !self.can_redo() {
            return None;
        }
        self.pointer += 1;
        self.current()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.pointer = 0;
    }

    fn enforce_limit(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        if self.snapshots.len() > limit {
            let excess = self.snapshots.len() - limit;
            self.snapshots.drain(..excess);
            self.pointer = self.pointer.saturating_sub(excess);
        }
    }
}
