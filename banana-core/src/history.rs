//! Linear edit history.
//!
//! The store is presented most-recent-first: index 0 is the current image and there
//! is no separate cursor. Internally versions are kept oldest-first so that appending
//! is a push and rewinding is a truncate.
//!
//! Rewinds are destructive. Moving to an older version drops every newer one, and a
//! subsequent edit grows the chain from there. There is no redo.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::image::{ImageId, ImageRef};

#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    // Oldest first; the last element is the current head.
    versions: Vec<ImageRef>,
    generation: u64,
}

impl HistoryStore {
    /// Create an empty store ("no image loaded").
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole history with `[initial]`, or clear it when `initial` is `None`.
    pub fn reset(&mut self, initial: Option<ImageRef>) {
        let discarded = self.versions.len();
        self.versions.clear();

        match initial {
            Some(image) => {
                info!(
                    image_id = %image.id(),
                    label = %image.label(),
                    discarded,
                    "history reset to new image"
                );
                self.versions.push(image);
            }
            None => {
                info!(discarded, "history cleared");
            }
        }

        self.bump();
    }

    /// Put `entry` on top of the history. Older versions are kept so they can be
    /// rewound to later.
    pub fn append(&mut self, entry: ImageRef) -> Result<(), HistoryError> {
        if self.versions.is_empty() {
            warn!(
                image_id = %entry.id(),
                "refusing to append an edit to an empty history"
            );
            return Err(HistoryError::NoBaseImage);
        }

        debug!(
            image_id = %entry.id(),
            label = %entry.label(),
            depth = self.versions.len() + 1,
            "appending image version"
        );

        self.versions.push(entry);
        self.bump();
        Ok(())
    }

    /// Make the version with `id` current, discarding every version newer than it.
    pub fn move_to(&mut self, id: ImageId) -> Result<(), HistoryError> {
        let Some(pos) = self.versions.iter().position(|v| v.id() == id) else {
            warn!(image_id = %id, "rewind target not found in history");
            return Err(HistoryError::NotFound { id });
        };

        let dropped = self.versions.len() - pos - 1;
        if dropped == 0 {
            debug!(image_id = %id, "rewind target is already current");
            return Ok(());
        }

        self.versions.truncate(pos + 1);
        self.bump();

        info!(
            image_id = %id,
            dropped,
            remaining = self.versions.len(),
            "rewound history"
        );
        Ok(())
    }

    /// Step back one version. Same as `move_to` on the entry at index 1.
    pub fn undo(&mut self) -> Result<(), HistoryError> {
        let Some(previous) = self.get(1).map(ImageRef::id) else {
            debug!(len = self.versions.len(), "nothing to undo");
            return Err(HistoryError::AtBoundary);
        };
        self.move_to(previous)
    }

    /// The current image, if any.
    pub fn current(&self) -> Option<&ImageRef> {
        self.versions.last()
    }

    pub fn size(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Entry at `index`, counting from the current image (index 0).
    pub fn get(&self, index: usize) -> Option<&ImageRef> {
        let len = self.versions.len();
        if index >= len {
            return None;
        }
        self.versions.get(len - 1 - index)
    }

    /// Index of `id`, counting from the current image.
    pub fn position(&self, id: ImageId) -> Option<usize> {
        self.entries().position(|v| v.id() == id)
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.versions.iter().any(|v| v.id() == id)
    }

    /// All versions, most recent first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &ImageRef> + ExactSizeIterator {
        self.versions.iter().rev()
    }

    /// Mutation counter. Changes whenever the visible history changes, so an
    /// operation that captured it earlier can tell whether it is still on the same
    /// history.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// History navigation errors. None of them change the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("image {id} is not in the history")]
    NotFound { id: ImageId },

    #[error("already at the oldest image, nothing to undo")]
    AtBoundary,

    #[error("no image loaded")]
    NoBaseImage,
}
