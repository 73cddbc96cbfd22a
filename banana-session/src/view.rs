//! Render-ready snapshots of a workspace, published after every mutation.

use banana_core::{HistoryStore, ImageId, ImageRef};
use serde::Serialize;

use crate::session::{EditSession, SessionStatus};

/// One history entry as shown to the user. Carries no image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub id: ImageId,
    pub label: String,
    pub created_at_ms: i64,
    pub mime_type: String,
    pub byte_len: usize,
    pub is_current: bool,
}

impl EntryView {
    fn from_image(image: &ImageRef, is_current: bool) -> Self {
        Self {
            id: image.id(),
            label: image.label().to_string(),
            created_at_ms: image.created_at_ms(),
            mime_type: image.content().mime_type().to_string(),
            byte_len: image.content().len(),
            is_current,
        }
    }
}

/// Everything a presentation layer needs to draw the editor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WorkspaceView {
    /// Most recent first; the first entry is the current image.
    pub entries: Vec<EntryView>,
    pub status: SessionStatus,
    pub last_error: Option<String>,
    pub generation: u64,
}

impl WorkspaceView {
    pub fn capture(history: &HistoryStore, session: &EditSession) -> Self {
        Self {
            entries: history
                .entries()
                .enumerate()
                .map(|(i, image)| EntryView::from_image(image, i == 0))
                .collect(),
            status: session.status(),
            last_error: session.last_error().map(str::to_string),
            generation: history.generation(),
        }
    }

    pub fn current(&self) -> Option<&EntryView> {
        self.entries.first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an undo button should be enabled.
    pub fn can_undo(&self) -> bool {
        self.entries.len() > 1 && self.status != SessionStatus::Running
    }
}
