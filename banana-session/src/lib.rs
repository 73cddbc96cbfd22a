//! banana-session: runs natural-language edits against the image history.
//!
//! Design rules:
//! - At most one edit is in flight per workspace; a second request is rejected, not queued.
//! - A failed edit never touches the history. The image on screen stays what it was.
//! - Every edit captures the history generation when it starts. A result that comes
//!   back after the history moved on is discarded instead of applied.
//! - The backend is injected; nothing here knows about HTTP or a specific model.

pub mod backend;
pub mod mock;
pub mod session;
pub mod view;
pub mod workspace;

pub use backend::{BackendError, EditBackend};
pub use mock::MockBackend;
pub use session::{EditError, EditOutcome, EditSession, PendingEdit, SessionStatus};
pub use view::{EntryView, WorkspaceView};
pub use workspace::Workspace;

pub use banana_core::{HistoryError, HistoryStore, ImageContent, ImageId, ImageRef};
