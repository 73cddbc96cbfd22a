//! banana-core: image versions and the linear edit history for the banana editor.
//!
//! Design rules:
//! - Image versions are immutable snapshots; nothing mutates an ImageRef after creation.
//! - History is a single linear chain, most recent first. Index 0 is always "current".
//! - Rewinding is destructive: everything newer than the target is dropped for good.
//! - The store never touches the network; edits are produced elsewhere and appended here.

pub mod history;
pub mod image;

pub use history::{HistoryError, HistoryStore};
pub use image::{ContentError, ImageContent, ImageId, ImageRef, ORIGINAL_LABEL};
