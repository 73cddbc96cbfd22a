//! Edit session state machine.
//!
//! ```text
//! Idle --begin--> Running --finish(ok)--> Idle
//!                 Running --finish(err)--> Failed --begin--> Running
//!                                          Failed --clear_error--> Idle
//! any --abandon--> Idle
//! ```
//!
//! The session is split in two synchronous halves, [`EditSession::begin`] and
//! [`EditSession::finish`], with the backend call in between. The async glue lives
//! in [`crate::Workspace::run`]; keeping the state transitions synchronous means the
//! history is never observed half-updated.

use banana_core::{HistoryError, HistoryStore, ImageContent, ImageId, ImageRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Failed,
}

/// An edit that has been started and is waiting for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    run_id: u64,
    generation: u64,
    base: ImageId,
    instruction: String,
}

impl PendingEdit {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// History generation captured when the edit started.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn base(&self) -> ImageId {
        self.base
    }

    /// Trimmed instruction; also the label of the resulting image.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

/// How a finished backend call was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The result was appended and is now the current image.
    Committed(ImageRef),
    /// The workspace was reset or the edit cancelled while it was in flight.
    /// The result was dropped and nothing changed.
    Abandoned,
}

#[derive(Debug, Clone, Default)]
pub struct EditSession {
    status: SessionStatus,
    last_error: Option<String>,
    in_flight: Option<u64>,
    next_run_id: u64,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Human-readable description of the last failure. Only set while Failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    /// Validate an edit request and move to Running.
    ///
    /// `base` must be the current head of `history`. Nothing is changed when the
    /// request is rejected.
    pub fn begin(
        &mut self,
        history: &HistoryStore,
        base: &ImageRef,
        instruction: &str,
    ) -> Result<PendingEdit, EditError> {
        if self.is_running() {
            warn!(
                in_flight = ?self.in_flight,
                "edit requested while another edit is running"
            );
            return Err(EditError::Busy);
        }

        let instruction = instruction.trim();
        if instruction.is_empty() {
            debug!("rejecting empty edit instruction");
            return Err(EditError::EmptyInstruction);
        }

        if history.is_empty() {
            warn!(base = %base.id(), "edit requested with no image loaded");
            return Err(EditError::NoBaseImage);
        }

        if history.current().map(ImageRef::id) != Some(base.id()) {
            warn!(
                base = %base.id(),
                current = ?history.current().map(ImageRef::id),
                "edit requested for an image that is not the current version"
            );
            return Err(EditError::BaseNotCurrent);
        }

        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let pending = PendingEdit {
            run_id,
            generation: history.generation(),
            base: base.id(),
            instruction: instruction.to_string(),
        };

        self.status = SessionStatus::Running;
        self.last_error = None;
        self.in_flight = Some(run_id);

        info!(
            run_id,
            base = %pending.base,
            generation = pending.generation,
            instruction = %pending.instruction,
            "edit started"
        );

        Ok(pending)
    }

    /// Resolve a backend result against the history.
    pub fn finish(
        &mut self,
        history: &mut HistoryStore,
        pending: PendingEdit,
        result: Result<ImageContent, BackendError>,
    ) -> Result<EditOutcome, EditError> {
        if self.in_flight != Some(pending.run_id) {
            debug!(
                run_id = pending.run_id,
                ok = result.is_ok(),
                "dropping result of abandoned edit"
            );
            return Ok(EditOutcome::Abandoned);
        }
        self.in_flight = None;

        let content = match result {
            Ok(content) => content,
            Err(err) => return Err(self.fail(pending.run_id, EditError::Backend(err))),
        };

        if history.generation() != pending.generation {
            return Err(self.fail(pending.run_id, EditError::Stale));
        }

        let image = ImageRef::new(content, pending.instruction);
        if let Err(err) = history.append(image.clone()) {
            return Err(self.fail(pending.run_id, err.into()));
        }

        self.status = SessionStatus::Idle;
        info!(
            run_id = pending.run_id,
            image_id = %image.id(),
            depth = history.size(),
            "edit committed"
        );

        Ok(EditOutcome::Committed(image))
    }

    /// Failed -> Idle. No-op in any other state.
    pub fn clear_error(&mut self) {
        if self.status == SessionStatus::Failed {
            self.status = SessionStatus::Idle;
            self.last_error = None;
        }
    }

    /// Forget the in-flight edit, if any, and return to Idle.
    ///
    /// The backend call keeps running; its result is dropped by `finish`.
    pub fn abandon(&mut self) {
        if let Some(run_id) = self.in_flight.take() {
            info!(run_id, "abandoning in-flight edit");
        }
        self.status = SessionStatus::Idle;
        self.last_error = None;
    }

    /// Abandon only if `run_id` is still the edit in flight.
    pub fn abandon_run(&mut self, run_id: u64) -> bool {
        if self.in_flight != Some(run_id) {
            return false;
        }
        self.abandon();
        true
    }

    fn fail(&mut self, run_id: u64, err: EditError) -> EditError {
        warn!(run_id, error = %err, "edit failed");
        self.status = SessionStatus::Failed;
        self.last_error = Some(err.to_string());
        err
    }
}

/// Edit request errors.
///
/// `EmptyInstruction`, `NoBaseImage`, `Busy` and `BaseNotCurrent` are rejections:
/// the session and history are untouched. `Backend` and `Stale` leave the session
/// Failed with the history untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("edit instruction is empty")]
    EmptyInstruction,

    #[error("no image loaded")]
    NoBaseImage,

    #[error("an edit is already running")]
    Busy,

    #[error("only the current image can be edited")]
    BaseNotCurrent,

    #[error("the history changed while the edit was running")]
    Stale,

    #[error("failed to edit image: {0}")]
    Backend(#[from] BackendError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

impl EditError {
    /// True for errors raised before the backend was contacted.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EditError::EmptyInstruction
                | EditError::NoBaseImage
                | EditError::Busy
                | EditError::BaseNotCurrent
        )
    }
}
