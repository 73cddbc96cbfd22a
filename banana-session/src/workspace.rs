//! The editor workspace: history + edit session + backend, behind one handle.
//!
//! This is the surface a presentation layer talks to. Handles are cheap to clone and
//! can be shared between the task awaiting an edit and the UI task that may reset or
//! rewind in the meantime. The state lock is never held across the backend call.

use banana_core::{HistoryError, HistoryStore, ImageContent, ImageId, ImageRef};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::backend::EditBackend;
use crate::session::{EditError, EditOutcome, EditSession, PendingEdit, SessionStatus};
use crate::view::WorkspaceView;

#[derive(Debug, Default)]
struct State {
    history: HistoryStore,
    session: EditSession,
}

struct Inner<B> {
    backend: B,
    state: Mutex<State>,
    view: watch::Sender<WorkspaceView>,
}

pub struct Workspace<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for Workspace<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: EditBackend> Workspace<B> {
    /// Create an empty workspace ("no image loaded") around `backend`.
    pub fn new(backend: B) -> Self {
        let (view, _) = watch::channel(WorkspaceView::default());
        Self {
            inner: Arc::new(Inner {
                backend,
                state: Mutex::new(State::default()),
                view,
            }),
        }
    }

    /// Start over from a freshly loaded image. Any edit in flight is abandoned.
    pub fn load_image(&self, content: ImageContent) -> ImageRef {
        let image = ImageRef::original(content);
        let mut state = self.inner.state.lock();
        state.session.abandon();
        state.history.reset(Some(image.clone()));
        publish(&self.inner.view, &state);

        info!(image_id = %image.id(), bytes = image.content().len(), "image loaded");
        image
    }

    /// Drop everything and go back to "no image loaded".
    pub fn clear_workspace(&self) {
        let mut state = self.inner.state.lock();
        state.session.abandon();
        state.history.reset(None);
        publish(&self.inner.view, &state);
    }

    /// Edit the current image.
    ///
    /// The base is read under the same lock that starts the edit, so a concurrent
    /// load or rewind cannot slip in between.
    pub async fn request_edit(&self, instruction: &str) -> Result<EditOutcome, EditError> {
        let (base, pending) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let base = state
                .history
                .current()
                .cloned()
                .ok_or(EditError::NoBaseImage)?;
            let pending = state.session.begin(&state.history, &base, instruction)?;
            publish(&self.inner.view, state);
            (base, pending)
        };
        self.complete(base, pending).await
    }

    /// Run one edit of `base`, which must be the current image.
    ///
    /// Rejections (busy, empty instruction, nothing loaded, `base` no longer
    /// current) return before the backend is contacted. On success the result
    /// becomes the current image. Backend failures and results that arrive after a
    /// rewind leave the history untouched and the session Failed. If the workspace
    /// was reset or the edit cancelled in the meantime, the result is dropped and
    /// `EditOutcome::Abandoned` returned.
    ///
    /// Dropping the returned future abandons the edit.
    pub async fn run(&self, base: ImageRef, instruction: &str) -> Result<EditOutcome, EditError> {
        let pending = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let pending = state.session.begin(&state.history, &base, instruction)?;
            publish(&self.inner.view, state);
            pending
        };
        self.complete(base, pending).await
    }

    // Await the backend for a started edit and resolve its result.
    async fn complete(
        &self,
        base: ImageRef,
        pending: PendingEdit,
    ) -> Result<EditOutcome, EditError> {
        let mut in_flight = InFlight {
            state: &self.inner.state,
            view: &self.inner.view,
            run_id: pending.run_id(),
            armed: true,
        };

        debug!(
            backend = self.inner.backend.name(),
            run_id = pending.run_id(),
            base = %pending.base(),
            "calling edit backend"
        );
        let started = Instant::now();
        let result = self
            .inner
            .backend
            .transform(base.content(), pending.instruction())
            .await;
        debug!(
            run_id = pending.run_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "edit backend returned"
        );

        in_flight.armed = false;
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let outcome = state.session.finish(&mut state.history, pending, result);
        if !matches!(outcome, Ok(EditOutcome::Abandoned)) {
            publish(&self.inner.view, state);
        }
        outcome
    }

    /// Make `id` the current image, discarding every newer version.
    pub fn rewind_to(&self, id: ImageId) -> Result<(), HistoryError> {
        let mut state = self.inner.state.lock();
        state.history.move_to(id)?;
        publish(&self.inner.view, &state);
        Ok(())
    }

    /// Step back one version, discarding the current one.
    pub fn undo(&self) -> Result<(), HistoryError> {
        let mut state = self.inner.state.lock();
        state.history.undo()?;
        publish(&self.inner.view, &state);
        Ok(())
    }

    /// Dismiss a failure and go back to Idle.
    pub fn clear_error(&self) {
        let mut state = self.inner.state.lock();
        if state.session.status() == SessionStatus::Failed {
            state.session.clear_error();
            publish(&self.inner.view, &state);
        }
    }

    /// Stop waiting for the edit in flight. Returns false if nothing was running.
    pub fn cancel_edit(&self) -> bool {
        let mut state = self.inner.state.lock();
        if !state.session.is_running() {
            return false;
        }
        state.session.abandon();
        publish(&self.inner.view, &state);
        true
    }

    pub fn current(&self) -> Option<ImageRef> {
        self.inner.state.lock().history.current().cloned()
    }

    /// All versions, most recent first.
    pub fn entries(&self) -> Vec<ImageRef> {
        self.inner.state.lock().history.entries().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().history.size()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().history.is_empty()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.lock().session.status()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .session
            .last_error()
            .map(str::to_string)
    }

    pub fn snapshot(&self) -> WorkspaceView {
        let state = self.inner.state.lock();
        WorkspaceView::capture(&state.history, &state.session)
    }

    /// Receive a fresh [`WorkspaceView`] after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<WorkspaceView> {
        self.inner.view.subscribe()
    }
}

fn publish(view: &watch::Sender<WorkspaceView>, state: &State) {
    view.send_replace(WorkspaceView::capture(&state.history, &state.session));
}

// Abandons the run if the edit future is dropped while awaiting the backend.
struct InFlight<'a> {
    state: &'a Mutex<State>,
    view: &'a watch::Sender<WorkspaceView>,
    run_id: u64,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        if state.session.abandon_run(self.run_id) {
            debug!(run_id = self.run_id, "edit future dropped before completion");
            publish(self.view, &state);
        }
    }
}
