//! Scripted backend for tests and offline runs.

use async_trait::async_trait;
use banana_core::ImageContent;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::backend::{BackendError, EditBackend};

/// A scripted response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Image(ImageContent),
    Error(BackendError),
}

/// Backend that replays queued responses.
///
/// With an empty queue it "edits" by appending the instruction bytes to the input,
/// which keeps results distinct without any scripting. A gated mock holds every call
/// until [`MockBackend::release`] is called, so tests can act while an edit is in
/// flight.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    instructions: Arc<Mutex<Vec<String>>>,
    call_count: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose calls block until released.
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn expect_image(&self, content: ImageContent) {
        self.responses.lock().push_back(MockResponse::Image(content));
    }

    pub fn expect_error(&self, error: BackendError) {
        self.responses.lock().push_back(MockResponse::Error(error));
    }

    /// Let one held call proceed. No-op for ungated mocks.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Number of times `transform` was entered.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Instructions received so far, in call order.
    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().clone()
    }

    /// Yield until `transform` has been entered `calls` times.
    pub async fn wait_for_calls(&self, calls: usize) {
        while self.call_count() < calls {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl EditBackend for MockBackend {
    async fn transform(
        &self,
        image: &ImageContent,
        instruction: &str,
    ) -> Result<ImageContent, BackendError> {
        self.instructions.lock().push(instruction.to_string());
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|_| BackendError::Cancelled)?;
            permit.forget();
        }

        let scripted = self.responses.lock().pop_front();
        match scripted {
            Some(MockResponse::Image(content)) => Ok(content),
            Some(MockResponse::Error(err)) => Err(err),
            None => {
                let mut bytes = image.as_bytes().to_vec();
                bytes.extend_from_slice(instruction.as_bytes());
                Ok(ImageContent::new(image.mime_type(), bytes))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
