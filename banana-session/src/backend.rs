//! The image transformation capability consumed by edit sessions.

use async_trait::async_trait;
use banana_core::ImageContent;
use std::sync::Arc;
use thiserror::Error;

/// Turns an image plus an instruction into a new image.
///
/// Implementations embed their own timeouts and transport; every failure is reported
/// as a [`BackendError`] and the caller decides what to do with it. The core never
/// retries.
#[async_trait]
pub trait EditBackend: Send + Sync {
    async fn transform(
        &self,
        image: &ImageContent,
        instruction: &str,
    ) -> Result<ImageContent, BackendError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl<B: EditBackend + ?Sized> EditBackend for Arc<B> {
    async fn transform(
        &self,
        image: &ImageContent,
        instruction: &str,
    ) -> Result<ImageContent, BackendError> {
        (**self).transform(image, instruction).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<B: EditBackend + ?Sized> EditBackend for Box<B> {
    async fn transform(
        &self,
        image: &ImageContent,
        instruction: &str,
    ) -> Result<ImageContent, BackendError> {
        (**self).transform(image, instruction).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Why a backend call produced no image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request blocked: {reason}")]
    Blocked { reason: String },

    #[error("no image in response{}", detail_suffix(.detail))]
    NoImage { detail: Option<String> },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Stable category name, used in logs and rendered views.
    pub fn category(&self) -> &'static str {
        match self {
            BackendError::Network(_) => "network",
            BackendError::Timeout => "timeout",
            BackendError::Api { .. } => "api",
            BackendError::Blocked { .. } => "blocked",
            BackendError::NoImage { .. } => "no_image",
            BackendError::MalformedResponse(_) => "malformed_response",
            BackendError::Cancelled => "cancelled",
            BackendError::Other(_) => "other",
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}
