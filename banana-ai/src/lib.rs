//! banana-ai: Gemini image editing backend.
//!
//! Takes the current image plus the user's instruction, sends both to a Gemini image
//! model and hands back whatever image the model produced. Everything that can go
//! wrong on the way is folded into a `BackendError` category; retrying is the
//! user's call.

pub mod config;
pub mod gemini;
pub mod wire;

pub use config::{ConfigError, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use gemini::{AiError, GeminiBackend};
