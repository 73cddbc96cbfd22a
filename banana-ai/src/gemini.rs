//! Gemini-backed [`EditBackend`].

use async_trait::async_trait;
use banana_core::ImageContent;
use banana_session::{BackendError, EditBackend};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, GeminiConfig};
use crate::wire::{error_message, GenerateContentRequest, GenerateContentResponse};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiBackend {
    client: reqwest::Client,
    config: GeminiConfig,
    endpoint: String,
}

impl GeminiBackend {
    /// Validate `config` and build the HTTP client.
    pub fn new(config: GeminiConfig) -> Result<Self, AiError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(config.api_key.trim())
            .map_err(|_| AiError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(AiError::Client)?;

        let endpoint = config.endpoint();
        info!(model = %config.model, endpoint = %endpoint, "gemini backend ready");

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Build from environment variables only.
    pub fn from_env() -> Result<Self, AiError> {
        Self::new(GeminiConfig::from_env())
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl EditBackend for GeminiBackend {
    async fn transform(
        &self,
        image: &ImageContent,
        instruction: &str,
    ) -> Result<ImageContent, BackendError> {
        let started = Instant::now();
        let request = GenerateContentRequest::edit(image, instruction);

        debug!(
            model = %self.config.model,
            input_bytes = image.len(),
            mime_type = image.mime_type(),
            "sending edit request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), message = %message, "gemini returned an error");
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::malformed(format!("response body: {e}")))?;
        let result = parsed.into_image();

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(output) => info!(
                model = %self.config.model,
                elapsed_ms,
                output_bytes = output.len(),
                "gemini edit finished"
            ),
            Err(e) => warn!(
                model = %self.config.model,
                elapsed_ms,
                category = e.category(),
                error = %e,
                "gemini edit produced no image"
            ),
        }

        result
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

fn transport_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_decode() {
        BackendError::malformed(e.to_string())
    } else {
        BackendError::network(e.to_string())
    }
}

/// Errors setting up the backend.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
