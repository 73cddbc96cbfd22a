// Wire format for the Gemini generateContent endpoint.
// Only the fields we read or write are modelled; unknown response fields are ignored.

use banana_core::ImageContent;
use banana_session::BackendError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Content,
}

impl GenerateContentRequest {
    /// Image first, then the instruction, in a single user turn.
    pub fn edit(image: &ImageContent, instruction: &str) -> Self {
        Self {
            contents: Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: image.mime_type().to_string(),
                            data: image.to_base64(),
                        }),
                        ..Default::default()
                    },
                    Part {
                        text: Some(instruction.to_string()),
                        ..Default::default()
                    },
                ],
            },
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl GenerateContentResponse {
    /// The first image of the first candidate.
    pub fn into_image(self) -> Result<ImageContent, BackendError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(BackendError::Blocked { reason });
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(BackendError::NoImage { detail: None });
        };
        let finish_reason = candidate.finish_reason;
        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

        let mut text = Vec::new();
        for part in parts {
            if let Some(inline) = part.inline_data {
                if inline.data.is_empty() {
                    continue;
                }
                return ImageContent::from_base64(inline.mime_type, &inline.data)
                    .map_err(|e| BackendError::malformed(e.to_string()));
            }
            if let Some(t) = part.text {
                text.push(t);
            }
        }

        let detail = if text.is_empty() {
            finish_reason.map(|r| format!("finish reason {r}"))
        } else {
            Some(text.join(" "))
        };
        Err(BackendError::NoImage { detail })
    }
}

/// Best-effort message from an error response body.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty error body".into(),
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_shape() {
        let image = ImageContent::new("image/jpeg", vec![1, 2, 3]);
        let request = GenerateContentRequest::edit(&image, "add hat");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "contents": {
                    "parts": [
                        {"inlineData": {"mimeType": "image/jpeg", "data": "AQID"}},
                        {"text": "add hat"}
                    ]
                }
            })
        );
    }

    #[test]
    fn test_picks_first_inline_image() {
        let response = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "image/png", "data": "AQID"}},
                    {"inlineData": {"mimeType": "image/png", "data": "BAUG"}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"totalTokenCount": 42}
        }));

        let image = response.into_image().unwrap();
        assert_eq!(image.as_bytes(), &[1, 2, 3]);
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn test_text_only_reply_is_no_image() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "I can't do that."}]}}]
        }));

        assert_eq!(
            response.into_image(),
            Err(BackendError::NoImage {
                detail: Some("I can't do that.".into())
            })
        );
    }

    #[test]
    fn test_missing_candidates_or_parts() {
        assert_eq!(
            parse(json!({})).into_image(),
            Err(BackendError::NoImage { detail: None })
        );
        assert_eq!(
            parse(json!({"candidates": [{"finishReason": "SAFETY"}]})).into_image(),
            Err(BackendError::NoImage {
                detail: Some("finish reason SAFETY".into())
            })
        );
    }

    #[test]
    fn test_blocked_prompt() {
        let response = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert_eq!(
            response.into_image(),
            Err(BackendError::Blocked {
                reason: "SAFETY".into()
            })
        );
    }

    #[test]
    fn test_bad_base64_is_malformed() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "%%%"}}
            ]}}]
        }));
        assert!(matches!(
            response.into_image(),
            Err(BackendError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#),
            "Quota exceeded"
        );
        assert_eq!(error_message("  "), "empty error body");
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
    }
}
