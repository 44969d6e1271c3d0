//! OpenAI Responses API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Request
// =============================================================================

/// Responses API request (`POST /responses`).
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    /// Model to use (e.g., "gpt-4.1-mini", "gpt-4o")
    pub model: String,

    /// Input messages, each made of typed content blocks
    pub input: Vec<InputMessage>,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl ResponsesRequest {
    /// Create a new request with the given model and no input.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: Vec::new(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Add an input message.
    pub fn message(mut self, message: InputMessage) -> Self {
        self.input.push(message);
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token ceiling.
    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// Input message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputMessage {
    /// Role: "system", "user", "assistant"
    pub role: String,

    /// Content blocks
    pub content: Vec<InputContent>,
}

impl InputMessage {
    /// Create a system message with a single text block.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: vec![InputContent::text(text)],
        }
    }

    /// Create a user message with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: vec![InputContent::text(text)],
        }
    }
}

/// Typed input content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputContent {
    InputText { text: String },
}

impl InputContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::InputText { text: text.into() }
    }
}

// =============================================================================
// Response
// =============================================================================

/// Text extracted from a Responses API reply.
#[derive(Debug, Clone)]
pub struct ResponseText {
    /// Response id, when the API returned one
    pub id: Option<String>,

    /// Extracted plain text (see [`extract_output_text`])
    pub text: String,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the input
    pub input_tokens: u32,

    /// Tokens generated
    pub output_tokens: u32,

    /// Total tokens used
    pub total_tokens: u32,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: Option<String>,
}

/// Pull plain text out of a Responses API body.
///
/// Prefers the top-level `output_text` convenience field when it holds
/// non-blank text. Otherwise walks `output[].content[].text` in order,
/// keeping every non-blank fragment (trimmed) and joining them with a blank
/// line. Returns `None` when neither yields anything.
pub fn extract_output_text(body: &Value) -> Option<String> {
    if let Some(text) = body.get("output_text").and_then(Value::as_str) {
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    let chunks: Vec<&str> = body
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect();

    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serializes_input_blocks() {
        let req = ResponsesRequest::new("gpt-4.1-mini")
            .message(InputMessage::system("Be faithful"))
            .message(InputMessage::user("Summarize this"))
            .temperature(0.2)
            .max_output_tokens(900);

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["input"][0]["role"], "system");
        assert_eq!(body["input"][0]["content"][0]["type"], "input_text");
        assert_eq!(body["input"][1]["content"][0]["text"], "Summarize this");
        assert_eq!(body["max_output_tokens"], 900);
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_request_omits_unset_options() {
        let body = serde_json::to_value(ResponsesRequest::new("gpt-4o")).unwrap();
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_output_tokens").is_none());
    }

    #[test]
    fn test_extract_prefers_output_text() {
        let body = json!({
            "output_text": "  Summary.  ",
            "output": [{ "content": [{ "text": "ignored" }] }]
        });
        assert_eq!(extract_output_text(&body), Some("Summary.".to_string()));
    }

    #[test]
    fn test_extract_joins_output_blocks() {
        let body = json!({ "output": [{ "content": [{ "text": "A" }, { "text": "B" }] }] });
        assert_eq!(extract_output_text(&body), Some("A\n\nB".to_string()));
    }

    #[test]
    fn test_extract_falls_through_blank_output_text() {
        let body = json!({
            "output_text": "   ",
            "output": [
                { "type": "reasoning" },
                { "content": [{ "text": "  first " }, { "text": "" }] },
                { "content": [{ "type": "refusal" }, { "text": "second" }] }
            ]
        });
        assert_eq!(
            extract_output_text(&body),
            Some("first\n\nsecond".to_string())
        );
    }

    #[test]
    fn test_extract_empty_body() {
        assert_eq!(extract_output_text(&json!({})), None);
        assert_eq!(extract_output_text(&json!({ "output_text": 42 })), None);
        assert_eq!(extract_output_text(&json!({ "output": [] })), None);
    }
}
