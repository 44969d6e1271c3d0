//! Pure OpenAI REST API client
//!
//! A clean, minimal client for the OpenAI Responses API with no
//! domain-specific logic.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{InputMessage, OpenAIClient, ResponsesRequest};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! let response = client.create_response(
//!     ResponsesRequest::new("gpt-4.1-mini")
//!         .message(InputMessage::system("You are a careful analyst."))
//!         .message(InputMessage::user("Summarize this thread..."))
//!         .temperature(0.2)
//!         .max_output_tokens(900),
//! ).await?;
//!
//! println!("{}", response.text);
//! ```

pub mod error;
pub mod types;

pub use error::{OpenAIError, Result};
pub use types::*;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

/// Pure OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Same client configuration with a different API key.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        Self {
            http_client: self.http_client.clone(),
            api_key: api_key.into(),
            base_url: self.base_url.clone(),
        }
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a model response.
    ///
    /// Sends one request to `/responses` and extracts plain text from the
    /// reply. A non-2xx status yields [`OpenAIError::Api`] carrying the
    /// API's `error.message` when present, else the HTTP status. A reply
    /// without usable text yields [`OpenAIError::EmptyResponse`].
    pub async fn create_response(&self, request: ResponsesRequest) -> Result<ResponseText> {
        if self.api_key.trim().is_empty() {
            return Err(OpenAIError::Config("API key is empty".into()));
        }

        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| OpenAIError::Network(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&body_text)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!(status = %status, detail = %detail, "OpenAI API error");
            return Err(OpenAIError::Api(detail));
        }

        let body: Value = serde_json::from_str(&body_text)
            .map_err(|e| OpenAIError::Parse(format!("Failed to parse response: {}", e)))?;

        let usage = body
            .get("usage")
            .cloned()
            .and_then(|u| serde_json::from_value::<Usage>(u).ok());

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            output_tokens = usage.as_ref().map(|u| u.output_tokens),
            "OpenAI response"
        );

        let text = extract_output_text(&body).ok_or(OpenAIError::EmptyResponse)?;

        Ok(ResponseText {
            id: body.get("id").and_then(Value::as_str).map(str::to_string),
            text,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAIClient::new("sk-test")
            .with_base_url("https://custom.api.com");

        assert_eq!(client.api_key, "sk-test");
        assert_eq!(client.base_url, "https://custom.api.com");
    }

    #[test]
    fn test_with_api_key_keeps_base_url() {
        let client = OpenAIClient::new("")
            .with_base_url("http://localhost:9999")
            .with_api_key("sk-other");

        assert_eq!(client.api_key(), "sk-other");
        assert_eq!(client.base_url(), "http://localhost:9999");
    }

    #[tokio::test]
    async fn test_empty_key_rejected_before_network() {
        let client = OpenAIClient::new("  ").with_base_url("http://127.0.0.1:1");
        let err = client
            .create_response(ResponsesRequest::new("gpt-4o"))
            .await
            .unwrap_err();
        assert!(matches!(err, OpenAIError::Config(_)));
    }
}
