//! Thread summarization through the OpenAI Responses API.

use openai_client::{InputMessage, OpenAIClient, ResponsesRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collector::ThreadSnapshot;
use crate::error::{DigestError, PreconditionError, Result};
use crate::prompt::{join_posts, render};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Models offered as presets; any other id is a custom model.
pub const KNOWN_MODELS: [&str; 5] = ["gpt-4.1-mini", "gpt-4.1", "gpt-4.1-nano", "gpt-4o-mini", "gpt-4o"];

pub const TEMPERATURE: f32 = 0.2;
pub const MAX_OUTPUT_TOKENS: u32 = 900;

/// System instruction: stay faithful, flag and exclude suspected shill content.
pub const SYSTEM_INSTRUCTION: &str = "請忠於使用者提供內容，不要捏造不存在的結論；若內容疑似網軍或行銷廣告，請標示為可疑並從最終建議排除。";

/// Everything needed to summarize one collected thread.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub api_key: String,
    pub model: String,
    /// Blank or absent falls back to the default template
    pub prompt_template: Option<String>,
    pub thread: ThreadSnapshot,
}

/// Outcome of a summarize action, as reported to the user interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SummaryResult {
    pub fn success(summary: impl Into<String>) -> Self {
        Self {
            ok: true,
            summary: Some(summary.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            summary: None,
            error: Some(error.into()),
        }
    }
}

impl<E: std::fmt::Display> From<std::result::Result<String, E>> for SummaryResult {
    fn from(outcome: std::result::Result<String, E>) -> Self {
        match outcome {
            Ok(summary) => Self::success(summary),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// Model id to send: `model` trimmed, or the default when blank.
pub fn resolve_model(model: &str) -> &str {
    let model = model.trim();
    if model.is_empty() {
        DEFAULT_MODEL
    } else {
        model
    }
}

/// Send a rendered prompt and return the summary text.
pub async fn summarize(
    client: &OpenAIClient,
    api_key: &str,
    model: &str,
    rendered_prompt: &str,
) -> Result<String> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(PreconditionError::MissingApiKey.into());
    }

    let model = resolve_model(model);
    let request = ResponsesRequest::new(model)
        .message(InputMessage::system(SYSTEM_INSTRUCTION))
        .message(InputMessage::user(rendered_prompt))
        .temperature(TEMPERATURE)
        .max_output_tokens(MAX_OUTPUT_TOKENS);

    info!(model, prompt_chars = rendered_prompt.chars().count(), "Requesting summary");

    let response = client
        .with_api_key(api_key)
        .create_response(request)
        .await
        .map_err(DigestError::from)?;

    if let Some(usage) = &response.usage {
        info!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Summary received"
        );
    }

    Ok(response.text)
}

/// Render the thread into a prompt and summarize it.
pub async fn summarize_thread(client: &OpenAIClient, request: &SummaryRequest) -> Result<String> {
    if request.api_key.trim().is_empty() {
        return Err(PreconditionError::MissingApiKey.into());
    }
    if request.thread.posts.is_empty() {
        return Err(PreconditionError::NoPosts.into());
    }

    let joined = join_posts(&request.thread.posts);
    let prompt = render(
        request.prompt_template.as_deref().unwrap_or_default(),
        &request.thread,
        &joined,
    );

    summarize(client, &request.api_key, &request.model, &prompt).await
}
