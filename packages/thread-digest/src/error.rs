//! Typed errors for the thread digest library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so the CLI can
//! distinguish precondition failures from transport and API failures.

use openai_client::OpenAIError;
use thiserror::Error;

/// Errors surfaced to the user action that triggered a digest.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Something required was missing before any work started
    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    /// Transport failure (forum fetch of the first page, or the summarization call)
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx status from the summarization endpoint
    #[error("OpenAI API failed: {0}")]
    Api(String),

    /// Summarization succeeded but produced no usable text
    #[error("AI returned an empty summary")]
    EmptyResult,

    /// Client configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Checks that fail before any network work is done.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("missing OpenAI API key; run `digest settings set --api-key <KEY>`")]
    MissingApiKey,

    #[error("not a thread on {expected} (got host {actual:?})")]
    WrongHost { expected: String, actual: String },

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("no posts could be extracted; make sure the URL is a thread page (the site layout may have changed)")]
    NoPosts,
}

/// Per-page fetch failures. Recovered locally by the collector.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Configured cookie is not a valid header value
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Settings store failures.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no config directory available for the settings file")]
    NoConfigDir,
}

impl From<OpenAIError> for DigestError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Network(msg) => DigestError::Network(msg),
            OpenAIError::Api(detail) => DigestError::Api(detail),
            OpenAIError::Parse(detail) => DigestError::Api(detail),
            OpenAIError::EmptyResponse => DigestError::EmptyResult,
            OpenAIError::Config(msg) => DigestError::Config(msg),
        }
    }
}

/// Result type alias for digest operations.
pub type Result<T> = std::result::Result<T, DigestError>;

/// Result type alias for page fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for settings operations.
pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_error_mapping() {
        assert!(matches!(
            DigestError::from(OpenAIError::Network("refused".into())),
            DigestError::Network(_)
        ));
        assert!(matches!(
            DigestError::from(OpenAIError::EmptyResponse),
            DigestError::EmptyResult
        ));

        let api = DigestError::from(OpenAIError::Api("HTTP 500".into()));
        assert_eq!(api.to_string(), "OpenAI API failed: HTTP 500");
    }

    #[test]
    fn test_precondition_message_passes_through() {
        let err = DigestError::from(PreconditionError::WrongHost {
            expected: "www.mobile01.com".into(),
            actual: "example.com".into(),
        });
        assert!(err.to_string().starts_with("not a thread on www.mobile01.com"));
    }
}
