use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

use crate::collector::MAX_PAGES;

/// Forum host the digest is allowed to run against.
pub const DEFAULT_FORUM_HOST: &str = "www.mobile01.com";

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub forum_host: String,
    pub max_pages: u32,
    pub settings_path: Option<PathBuf>,
    pub forum_cookie: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            forum_host: DEFAULT_FORUM_HOST.to_string(),
            max_pages: MAX_PAGES,
            settings_path: None,
            forum_cookie: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_base_url: non_empty_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            forum_host: non_empty_var("THREAD_DIGEST_HOST")
                .unwrap_or_else(|| DEFAULT_FORUM_HOST.to_string()),
            max_pages: env::var("THREAD_DIGEST_MAX_PAGES")
                .unwrap_or_else(|_| MAX_PAGES.to_string())
                .parse()
                .context("THREAD_DIGEST_MAX_PAGES must be a valid number")?,
            settings_path: non_empty_var("THREAD_DIGEST_SETTINGS").map(PathBuf::from),
            forum_cookie: non_empty_var("THREAD_DIGEST_COOKIE"),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.forum_host, "www.mobile01.com");
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.max_pages, 50);
        assert!(config.openai_api_key.is_none());
    }
}
