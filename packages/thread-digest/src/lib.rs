//! Forum Thread Digest
//!
//! Scrapes a multi-page forum discussion, packs the posts into a bounded
//! payload and asks an LLM for a summary that sets aside suspected shill and
//! promotional posts.
//!
//! # Usage
//!
//! ```rust,ignore
//! use thread_digest::{HttpPageSource, Settings, ThreadDigest};
//! use openai_client::OpenAIClient;
//!
//! let forum = url::Url::parse("https://www.mobile01.com/")?;
//! let digest = ThreadDigest::new(HttpPageSource::new(None, &forum)?, OpenAIClient::new(""));
//! let settings = Settings::new("sk-...", "gpt-4.1-mini", "");
//!
//! let report = digest
//!     .run("https://www.mobile01.com/topicdetail.php?f=397&t=6543210", None, &settings)
//!     .await?;
//! println!("{report}");
//! ```
//!
//! # Modules
//!
//! - [`fetcher`] - Page URL derivation and HTML retrieval
//! - [`extractor`] - Priority-ordered post extraction strategies
//! - [`collector`] - Bounded sequential page sweep
//! - [`prompt`] - Placeholder templating
//! - [`summarize`] - Summary request to the Responses API
//! - [`settings`] - Key-value settings persistence
//! - [`digest`] - The end-to-end action
//! - [`testing`] - Mock implementations for testing

pub mod collector;
pub mod config;
pub mod digest;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod prompt;
pub mod settings;
pub mod summarize;
pub mod testing;

pub use collector::{detect_total_pages, CollectorLimits, ThreadCollector, ThreadSnapshot, MAX_PAGES};
pub use config::Config;
pub use digest::{DigestReport, Progress, ThreadDigest};
pub use error::{DigestError, FetchError, PreconditionError, Result, SettingsError};
pub use extractor::{ExtractionStrategy, PostExtractor, RegionStrategy, SelectorStrategy};
pub use fetcher::{page_url, HttpPageSource, PageSource};
pub use prompt::{join_posts, render, DEFAULT_PROMPT_TEMPLATE};
pub use settings::{FileSettingsStore, MemorySettingsStore, Settings, SettingsStore};
pub use summarize::{summarize, summarize_thread, SummaryRequest, SummaryResult, DEFAULT_MODEL};
pub use testing::MockPageSource;
