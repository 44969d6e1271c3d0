//! The user-triggered digest action: check, collect, summarize.

use openai_client::OpenAIClient;
use scraper::Html;
use std::fmt;
use tracing::info;
use url::Url;

use crate::collector::{CollectorLimits, ThreadCollector, ThreadSnapshot, MAX_PAGES};
use crate::config::DEFAULT_FORUM_HOST;
use crate::error::{DigestError, PreconditionError, Result};
use crate::fetcher::{page_url, PageSource};
use crate::settings::Settings;
use crate::summarize::{summarize_thread, SummaryRequest};

/// A finished digest: the collected thread and its summary.
#[derive(Debug, Clone)]
pub struct DigestReport {
    pub snapshot: ThreadSnapshot,
    pub summary: String,
}

impl DigestReport {
    /// Title, page coverage and post count, one per line.
    pub fn header(&self) -> String {
        let snapshot = &self.snapshot;
        format!(
            "Title: {}\nPages: {}/{}{}\nPosts: {}\n",
            snapshot.title,
            snapshot.scanned_pages,
            snapshot.total_pages,
            if snapshot.truncated { " (truncated)" } else { "" },
            snapshot.posts.len(),
        )
    }
}

impl fmt::Display for DigestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.header(), self.summary)
    }
}

/// Milestones reported while a digest runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Preconditions passed; page collection is starting
    Collecting,
    /// Collection finished; the summary request is about to be sent
    Summarizing {
        posts: usize,
        scanned_pages: u32,
        total_pages: u32,
    },
}

/// Collects a forum thread and summarizes it.
pub struct ThreadDigest<S> {
    collector: ThreadCollector<S>,
    client: OpenAIClient,
    forum_host: String,
    page_budget: u32,
}

impl<S: PageSource> ThreadDigest<S> {
    pub fn new(source: S, client: OpenAIClient) -> Self {
        Self {
            collector: ThreadCollector::new(source),
            client,
            forum_host: DEFAULT_FORUM_HOST.to_string(),
            page_budget: MAX_PAGES,
        }
    }

    /// Only threads on `host` are accepted.
    pub fn with_forum_host(mut self, host: impl Into<String>) -> Self {
        self.forum_host = host.into().to_ascii_lowercase();
        self
    }

    pub fn with_page_budget(mut self, pages: u32) -> Self {
        self.page_budget = pages;
        self
    }

    pub fn with_limits(mut self, limits: CollectorLimits) -> Self {
        self.collector = self.collector.with_limits(limits);
        self
    }

    /// Parse `target` and check it points at the forum host.
    pub fn check_target(&self, target: &str) -> Result<Url> {
        let url = Url::parse(target.trim()).map_err(|_| PreconditionError::InvalidUrl {
            url: target.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(PreconditionError::InvalidUrl {
                url: target.to_string(),
            }
            .into());
        }

        let host = url.host_str().unwrap_or_default();
        if host != self.forum_host {
            return Err(PreconditionError::WrongHost {
                expected: self.forum_host.clone(),
                actual: host.to_string(),
            }
            .into());
        }

        Ok(url)
    }

    /// Collect the thread at `target` without summarizing.
    ///
    /// `first_page_html` stands in for page 1 when the caller already has
    /// it; otherwise page 1 is fetched and a failure there is fatal.
    pub async fn collect_only(
        &self,
        target: &str,
        first_page_html: Option<String>,
    ) -> Result<ThreadSnapshot> {
        let url = self.check_target(target)?;

        let html = match first_page_html {
            Some(html) => html,
            None => self
                .collector
                .source()
                .fetch_page(&page_url(&url, 1))
                .await
                .map_err(|e| DigestError::Network(e.to_string()))?,
        };

        let document = Html::parse_document(&html);
        let snapshot = self
            .collector
            .collect(&url, &document, self.page_budget)
            .await;

        if snapshot.posts.is_empty() {
            return Err(PreconditionError::NoPosts.into());
        }

        Ok(snapshot)
    }

    /// Collect the thread at `target` and summarize it with `settings`.
    pub async fn run(
        &self,
        target: &str,
        first_page_html: Option<String>,
        settings: &Settings,
    ) -> Result<DigestReport> {
        self.run_with_progress(target, first_page_html, settings, |_| {})
            .await
    }

    /// [`run`](Self::run), reporting each milestone to `on_progress`.
    pub async fn run_with_progress<F>(
        &self,
        target: &str,
        first_page_html: Option<String>,
        settings: &Settings,
        mut on_progress: F,
    ) -> Result<DigestReport>
    where
        F: FnMut(Progress),
    {
        if !settings.has_api_key() {
            return Err(PreconditionError::MissingApiKey.into());
        }

        on_progress(Progress::Collecting);
        let snapshot = self.collect_only(target, first_page_html).await?;

        on_progress(Progress::Summarizing {
            posts: snapshot.posts.len(),
            scanned_pages: snapshot.scanned_pages,
            total_pages: snapshot.total_pages,
        });
        self.summarize(snapshot, settings).await
    }

    /// Summarize an already collected thread.
    pub async fn summarize(
        &self,
        snapshot: ThreadSnapshot,
        settings: &Settings,
    ) -> Result<DigestReport> {
        info!(
            posts = snapshot.posts.len(),
            scanned_pages = snapshot.scanned_pages,
            total_pages = snapshot.total_pages,
            truncated = snapshot.truncated,
            "Generating summary"
        );

        let request = SummaryRequest {
            api_key: settings.api_key().to_string(),
            model: settings.model.clone(),
            prompt_template: Some(settings.prompt_template.clone()),
            thread: snapshot,
        };
        let summary = summarize_thread(&self.client, &request).await?;

        Ok(DigestReport {
            snapshot: request.thread,
            summary,
        })
    }
}
