//! Testing utilities including mock implementations.
//!
//! These are useful for exercising the collector and the digest pipeline
//! without making real forum requests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::fetcher::PageSource;

/// Mock page source for testing.
///
/// Serves canned HTML by exact URL. URLs registered with
/// [`fail_with`](Self::fail_with) answer with that status; unknown URLs
/// answer 404. Every call is recorded.
///
/// # Example
///
/// ```rust
/// use thread_digest::testing::MockPageSource;
///
/// let mock = MockPageSource::new()
///     .with_page("https://www.mobile01.com/topicdetail.php?t=1&p=2", "<html></html>");
/// mock.fail_with("https://www.mobile01.com/topicdetail.php?t=1&p=3", 500);
/// ```
#[derive(Default)]
pub struct MockPageSource {
    pages: Arc<RwLock<HashMap<String, String>>>,
    failures: Arc<RwLock<HashMap<String, u16>>>,
    fetch_calls: Arc<RwLock<Vec<String>>>,
}

impl MockPageSource {
    /// Create a new empty mock page source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn add_page(&self, url: &str, html: impl Into<String>) {
        self.pages.write().unwrap().insert(url.to_string(), html.into());
    }

    /// Builder form of [`add_page`](Self::add_page).
    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.add_page(url, html);
        self
    }

    /// Answer `url` with a non-success status.
    pub fn fail_with(&self, url: &str, status: u16) {
        self.failures.write().unwrap().insert(url.to_string(), status);
    }

    /// Number of fetches made so far.
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.read().unwrap().len()
    }

    /// URLs fetched so far, in call order.
    pub fn fetch_calls(&self) -> Vec<String> {
        self.fetch_calls.read().unwrap().clone()
    }
}

impl Clone for MockPageSource {
    fn clone(&self) -> Self {
        Self {
            pages: Arc::clone(&self.pages),
            failures: Arc::clone(&self.failures),
            fetch_calls: Arc::clone(&self.fetch_calls),
        }
    }
}

#[async_trait]
impl PageSource for MockPageSource {
    async fn fetch_page(&self, url: &Url) -> FetchResult<String> {
        let key = url.to_string();
        self.fetch_calls.write().unwrap().push(key.clone());

        if let Some(status) = self.failures.read().unwrap().get(&key) {
            return Err(FetchError::Status {
                status: *status,
                url: key,
            });
        }

        self.pages
            .read()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or(FetchError::Status {
                status: 404,
                url: key,
            })
    }
}

/// Minimal thread page in the forum's markup.
///
/// Each post becomes a `.single-post-content` block; the pager links to
/// pages `1..=total_pages` with `p` query parameters.
pub fn forum_page(title: &str, total_pages: u32, posts: &[&str]) -> String {
    let pager: String = (1..=total_pages)
        .map(|n| format!(r#"<a href="?f=397&amp;t=100&amp;p={n}">{n}</a>"#))
        .collect();
    let body: String = posts
        .iter()
        .map(|post| {
            format!(
                r#"<div class="l-reply"><div class="l-reply__meta">#1 reply</div><div class="single-post-content">{post}</div></div>"#
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html><html><head><title>{title}</title></head><body><nav class="l-pagination">{pager}</nav><main>{body}</main></body></html>"#
    )
}
