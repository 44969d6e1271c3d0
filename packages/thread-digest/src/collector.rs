//! Bounded multi-page thread collection.
//!
//! Walks a thread's pages in ascending order, one fetch at a time, feeding
//! each document to the [`PostExtractor`] and accumulating deduplicated,
//! truncated posts until the page range or a size budget runs out.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::extractor::{clean_text, extract_title, PostExtractor};
use crate::fetcher::{page_url, PageSource};

/// Default page budget for one collection run.
pub const MAX_PAGES: u32 = 50;

/// Title used when the first page has none.
pub const DEFAULT_THREAD_TITLE: &str = "Mobile01 討論串";

lazy_static! {
    static ref PAGE_PARAM_REGEX: Regex = Regex::new(r"[?&](?:p|page)=([0-9]{1,4})\b").unwrap();
    static ref PAGE_NUMBER_REGEX: Regex = Regex::new(r"^[0-9]{1,4}$").unwrap();
}

/// Size budgets for one collection run. Lengths are in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorLimits {
    pub max_posts: usize,
    pub max_post_chars: usize,
    pub max_total_chars: usize,
}

impl Default for CollectorLimits {
    fn default() -> Self {
        Self {
            max_posts: 300,
            max_post_chars: 1000,
            max_total_chars: 120_000,
        }
    }
}

/// Aggregated result of one collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSnapshot {
    pub title: String,
    /// Detected page count, clamped to the page budget
    pub total_pages: u32,
    /// Last page reached; the page in progress when truncated
    pub scanned_pages: u32,
    pub posts: Vec<String>,
    /// A size budget stopped the sweep early
    pub truncated: bool,
}

impl ThreadSnapshot {
    /// Sum of post lengths in chars.
    pub fn total_chars(&self) -> usize {
        self.posts.iter().map(|p| p.chars().count()).sum()
    }
}

/// Highest page number referenced by the document's links (at least 1).
///
/// Considers numeric `p` / `page` query values in `href`s and links whose
/// whole text is a number.
pub fn detect_total_pages(document: &Html) -> u32 {
    let Ok(selector) = Selector::parse("a[href]") else {
        return 1;
    };

    document
        .select(&selector)
        .flat_map(|anchor| {
            let from_href = anchor
                .value()
                .attr("href")
                .and_then(|href| PAGE_PARAM_REGEX.captures(href))
                .and_then(|caps| caps[1].parse::<u32>().ok());

            let text = clean_text(&anchor.text().collect::<String>());
            let from_text = if PAGE_NUMBER_REGEX.is_match(&text) {
                text.parse::<u32>().ok()
            } else {
                None
            };

            [from_href, from_text]
        })
        .flatten()
        .max()
        .unwrap_or(1)
        .max(1)
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text,
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Push {
    Added,
    Skipped,
    BudgetExceeded,
}

/// Posts gathered so far in one run.
struct Accumulator {
    limits: CollectorLimits,
    posts: Vec<String>,
    seen: HashSet<String>,
    total_chars: usize,
}

impl Accumulator {
    fn new(limits: CollectorLimits) -> Self {
        Self {
            limits,
            posts: Vec::new(),
            seen: HashSet::new(),
            total_chars: 0,
        }
    }

    fn push(&mut self, raw: String) -> Push {
        let text = truncate_chars(raw, self.limits.max_post_chars);
        if text.is_empty() || self.seen.contains(&text) {
            return Push::Skipped;
        }

        let len = text.chars().count();
        if self.posts.len() >= self.limits.max_posts
            || self.total_chars + len > self.limits.max_total_chars
        {
            return Push::BudgetExceeded;
        }

        self.seen.insert(text.clone());
        self.posts.push(text);
        self.total_chars += len;
        Push::Added
    }
}

/// Collects a thread's posts across its pages.
pub struct ThreadCollector<S> {
    source: S,
    extractor: PostExtractor,
    limits: CollectorLimits,
}

impl<S: PageSource> ThreadCollector<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            extractor: PostExtractor::new(),
            limits: CollectorLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: CollectorLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_extractor(mut self, extractor: PostExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// The page source used for pages after the first.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Collect posts from `base_url`'s thread.
    ///
    /// `first_document` is page 1 and is not fetched again. Later pages are
    /// fetched sequentially; a page that fails to load is skipped. The sweep
    /// stops at the first post that would break a size budget, so
    /// `scanned_pages` can name a page that was only partly consumed.
    pub async fn collect(
        &self,
        base_url: &Url,
        first_document: &Html,
        page_budget: u32,
    ) -> ThreadSnapshot {
        let title = extract_title(first_document)
            .unwrap_or_else(|| DEFAULT_THREAD_TITLE.to_string());
        let detected_pages = detect_total_pages(first_document);
        let total_pages = detected_pages.min(page_budget).max(1);

        info!(
            url = %base_url,
            detected_pages,
            total_pages,
            "Collecting thread"
        );

        let mut acc = Accumulator::new(self.limits);

        for page in 1..=total_pages {
            let page_posts = if page == 1 {
                self.extractor.extract_posts(first_document)
            } else {
                let url = page_url(base_url, page);
                match self.source.fetch_page(&url).await {
                    Ok(html) => {
                        let document = Html::parse_document(&html);
                        self.extractor.extract_posts(&document)
                    }
                    Err(e) => {
                        warn!(page, url = %url, error = %e, "Skipping page that failed to load");
                        continue;
                    }
                }
            };

            debug!(page, extracted = page_posts.len(), "Page extracted");

            for raw in page_posts {
                if acc.push(raw) == Push::BudgetExceeded {
                    info!(
                        page,
                        posts = acc.posts.len(),
                        chars = acc.total_chars,
                        "Collection budget reached, truncating"
                    );
                    return ThreadSnapshot {
                        title,
                        total_pages,
                        scanned_pages: page,
                        posts: acc.posts,
                        truncated: true,
                    };
                }
            }
        }

        info!(
            pages = total_pages,
            posts = acc.posts.len(),
            chars = acc.total_chars,
            "Thread collected"
        );

        ThreadSnapshot {
            title,
            total_pages,
            scanned_pages: total_pages,
            posts: acc.posts,
            truncated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{forum_page, MockPageSource};

    const BASE: &str = "https://www.mobile01.com/topicdetail.php?f=397&t=100";

    fn base() -> Url {
        Url::parse(BASE).unwrap()
    }

    fn post(page: u32, n: u32) -> String {
        format!("Page {page} reply {n}: long enough to count as a real forum post")
    }

    fn page_posts(page: u32, count: u32) -> Vec<String> {
        (1..=count).map(|n| post(page, n)).collect()
    }

    fn page_html(pages: u32, posts: &[String]) -> String {
        let refs: Vec<&str> = posts.iter().map(String::as_str).collect();
        forum_page("Battery life thread", pages, &refs)
    }

    /// Mock serving pages 2..=pages with `per_page` posts each.
    fn thread_source(pages: u32, per_page: u32) -> MockPageSource {
        let source = MockPageSource::new();
        for page in 2..=pages {
            source.add_page(
                page_url(&base(), page).as_str(),
                page_html(pages, &page_posts(page, per_page)),
            );
        }
        source
    }

    fn first_page(pages: u32, per_page: u32) -> Html {
        Html::parse_document(&page_html(pages, &page_posts(1, per_page)))
    }

    #[test]
    fn test_detect_total_pages() {
        let html = r##"<html><body>
            <a href="?f=1&t=2&p=7">next</a>
            <a href="/topicdetail.php?t=2&page=12">last</a>
            <a href="#">15</a>
            <a href="#">12345</a>
            <a href="?p=99999">huge</a>
            <a>99</a>
        </body></html>"##;
        assert_eq!(detect_total_pages(&Html::parse_document(html)), 15);
    }

    #[test]
    fn test_detect_total_pages_defaults_to_one() {
        let html = r##"<html><body><a href="/home">Home</a><a href="#">0</a></body></html>"##;
        assert_eq!(detect_total_pages(&Html::parse_document(html)), 1);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo".to_string(), 2), "hé");
        assert_eq!(truncate_chars("abc".to_string(), 10), "abc");
        assert_eq!(truncate_chars("討論串內容".to_string(), 3), "討論串");
    }

    #[tokio::test]
    async fn test_collects_all_pages_in_order() {
        let collector = ThreadCollector::new(thread_source(3, 2));

        let snapshot = collector.collect(&base(), &first_page(3, 2), MAX_PAGES).await;

        assert_eq!(snapshot.title, "Battery life thread");
        assert_eq!(snapshot.total_pages, 3);
        assert_eq!(snapshot.scanned_pages, 3);
        assert!(!snapshot.truncated);
        assert_eq!(
            snapshot.posts,
            vec![post(1, 1), post(1, 2), post(2, 1), post(2, 2), post(3, 1), post(3, 2)]
        );
    }

    #[tokio::test]
    async fn test_failed_page_is_skipped() {
        let source = thread_source(3, 2);
        source.fail_with(page_url(&base(), 2).as_str(), 500);
        let collector = ThreadCollector::new(source);

        let snapshot = collector.collect(&base(), &first_page(3, 2), MAX_PAGES).await;

        assert_eq!(snapshot.posts, vec![post(1, 1), post(1, 2), post(3, 1), post(3, 2)]);
        assert_eq!(snapshot.scanned_pages, 3);
        assert!(!snapshot.truncated);
        assert_eq!(collector.source().fetch_call_count(), 2);
    }

    #[tokio::test]
    async fn test_page_budget_clamps_total() {
        let collector = ThreadCollector::new(thread_source(10, 2));

        let snapshot = collector.collect(&base(), &first_page(10, 2), 3).await;

        assert_eq!(snapshot.total_pages, 3);
        assert_eq!(snapshot.scanned_pages, 3);
        assert_eq!(
            collector.source().fetch_calls(),
            vec![
                page_url(&base(), 2).to_string(),
                page_url(&base(), 3).to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicates_dropped_across_pages() {
        let source = MockPageSource::new();
        source.add_page(
            page_url(&base(), 2).as_str(),
            page_html(2, &[post(1, 1), post(2, 2)]),
        );
        let collector = ThreadCollector::new(source);

        let snapshot = collector.collect(&base(), &first_page(2, 2), MAX_PAGES).await;

        assert_eq!(snapshot.posts, vec![post(1, 1), post(1, 2), post(2, 2)]);
    }

    #[tokio::test]
    async fn test_post_count_budget_truncates_mid_page() {
        let collector = ThreadCollector::new(thread_source(3, 2)).with_limits(CollectorLimits {
            max_posts: 3,
            ..CollectorLimits::default()
        });

        let snapshot = collector.collect(&base(), &first_page(3, 2), MAX_PAGES).await;

        assert!(snapshot.truncated);
        assert_eq!(snapshot.scanned_pages, 2);
        assert_eq!(snapshot.total_pages, 3);
        assert_eq!(snapshot.posts, vec![post(1, 1), post(1, 2), post(2, 1)]);
        // Page 3 is never fetched once the budget is hit.
        assert_eq!(collector.source().fetch_call_count(), 1);
    }

    #[tokio::test]
    async fn test_char_budget_truncates() {
        let per_post = post(1, 1).chars().count();
        let collector = ThreadCollector::new(thread_source(2, 2)).with_limits(CollectorLimits {
            max_total_chars: per_post * 2 + 5,
            ..CollectorLimits::default()
        });

        let snapshot = collector.collect(&base(), &first_page(2, 2), MAX_PAGES).await;

        assert!(snapshot.truncated);
        assert_eq!(snapshot.scanned_pages, 2);
        assert_eq!(snapshot.posts.len(), 2);
        assert!(snapshot.total_chars() <= per_post * 2 + 5);
    }

    #[tokio::test]
    async fn test_posts_truncated_then_deduplicated() {
        let shared = "Identical opening words shared by both replies here, ";
        let first = Html::parse_document(&forum_page(
            "Thread",
            1,
            &[&format!("{shared}then one ending"), &format!("{shared}and another")],
        ));
        let collector = ThreadCollector::new(MockPageSource::new()).with_limits(CollectorLimits {
            max_post_chars: 40,
            ..CollectorLimits::default()
        });

        let snapshot = collector.collect(&base(), &first, MAX_PAGES).await;

        assert_eq!(snapshot.posts, vec![shared.chars().take(40).collect::<String>()]);
        assert!(!snapshot.truncated);
    }

    #[tokio::test]
    async fn test_missing_title_uses_default() {
        let first = Html::parse_document(
            "<html><body><div class=\"l-main\">A single region of text that is long enough for the fallback</div></body></html>",
        );
        let collector = ThreadCollector::new(MockPageSource::new());

        let snapshot = collector.collect(&base(), &first, MAX_PAGES).await;

        assert_eq!(snapshot.title, DEFAULT_THREAD_TITLE);
        assert_eq!(snapshot.total_pages, 1);
        assert_eq!(snapshot.posts.len(), 1);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = ThreadSnapshot {
            title: "t".into(),
            total_pages: 3,
            scanned_pages: 2,
            posts: vec!["a".into()],
            truncated: true,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["scannedPages"], 2);
    }
}
