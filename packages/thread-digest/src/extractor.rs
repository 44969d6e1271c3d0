//! Post extraction from forum page HTML.
//!
//! A [`PostExtractor`] holds an ordered list of [`ExtractionStrategy`]
//! objects, most specific first. The first strategy that qualifies wins and
//! later ones are never tried. When none qualifies, a generic page-region
//! strategy returns a noisier, capped result instead of nothing.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, warn};

/// Content-container selectors for the forum's post markup, in priority order.
pub const POST_SELECTORS: [&str; 8] = [
    ".single-post-content",
    "[itemprop='articleBody']",
    ".c-article__content",
    ".post-content",
    ".article-content",
    ".message-content",
    "article .content",
    ".content",
];

/// Page regions tried when no post selector qualifies.
pub const FALLBACK_REGION_SELECTOR: &str = "article, .l-articlePage, .l-main";

/// Fragments at or below this many chars are treated as UI chrome.
pub const MIN_POST_CHARS: usize = 30;

/// A selector qualifies once it yields this many fragments.
pub const MIN_QUALIFYING_POSTS: usize = 2;

pub const FALLBACK_MIN_CHARS: usize = 50;
pub const FALLBACK_MAX_FRAGMENTS: usize = 20;

const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

const BREAKING_ELEMENTS: [&str; 14] = [
    "br", "p", "div", "li", "blockquote", "tr", "td", "h1", "h2", "h3", "h4", "h5", "h6", "pre",
];

/// One way of locating post text in a document.
pub trait ExtractionStrategy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Qualifying fragments in document order, or `None` when this strategy
    /// does not recognize the page.
    fn try_extract(&self, document: &Html) -> Option<Vec<String>>;
}

/// Collapse whitespace runs to single spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rendered text of an element, skipping script-like content.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();

    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element())
                    .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()));
                if !hidden {
                    out.push_str(text);
                }
            }
            Node::Element(el) if BREAKING_ELEMENTS.contains(&el.name()) => out.push(' '),
            _ => {}
        }
    }

    clean_text(&out)
}

/// Normalized `<title>` text, if any.
pub fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Texts of every element matching `selector` longer than `min_chars`.
fn matching_texts<'a>(
    document: &'a Html,
    selector: &'a Selector,
    min_chars: usize,
) -> impl Iterator<Item = String> + 'a {
    document
        .select(selector)
        .map(visible_text)
        .filter(move |text| char_len(text) > min_chars)
}

/// Post containers matched by a single CSS selector.
pub struct SelectorStrategy {
    css: String,
    selector: Selector,
    min_chars: usize,
    min_fragments: usize,
}

impl SelectorStrategy {
    /// Strategy with the default noise threshold. `None` if `css` does not parse.
    pub fn new(css: &str) -> Option<Self> {
        let selector = match Selector::parse(css) {
            Ok(selector) => selector,
            Err(e) => {
                warn!(selector = css, error = %e, "Skipping invalid selector");
                return None;
            }
        };

        Some(Self {
            css: css.to_string(),
            selector,
            min_chars: MIN_POST_CHARS,
            min_fragments: MIN_QUALIFYING_POSTS,
        })
    }
}

impl ExtractionStrategy for SelectorStrategy {
    fn name(&self) -> &str {
        &self.css
    }

    fn try_extract(&self, document: &Html) -> Option<Vec<String>> {
        let texts: Vec<String> = matching_texts(document, &self.selector, self.min_chars).collect();
        (texts.len() >= self.min_fragments).then_some(texts)
    }
}

/// Generic page regions, accepted regardless of how many fragments match.
pub struct RegionStrategy {
    css: String,
    selector: Selector,
    min_chars: usize,
    max_fragments: usize,
}

impl RegionStrategy {
    pub fn new(css: &str, min_chars: usize, max_fragments: usize) -> Option<Self> {
        let selector = Selector::parse(css).ok()?;
        Some(Self {
            css: css.to_string(),
            selector,
            min_chars,
            max_fragments,
        })
    }
}

impl ExtractionStrategy for RegionStrategy {
    fn name(&self) -> &str {
        &self.css
    }

    fn try_extract(&self, document: &Html) -> Option<Vec<String>> {
        Some(
            matching_texts(document, &self.selector, self.min_chars)
                .take(self.max_fragments)
                .collect(),
        )
    }
}

/// Ordered strategies plus a fallback.
pub struct PostExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    fallback: Option<Box<dyn ExtractionStrategy>>,
}

impl Default for PostExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PostExtractor {
    /// Extractor for the forum's known post markup.
    pub fn new() -> Self {
        let strategies = POST_SELECTORS
            .iter()
            .filter_map(|css| SelectorStrategy::new(css))
            .map(|s| Box::new(s) as Box<dyn ExtractionStrategy>)
            .collect();

        let fallback = RegionStrategy::new(
            FALLBACK_REGION_SELECTOR,
            FALLBACK_MIN_CHARS,
            FALLBACK_MAX_FRAGMENTS,
        )
        .map(|s| Box::new(s) as Box<dyn ExtractionStrategy>);

        Self { strategies, fallback }
    }

    /// Extractor with custom strategies.
    pub fn with_strategies(
        strategies: Vec<Box<dyn ExtractionStrategy>>,
        fallback: Option<Box<dyn ExtractionStrategy>>,
    ) -> Self {
        Self { strategies, fallback }
    }

    /// Post texts in document order.
    pub fn extract_posts(&self, document: &Html) -> Vec<String> {
        for strategy in &self.strategies {
            if let Some(posts) = strategy.try_extract(document) {
                debug!(strategy = strategy.name(), posts = posts.len(), "Extraction strategy matched");
                return posts;
            }
        }

        match &self.fallback {
            Some(fallback) => {
                let posts = fallback.try_extract(document).unwrap_or_default();
                debug!(strategy = fallback.name(), posts = posts.len(), "Using fallback extraction");
                posts
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREAT: &str = "Great product, works well for me after a month of use";
    const BROKE: &str = "I disagree, it broke in a week and support ignored me";

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!(
            "<html><head><title> Thread  title </title></head><body>{body}</body></html>"
        ))
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a \n\t b\u{00a0} c  "), "a b c");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_first_qualifying_selector_wins() {
        let document = doc(&format!(
            r#"<div class="single-post-content">{GREAT}</div>
               <div class="single-post-content">{BROKE}</div>
               <div class="post-content">This lower priority container should never be used</div>
               <div class="post-content">Neither should this lower priority container here</div>"#
        ));

        let posts = PostExtractor::new().extract_posts(&document);

        assert_eq!(posts, vec![GREAT.to_string(), BROKE.to_string()]);
    }

    #[test]
    fn test_single_match_falls_through_to_next_selector() {
        let document = doc(&format!(
            r#"<div class="single-post-content">Only one match here, not enough to qualify</div>
               <div class="post-content">{GREAT}</div>
               <div class="post-content">{BROKE}</div>"#
        ));

        let posts = PostExtractor::new().extract_posts(&document);

        assert_eq!(posts, vec![GREAT.to_string(), BROKE.to_string()]);
    }

    #[test]
    fn test_short_fragments_are_noise() {
        let document = doc(&format!(
            r#"<div class="single-post-content">Reply</div>
               <div class="single-post-content">{GREAT}</div>
               <div class="single-post-content">Quote</div>
               <div class="single-post-content">{BROKE}</div>"#
        ));

        let posts = PostExtractor::new().extract_posts(&document);

        assert_eq!(posts.len(), 2);
    }

    #[test]
    fn test_fallback_region_when_nothing_qualifies() {
        let long = "This article body is long enough to pass the stricter fallback threshold.";
        let document = doc(&format!(
            r#"<article>{long}</article><article>too short to keep in fallback</article>"#
        ));

        let posts = PostExtractor::new().extract_posts(&document);

        assert_eq!(posts, vec![long.to_string()]);
    }

    #[test]
    fn test_fallback_caps_fragment_count() {
        let body: String = (0..30)
            .map(|i| format!("<div class=\"l-main\">Region number {i} with enough padding text to exceed fifty chars</div>"))
            .collect();

        let posts = PostExtractor::new().extract_posts(&doc(&body));

        assert_eq!(posts.len(), FALLBACK_MAX_FRAGMENTS);
        assert!(posts[0].starts_with("Region number 0 "));
    }

    #[test]
    fn test_visible_text_skips_scripts_and_breaks_blocks() {
        let document = doc(
            r#"<div class="post-content">First line<br>second line<script>var x = 1;</script><p>third</p></div>"#,
        );
        let selector = Selector::parse(".post-content").unwrap();
        let element = document.select(&selector).next().unwrap();

        assert_eq!(visible_text(element), "First line second line third");
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title(&doc("")), Some("Thread title".to_string()));
        assert_eq!(extract_title(&Html::parse_document("<p>no title</p>")), None);
    }

    #[test]
    fn test_cjk_length_counts_chars() {
        // 17 chars but 51 bytes; must not count as long enough.
        let short = "這是一則很短的回覆內容沒有超過門檻";
        let long = "這是一則足夠長的貼文內容，討論這台手機的電池續航力與散熱表現，整體來說相當滿意";
        let document = doc(&format!(
            r#"<div class="post-content">{short}</div>
               <div class="post-content">{long}</div>
               <div class="post-content">{long}！</div>"#
        ));

        let posts = PostExtractor::new().extract_posts(&document);

        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|p| p.starts_with("這是一則足夠長")));
    }
}
