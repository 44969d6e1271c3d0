//! Forum page fetching.
//!
//! Derives per-page URLs from the thread URL and retrieves raw HTML over a
//! credentialed HTTP client (shared cookie jar, optional session cookie).

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{FetchError, FetchResult};

/// Query parameter names the forum uses for pagination, in lookup order.
const PAGE_PARAMS: [&str; 2] = ["p", "page"];

/// Parameter added when the thread URL carries neither page parameter.
const DEFAULT_PAGE_PARAM: &str = "p";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Derive the URL of `page` within the thread at `base`.
///
/// Page 1 (and anything below) is the canonical thread URL with every page
/// parameter stripped. Later pages set whichever of `p` / `page` the base URL
/// already uses, or add `p`. Other query parameters keep their order.
pub fn page_url(base: &Url, page: u32) -> Url {
    let pairs: Vec<(String, String)> = base.query_pairs().into_owned().collect();
    let mut url = base.clone();

    if page <= 1 {
        let kept: Vec<(String, String)> = pairs
            .into_iter()
            .filter(|(key, _)| !PAGE_PARAMS.contains(&key.as_str()))
            .collect();
        replace_query(&mut url, &kept);
        return url;
    }

    let param = PAGE_PARAMS
        .iter()
        .copied()
        .find(|name| pairs.iter().any(|(key, _)| key == name))
        .unwrap_or(DEFAULT_PAGE_PARAM);
    let value = page.to_string();

    // Set the first occurrence, drop any repeats.
    let mut updated = Vec::with_capacity(pairs.len() + 1);
    let mut set = false;
    for (key, v) in pairs {
        if key == param {
            if !set {
                updated.push((key, value.clone()));
                set = true;
            }
        } else {
            updated.push((key, v));
        }
    }
    if !set {
        updated.push((param.to_string(), value));
    }

    replace_query(&mut url, &updated);
    url
}

fn replace_query(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

/// Source of raw forum page HTML.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page. Any error means the page is unavailable.
    async fn fetch_page(&self, url: &Url) -> FetchResult<String>;
}

/// Page source backed by reqwest.
///
/// Requests are credentialed: one cookie jar is shared by every request, so
/// cookies set by the forum are sent back. A configured session cookie is
/// seeded into that jar rather than sent as a fixed header.
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    /// Create a page source. `cookie` is a `name=value; name2=value2` list
    /// scoped to `forum_url`.
    pub fn new(cookie: Option<&str>, forum_url: &Url) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.5"),
        );

        let jar = Arc::new(Jar::default());
        if let Some(cookie) = cookie {
            // The jar drops malformed cookies silently; reject them up front.
            HeaderValue::from_str(cookie)?;
            for pair in cookie.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                jar.add_cookie_str(pair, forum_url);
            }
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_provider(jar)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, url: &Url) -> FetchResult<String> {
        debug!(url = %url, "HTTP fetch starting");

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
