// ABOUTME: The discovery engine: fetch a page, sniff it, scan it, then verify candidates.
// ABOUTME: Candidate verification fans out concurrently; individual failures drop the candidate.

use feedsift_parser::{classify, parse_feed, FeedType};
use url::Url;

use crate::cache::DiscoveryCache;
use crate::error::FinderError;
use crate::fetcher::Fetcher;
use crate::scan::scan_html;
use crate::specifier::{rank, CandidateSource, FeedSpecifier};

/// Discovers feeds starting from a URL a user typed.
///
/// The fetcher is injected so tests (and alternative transports) can supply
/// their own; the cache is optional and caller-owned.
pub struct FeedFinder<'a> {
    fetcher: &'a dyn Fetcher,
    cache: Option<&'a DiscoveryCache>,
}

impl<'a> FeedFinder<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a DiscoveryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Runs the full discovery pipeline and returns candidates best-first.
    pub async fn discover(&self, raw_url: &str) -> Result<Vec<FeedSpecifier>, FinderError> {
        let page_url = normalize_url(raw_url)?;

        // Sites with well-known feed layouts need no network at all.
        if let Some(rewritten) = known_feed_rewrite(&page_url) {
            let mut specifier =
                FeedSpecifier::new(None, rewritten, CandidateSource::UserEntered, 0);
            specifier.feed_type = Some(FeedType::Atom);
            return Ok(vec![specifier]);
        }

        if let Some(cache) = self.cache {
            if let Some(cached) = cache.get(page_url.as_str()) {
                return Ok(cached);
            }
        }

        let (response, rewritten) = self.fetch_page(&page_url).await?;
        if !response.is_success() {
            return Err(FinderError::Status(response.status));
        }
        if response.body.is_empty() {
            return Err(FinderError::NoFeedsFound(page_url.to_string()));
        }
        let fetched_url = response.final_url.clone();

        // The typed URL may already be the feed. A host-rule rewrite is our
        // guess, not the user's words, so it ranks as a synthesized candidate.
        let kind = classify(&response.body, false);
        if kind.is_feed() {
            let source = if rewritten {
                CandidateSource::Synthesized
            } else {
                CandidateSource::UserEntered
            };
            let mut specifier = FeedSpecifier::new(None, fetched_url.clone(), source, 0);
            specifier.feed_type = Some(kind);
            specifier.title = parse_feed(&response.body, &fetched_url)
                .ok()
                .and_then(|f| f.title);
            let result = vec![specifier];
            self.remember(page_url.as_str(), &result);
            return Ok(result);
        }

        let base = Url::parse(&fetched_url).unwrap_or(page_url.clone());
        let html = String::from_utf8_lossy(&response.body);
        let mut candidates = scan_html(&html, &base);

        // Head links are the page author's own declaration and are taken at
        // their word, no verification fetches. Body anchors are only guesses
        // and must each prove themselves.
        let has_head = candidates
            .iter()
            .any(|c| c.source == CandidateSource::HtmlHead);
        let surviving = if has_head {
            candidates.retain(|c| c.source == CandidateSource::HtmlHead);
            candidates
        } else if !candidates.is_empty() {
            self.verify(candidates).await
        } else {
            Vec::new()
        };

        // A page with no usable hints still yields the two well-known guesses.
        let surviving = if surviving.is_empty() {
            synthesized_candidates(&base)
        } else {
            surviving
        };

        let ranked = rank(surviving);
        self.remember(page_url.as_str(), &ranked);
        Ok(ranked)
    }

    /// Fetches the page, applying host-specific 404 rewrites. The flag says
    /// whether the returned response came from a rewritten URL.
    async fn fetch_page(
        &self,
        page_url: &Url,
    ) -> Result<(crate::fetcher::FetchResponse, bool), FinderError> {
        let response = self.fetcher.fetch(page_url.as_str()).await?;

        // Tumblr 404s its root for some themes but always serves /rss.
        if response.status == 404 && is_tumblr_host(page_url) {
            let retry = format!("{}/rss", page_url.as_str().trim_end_matches('/'));
            return Ok((self.fetcher.fetch(&retry).await?, true));
        }

        Ok((response, false))
    }

    /// Fetches every candidate concurrently and keeps the ones whose bytes
    /// sniff as a feed. A candidate that errors simply disappears.
    async fn verify(&self, candidates: Vec<FeedSpecifier>) -> Vec<FeedSpecifier> {
        let checks = candidates.into_iter().map(|mut candidate| async move {
            let response = self.fetcher.fetch(&candidate.url_string).await.ok()?;
            if !response.is_success() {
                return None;
            }
            let kind = classify(&response.body, false);
            if !kind.is_feed() {
                return None;
            }
            candidate.feed_type = Some(kind);
            // The feed's own title beats whatever the anchor text said.
            if let Some(title) = parse_feed(&response.body, &candidate.url_string)
                .ok()
                .and_then(|f| f.title)
            {
                candidate.title = Some(title);
            }
            Some(candidate)
        });

        futures::future::join_all(checks)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    fn remember(&self, page_url: &str, specifiers: &[FeedSpecifier]) {
        if let Some(cache) = self.cache {
            cache.insert(page_url, specifiers.to_vec());
        }
    }
}

/// Turns what a user typed into an absolute http(s) URL, defaulting to https.
fn normalize_url(raw: &str) -> Result<Url, FinderError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FinderError::InvalidUrl(raw.to_string()));
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|_| FinderError::InvalidUrl(raw.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(FinderError::InvalidUrl(raw.to_string()));
    }
    if url.host_str().is_none() {
        return Err(FinderError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Sites whose feed location is known from the URL shape alone.
fn known_feed_rewrite(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if !matches!(host, "youtube.com" | "www.youtube.com" | "m.youtube.com") {
        return None;
    }
    let mut segments = url.path_segments()?;
    match (segments.next()?, segments.next()?) {
        ("user", name) if !name.is_empty() => Some(format!(
            "https://www.youtube.com/feeds/videos.xml?user={}",
            name
        )),
        ("channel", id) if !id.is_empty() => Some(format!(
            "https://www.youtube.com/feeds/videos.xml?channel_id={}",
            id
        )),
        _ => None,
    }
}

fn is_tumblr_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|h| h.ends_with(".tumblr.com") || h == "tumblr.com")
}

/// Last-resort guesses when the page declares nothing at all.
fn synthesized_candidates(base: &Url) -> Vec<FeedSpecifier> {
    let page = base.as_str().trim_end_matches('/');
    vec![
        FeedSpecifier::new(
            None,
            format!("{}/feed/", page),
            CandidateSource::Synthesized,
            0,
        ),
        FeedSpecifier::new(
            None,
            format!("{}/index.xml", page),
            CandidateSource::Synthesized,
            1,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use bytes::Bytes;
    use futures::future::BoxFuture;
    use futures::FutureExt;

    use crate::fetcher::FetchResponse;

    /// Serves canned responses and records every URL it is asked for.
    struct StubFetcher {
        responses: HashMap<String, (u16, &'static str)>,
        log: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn new(responses: &[(&str, u16, &'static str)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(url, status, body)| (url.to_string(), (*status, *body)))
                    .collect(),
                log: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Fetcher for StubFetcher {
        fn fetch<'a>(
            &'a self,
            url: &'a str,
        ) -> BoxFuture<'a, Result<FetchResponse, FinderError>> {
            async move {
                self.log.lock().unwrap().push(url.to_string());
                let (status, body) = self
                    .responses
                    .get(url)
                    .copied()
                    .unwrap_or((404, "not found"));
                Ok(FetchResponse {
                    url: url.to_string(),
                    final_url: url.to_string(),
                    status,
                    body: Bytes::from_static(body.as_bytes()),
                })
            }
            .boxed()
        }
    }

    fn rss_body() -> &'static str {
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Stub Feed</title><link>https://example.com/</link><description>d</description><item><guid>1</guid><description>x</description></item></channel></rss>"#
    }

    #[test]
    fn normalizes_bare_hostnames_to_https() {
        assert_eq!(
            normalize_url("example.com").unwrap().as_str(),
            "https://example.com/"
        );
        assert!(normalize_url("").is_err());
        assert!(normalize_url("ftp://example.com/").is_err());
        assert!(normalize_url("https://").is_err());
    }

    #[tokio::test]
    async fn youtube_urls_rewrite_without_any_network() {
        let fetcher = StubFetcher::new(&[]);
        let finder = FeedFinder::new(&fetcher);

        let found = finder
            .discover("https://www.youtube.com/channel/UCabc123")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].url_string,
            "https://www.youtube.com/feeds/videos.xml?channel_id=UCabc123"
        );
        assert_eq!(found[0].feed_type, Some(FeedType::Atom));

        let found = finder
            .discover("https://youtube.com/user/somebody")
            .await
            .unwrap();
        assert_eq!(
            found[0].url_string,
            "https://www.youtube.com/feeds/videos.xml?user=somebody"
        );

        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn typed_url_that_is_already_a_feed_short_circuits() {
        let fetcher = StubFetcher::new(&[("https://example.com/feed.xml", 200, rss_body())]);
        let finder = FeedFinder::new(&fetcher);

        let found = finder.discover("https://example.com/feed.xml").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source, CandidateSource::UserEntered);
        assert_eq!(found[0].feed_type, Some(FeedType::Rss));
        assert_eq!(found[0].title.as_deref(), Some("Stub Feed"));
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn tumblr_404_retries_the_rss_path() {
        let fetcher = StubFetcher::new(&[
            ("https://someone.tumblr.com/", 404, "nope"),
            ("https://someone.tumblr.com/rss", 200, rss_body()),
        ]);
        let finder = FeedFinder::new(&fetcher);

        let found = finder.discover("https://someone.tumblr.com/").await.unwrap();
        assert_eq!(found[0].feed_type, Some(FeedType::Rss));
        // The /rss URL was our guess, not what the user typed: it must not
        // carry user-entered authority.
        assert_eq!(found[0].source, CandidateSource::Synthesized);
        assert!(found[0].score() < 1000);
        assert_eq!(
            fetcher.requests(),
            vec![
                "https://someone.tumblr.com/".to_string(),
                "https://someone.tumblr.com/rss".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn pages_with_no_hints_yield_the_two_wellknown_guesses() {
        let page = format!(
            "<html><body>{}</body></html>",
            "<p>no feeds here</p>".repeat(10)
        );
        let fetcher = StubFetcher::new(&[(
            "https://example.com/",
            200,
            Box::leak(page.into_boxed_str()),
        )]);
        let finder = FeedFinder::new(&fetcher);

        let found = finder.discover("example.com").await.unwrap();
        let urls: Vec<&str> = found.iter().map(|s| s.url_string.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.com/feed/", "https://example.com/index.xml"]
        );
        assert!(found.iter().all(|s| s.source == CandidateSource::Synthesized));
        assert!(found.iter().all(|s| s.feed_type.is_none()));

        // Guesses are returned, not chased: only the page itself was fetched.
        assert_eq!(fetcher.requests(), vec!["https://example.com/".to_string()]);
    }

    #[tokio::test]
    async fn body_guesses_that_fail_verification_fall_back_to_synthesis() {
        let page = r#"<html><body><a href="/dead.xml">feed?</a></body></html>"#;
        let fetcher = StubFetcher::new(&[
            ("https://example.com/", 200, page),
            ("https://example.com/dead.xml", 404, "gone"),
        ]);
        let finder = FeedFinder::new(&fetcher);

        let found = finder.discover("https://example.com/").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|s| s.source == CandidateSource::Synthesized));
    }

    #[tokio::test]
    async fn cache_short_circuits_repeat_lookups() {
        let fetcher = StubFetcher::new(&[("https://example.com/feed.xml", 200, rss_body())]);
        let cache = DiscoveryCache::new();
        let finder = FeedFinder::new(&fetcher).with_cache(&cache);

        finder.discover("https://example.com/feed.xml").await.unwrap();
        let before = fetcher.requests().len();
        let again = finder.discover("https://example.com/feed.xml").await.unwrap();
        assert_eq!(fetcher.requests().len(), before);
        assert_eq!(again.len(), 1);
    }

    #[tokio::test]
    async fn hard_404_is_a_status_error() {
        let fetcher = StubFetcher::new(&[]);
        let finder = FeedFinder::new(&fetcher);
        let err = finder.discover("https://gone.example/").await.unwrap_err();
        assert!(matches!(err, FinderError::Status(404)));
    }
}
