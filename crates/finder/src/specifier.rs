// ABOUTME: The feed candidate type and its ranking rules.
// ABOUTME: Where a candidate came from matters more than anything in its URL.

use std::cmp::Ordering;

use feedsift_parser::FeedType;
use serde::Serialize;

/// Where a candidate URL was found, in decreasing order of trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateSource {
    /// The user typed this exact URL.
    UserEntered,
    /// A `<link rel="alternate">` in the page head.
    HtmlHead,
    /// An anchor in the page body that looks feed-shaped.
    HtmlBody,
    /// Guessed from well-known feed paths on the page's site.
    Synthesized,
}

/// One candidate feed location, possibly verified.
#[derive(Debug, Clone, Serialize)]
pub struct FeedSpecifier {
    pub title: Option<String>,
    pub url_string: String,
    pub source: CandidateSource,
    /// Position among the candidates found on the same page, starting at 0.
    pub order_found: u32,
    /// Set once verification has confirmed what lives at the URL.
    pub feed_type: Option<FeedType>,
}

impl FeedSpecifier {
    pub fn new(
        title: Option<String>,
        url_string: String,
        source: CandidateSource,
        order_found: u32,
    ) -> Self {
        Self {
            title,
            url_string,
            source,
            order_found,
            feed_type: None,
        }
    }

    /// The ranking score. Higher is better; a user-entered URL beats
    /// everything a page scan could produce.
    pub fn score(&self) -> i32 {
        if self.source == CandidateSource::UserEntered {
            return 1000;
        }

        let mut score = 200 - self.order_found as i32;
        if self.source == CandidateSource::HtmlHead {
            score += 50;
        }

        let url = self.url_string.to_ascii_lowercase();
        if url.contains("rss") {
            score += 5;
        }
        if url.contains("json") {
            score += 5;
        }
        if url.ends_with("/feed/") || url.ends_with("/index.xml") {
            score += 5;
        }
        // Comment feeds and podcast sidecars are rarely what anyone wants.
        if url.contains("comments") {
            score -= 10;
        }
        if url.contains("podcast") {
            score -= 10;
        }
        if let Some(title) = &self.title {
            if title.to_ascii_lowercase().contains("comments") {
                score -= 10;
            }
        }

        score
    }
}

/// Sorts best-first: score, then discovery order, then the URL itself so
/// equal candidates rank deterministically.
pub fn rank(mut specifiers: Vec<FeedSpecifier>) -> Vec<FeedSpecifier> {
    specifiers.sort_by(compare);
    specifiers
}

/// The single best candidate under the same ordering `rank` uses.
pub fn best_feed(specifiers: &[FeedSpecifier]) -> Option<&FeedSpecifier> {
    specifiers.iter().min_by(|a, b| compare(a, b))
}

fn compare(a: &FeedSpecifier, b: &FeedSpecifier) -> Ordering {
    b.score()
        .cmp(&a.score())
        .then(a.order_found.cmp(&b.order_found))
        .then_with(|| a.url_string.cmp(&b.url_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, source: CandidateSource, order: u32) -> FeedSpecifier {
        FeedSpecifier::new(None, url.to_string(), source, order)
    }

    #[test]
    fn user_entered_beats_everything() {
        let user = candidate("https://x.example/anything", CandidateSource::UserEntered, 9);
        let head = candidate("https://x.example/rss.xml", CandidateSource::HtmlHead, 0);
        assert!(user.score() > head.score());
        assert_eq!(user.score(), 1000);
    }

    #[test]
    fn head_links_beat_body_links() {
        let head = candidate("https://x.example/a.xml", CandidateSource::HtmlHead, 0);
        let body = candidate("https://x.example/a.xml", CandidateSource::HtmlBody, 0);
        assert!(head.score() > body.score());
    }

    #[test]
    fn earlier_candidates_score_higher() {
        let first = candidate("https://x.example/a.xml", CandidateSource::HtmlBody, 0);
        let third = candidate("https://x.example/a.xml", CandidateSource::HtmlBody, 2);
        assert!(first.score() > third.score());
    }

    #[test]
    fn comment_feeds_are_penalized() {
        let main = candidate("https://x.example/feed/", CandidateSource::HtmlHead, 0);
        let comments = candidate(
            "https://x.example/comments/feed/",
            CandidateSource::HtmlHead,
            1,
        );
        assert!(main.score() > comments.score());

        let mut titled = candidate("https://x.example/feed2/", CandidateSource::HtmlHead, 0);
        titled.title = Some("Comments Feed".to_string());
        assert!(main.score() > titled.score());
    }

    #[test]
    fn rank_breaks_ties_deterministically() {
        let a = candidate("https://x.example/a.xml", CandidateSource::HtmlBody, 0);
        let b = candidate("https://x.example/b.xml", CandidateSource::HtmlBody, 0);
        let ranked = rank(vec![b, a]);
        assert_eq!(ranked[0].url_string, "https://x.example/a.xml");

        let ranked = rank(vec![
            candidate("https://x.example/a.xml", CandidateSource::HtmlBody, 0),
            candidate("https://x.example/b.xml", CandidateSource::HtmlBody, 0),
        ]);
        assert_eq!(ranked[0].url_string, "https://x.example/a.xml");
    }

    #[test]
    fn best_feed_agrees_with_rank() {
        let candidates = vec![
            candidate("https://x.example/comments/feed/", CandidateSource::HtmlHead, 1),
            candidate("https://x.example/feed/", CandidateSource::HtmlHead, 0),
            candidate("https://x.example/guess.xml", CandidateSource::HtmlBody, 2),
        ];
        let best = best_feed(&candidates).unwrap();
        assert_eq!(best.url_string, "https://x.example/feed/");
        assert_eq!(rank(candidates)[0].url_string, "https://x.example/feed/");

        assert!(best_feed(&[]).is_none());
    }
}
