// ABOUTME: Feed discovery library for feedsift.
// ABOUTME: Finds, verifies, and ranks feed URLs starting from anything a user might type.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod finder;
pub mod specifier;

mod scan;

pub use cache::DiscoveryCache;
pub use error::FinderError;
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher, HttpFetcherBuilder};
pub use finder::FeedFinder;
pub use specifier::{best_feed, rank, CandidateSource, FeedSpecifier};
