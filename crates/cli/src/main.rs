// ABOUTME: CLI for feedsift: sniff, parse, and discover feeds, printing JSON for inspection.
// ABOUTME: Targets are URLs, local file paths, or "-" for stdin.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use feedsift_finder::{DiscoveryCache, FeedFinder, HttpFetcher};
use feedsift_parser::{classify, parse_feed, parse_opml, OpmlItem};

#[derive(Parser, Debug)]
#[command(name = "feedsift")]
#[command(about = "Sniff, parse, and discover syndication feeds", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output compact JSON instead of pretty.
    #[arg(long, global = true, default_value_t = false)]
    compact: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse one or more feeds and print the canonical model.
    Parse {
        /// Feed URL(s), file paths, or "-" for stdin.
        #[arg(required = true)]
        targets: Vec<String>,

        /// Override the feed_url value (single target only).
        #[arg(long)]
        feed_url: Option<String>,
    },
    /// Classify bytes without parsing them.
    Sniff {
        /// A URL, file path, or "-" for stdin.
        target: String,
    },
    /// Parse an OPML subscription list and print the outline tree.
    Opml {
        /// A URL, file path, or "-" for stdin.
        target: String,
    },
    /// Find the feeds for a site, best candidate first.
    Discover {
        /// The page URL (scheme optional, https assumed).
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let output = match args.command {
        Command::Parse { targets, feed_url } => run_parse(targets, feed_url).await?,
        Command::Sniff { target } => {
            let bytes = load_bytes(&target).await?;
            json!({ "target": target, "feedType": classify(&bytes, false) })
        }
        Command::Opml { target } => {
            let bytes = load_bytes(&target).await?;
            let doc = parse_opml(&bytes, &target)
                .ok_or_else(|| anyhow!("{} is not an OPML document", target))?;
            json!({
                "title": doc.title,
                "url": doc.url,
                "items": doc.items.iter().map(opml_item_json).collect::<Vec<_>>(),
            })
        }
        Command::Discover { url } => {
            let fetcher = HttpFetcher::new()?;
            let cache = DiscoveryCache::new();
            let finder = FeedFinder::new(&fetcher).with_cache(&cache);
            let found = finder.discover(&url).await?;
            json!({ "url": url, "feeds": found })
        }
    };

    if args.compact {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

async fn run_parse(targets: Vec<String>, feed_url: Option<String>) -> Result<serde_json::Value> {
    if targets.len() > 1 && feed_url.is_some() {
        bail!("--feed-url is only valid when parsing a single target");
    }

    let mut results = Vec::new();
    for target in &targets {
        let feed_url = feed_url.clone().unwrap_or_else(|| target.clone());
        let outcome = match load_bytes(target).await {
            Ok(bytes) => parse_feed(&bytes, &feed_url).map_err(anyhow::Error::new),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(feed) => results.push(json!({
                "feed_url": feed_url,
                "ok": true,
                "feed": feed,
                "error": null
            })),
            Err(err) => results.push(json!({
                "feed_url": feed_url,
                "ok": false,
                "feed": null,
                "error": err.to_string()
            })),
        }
    }

    // A single successful target prints the bare feed; everything else gets
    // the envelope with counts.
    if targets.len() == 1 {
        if let Some(first) = results.first() {
            if first.get("ok").and_then(|v| v.as_bool()) == Some(true) {
                return Ok(first.get("feed").cloned().unwrap_or_else(|| json!({})));
            }
        }
    }

    let parsed = results
        .iter()
        .filter(|r| r.get("ok").and_then(|v| v.as_bool()) == Some(true))
        .count();
    let failed = results.len() - parsed;
    Ok(json!({
        "feeds": results,
        "total_feeds": results.len(),
        "parsed": parsed,
        "failed": failed
    }))
}

fn opml_item_json(item: &OpmlItem) -> serde_json::Value {
    json!({
        "title": item.title(),
        "xmlUrl": item.xml_url(),
        "htmlUrl": item.html_url(),
        "isFolder": item.is_folder(),
        "items": item.items.iter().map(opml_item_json).collect::<Vec<_>>(),
    })
}

async fn load_bytes(target: &str) -> Result<Vec<u8>> {
    if target == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }

    if target.starts_with("http://") || target.starts_with("https://") {
        let resp = reqwest::get(target).await?.error_for_status()?;
        return Ok(resp.bytes().await?.to_vec());
    }

    let path = PathBuf::from(target);
    if !path.exists() {
        return Err(anyhow!("file not found: {}", target));
    }
    Ok(fs::read(path)?)
}
