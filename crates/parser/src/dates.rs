// ABOUTME: Flexible date parsing for feed timestamps.
// ABOUTME: Tries RFC3339, RFC2822, then the loose formats feeds actually ship.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Parses a feed date in any of the formats seen in the wild.
///
/// Returns UTC on success, `None` when nothing matches. Missing or broken
/// dates are an item-level defect, never a parse failure.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Atom and JSON Feed: RFC3339.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // RSS pubDate: RFC2822.
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = parse_named_timezone(s) {
        return Some(dt);
    }

    // Variants with a numeric offset that the RFC parsers reject.
    const OFFSET_FORMATS: &[&str] = &[
        "%a, %d %b %Y %H:%M:%S %z",
        "%a, %e %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%z",
    ];
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // No timezone at all: assume UTC.
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%a, %d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M:%S",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&naive));
    }

    None
}

/// chrono's %Z does not parse timezone abbreviations, so the handful that
/// show up in RSS pubDates are handled here.
fn parse_named_timezone(s: &str) -> Option<DateTime<Utc>> {
    const OFFSETS: &[(&str, i32)] = &[
        ("GMT", 0),
        ("UT", 0),
        ("UTC", 0),
        ("EST", -5 * 3600),
        ("EDT", -4 * 3600),
        ("CST", -6 * 3600),
        ("CDT", -5 * 3600),
        ("MST", -7 * 3600),
        ("MDT", -6 * 3600),
        ("PST", -8 * 3600),
        ("PDT", -7 * 3600),
        ("CET", 3600),
        ("CEST", 2 * 3600),
        ("BST", 3600),
        ("JST", 9 * 3600),
        ("AEST", 10 * 3600),
    ];

    for (name, offset_secs) in OFFSETS {
        if !s.ends_with(name) {
            continue;
        }
        let base = s[..s.len() - name.len()].trim_end();
        const FORMATS: &[&str] = &[
            "%a, %d %b %Y %H:%M:%S",
            "%a, %e %b %Y %H:%M:%S",
            "%d %b %Y %H:%M:%S",
        ];
        for fmt in FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(base, fmt) {
                let offset = FixedOffset::east_opt(*offset_secs)?;
                let dt = offset.from_local_datetime(&naive).single()?;
                return Some(dt.with_timezone(&Utc));
            }
        }
    }

    None
}
