// ABOUTME: HTML entity decoding for feed text content.
// ABOUTME: Handles the common named entities plus decimal/hex numeric references.

/// Decodes common named and numeric HTML entities.
///
/// Real-world feeds double-encode titles and summaries constantly; this is
/// deliberately a small fixed table rather than a full HTML5 entity set.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let named = [
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&apos;", "'"),
        ("&#39;", "'"),
        ("&nbsp;", " "),
        ("&ndash;", "\u{2013}"),
        ("&mdash;", "\u{2014}"),
        ("&lsquo;", "\u{2018}"),
        ("&rsquo;", "\u{2019}"),
        ("&ldquo;", "\u{201C}"),
        ("&rdquo;", "\u{201D}"),
        ("&hellip;", "\u{2026}"),
        ("&copy;", "\u{A9}"),
        ("&reg;", "\u{AE}"),
        ("&trade;", "\u{2122}"),
        ("&bull;", "\u{2022}"),
        ("&middot;", "\u{B7}"),
        ("&deg;", "\u{B0}"),
        ("&euro;", "\u{20AC}"),
        ("&pound;", "\u{A3}"),
    ];

    let mut result = s.to_string();
    for (entity, replacement) in &named {
        if result.contains(entity) {
            result = result.replace(entity, replacement);
        }
    }

    decode_numeric_entities(&result)
}

/// Decodes numeric references like `&#8217;` and `&#x2019;`.
fn decode_numeric_entities(s: &str) -> String {
    if !s.contains("&#") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '&' || chars.peek() != Some(&'#') {
            result.push(c);
            continue;
        }
        chars.next(); // consume '#'

        let is_hex = matches!(chars.peek(), Some('x') | Some('X'));
        if is_hex {
            chars.next();
        }

        let mut digits = String::new();
        let mut terminated = false;
        while let Some(&nc) = chars.peek() {
            if nc == ';' {
                chars.next();
                terminated = true;
                break;
            }
            let valid = if is_hex {
                nc.is_ascii_hexdigit()
            } else {
                nc.is_ascii_digit()
            };
            if !valid {
                break;
            }
            digits.push(nc);
            chars.next();
        }

        let code = if is_hex {
            u32::from_str_radix(&digits, 16).ok()
        } else {
            digits.parse::<u32>().ok()
        };

        match code.filter(|_| terminated).and_then(char::from_u32) {
            Some(decoded) => result.push(decoded),
            None => {
                // Leave unrecognized references alone.
                result.push('&');
                result.push('#');
                if is_hex {
                    result.push('x');
                }
                result.push_str(&digits);
                if terminated {
                    result.push(';');
                }
            }
        }
    }

    result
}
