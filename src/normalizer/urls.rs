//! URL exhibit extraction from pasted free text.
//!
//! Each line is scanned on its own. Section headings (lines made only of
//! upper-case letters, spaces, slashes and ampersands) are skipped. Every URL
//! token on a line becomes one exhibit; the rest of the line, minus list
//! prefixes and separators, is the caption.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::ExhibitItem;

/// Characters stripped from the end of a URL token
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '}', ']'];

/// Characters trimmed around the caption
const SEPARATORS: &[char] = &['-', '–', '—', ':', '|', ',', ';', '.'];

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r#"(?i)https?://[^\s<>"')\]}]+"#).expect("url pattern is valid")
    })
}

fn list_prefix_pattern() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"^(?:[-*•·>]+|\(?[0-9]{1,3}[.)]|\(?[A-Za-z][.)]|#[0-9]+[.):]?)(?:\s+|$)")
            .expect("prefix pattern is valid")
    })
}

fn empty_brackets_pattern() -> &'static Regex {
    static BRACKETS: OnceLock<Regex> = OnceLock::new();
    BRACKETS.get_or_init(|| Regex::new(r"[(\[{<]\s*[)\]}>]").expect("bracket pattern is valid"))
}

/// Whether a line reads as an all-caps section heading
pub fn is_section_heading(line: &str) -> bool {
    let line = line.trim();
    line.chars().any(|c| c.is_ascii_uppercase())
        && line
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == ' ' || c == '/' || c == '&')
}

/// Find the URL tokens on a line, with their byte ranges in the line
fn url_tokens(line: &str) -> Vec<(std::ops::Range<usize>, String)> {
    url_pattern()
        .find_iter(line)
        .filter_map(|m| {
            let token = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            let parsed = url::Url::parse(token).ok()?;
            parsed.host_str()?;
            Some((m.start()..m.start() + token.len(), token.to_string()))
        })
        .collect()
}

/// Caption left on the line once URLs, list prefix and separators are removed
fn caption_from_remainder(line: &str, ranges: &[std::ops::Range<usize>]) -> String {
    let mut remainder = String::with_capacity(line.len());
    let mut cursor = 0;
    for range in ranges {
        remainder.push_str(&line[cursor..range.start]);
        remainder.push(' ');
        cursor = range.end;
    }
    remainder.push_str(&line[cursor..]);

    let collapsed = remainder.split_whitespace().collect::<Vec<_>>().join(" ");
    // "(https://...)" leaves an empty bracket pair behind
    let unbracketed = empty_brackets_pattern().replace_all(&collapsed, "");
    let unbracketed = unbracketed.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_prefix = list_prefix_pattern().replace(&unbracketed, "");

    without_prefix
        .trim_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .to_string()
}

/// Caption derived from the URL itself: last path segment, else the host
pub fn label_from_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return url.to_string();
    };

    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        });

    if let Some(segment) = segment {
        let stem = match segment.rfind('.') {
            Some(pos) if pos > 0 => &segment[..pos],
            _ => segment.as_str(),
        };
        let label = stem
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !label.is_empty() {
            return label;
        }
    }

    parsed.host_str().unwrap_or(url).to_string()
}

/// Extract URL exhibits from pasted text, in reading order
pub fn extract_url_items(text: &str) -> Vec<ExhibitItem> {
    let mut items = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if is_section_heading(line) {
            tracing::debug!("Skipping section heading: {}", line);
            continue;
        }

        let tokens = url_tokens(line);
        if tokens.is_empty() {
            continue;
        }

        let ranges: Vec<_> = tokens.iter().map(|(range, _)| range.clone()).collect();
        let caption = caption_from_remainder(line, &ranges);

        for (_, url) in tokens {
            let label = if caption.is_empty() {
                label_from_url(&url)
            } else {
                caption.clone()
            };
            items.push(ExhibitItem::url(url, label));
        }
    }

    items
}
