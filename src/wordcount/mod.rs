//! Word counting over regulatory title content.
//!
//! The versioner API returns either full XML markup or a structural JSON
//! skeleton for a title, depending on the endpoint. Both shapes reduce to
//! a token count that serves as a proxy for document size. Counting never
//! fails: unrecognized content contributes zero words.

use crate::models::TitleContent;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    /// XML comment blocks, including multi-line ones.
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern");
    /// Markup tags. Each tag is replaced with a space so adjacent text
    /// stays separated.
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").expect("valid tag pattern");
    /// Punctuation treated as token separators.
    static ref PUNCT_RE: Regex =
        Regex::new(r"[.,/#!$%\^&\*;:{}=\-_`~()]").expect("valid punctuation pattern");
}

/// Count the words in a title's content.
///
/// Dispatches on the content variant; see [`count_markup_words`] and
/// [`count_structured_words`]. Returns 0 for empty content.
pub fn count_words(content: &TitleContent) -> u64 {
    match content {
        TitleContent::Text(text) => count_markup_words(text),
        TitleContent::Structured(document) => count_structured_words(document),
    }
}

/// Count words in raw XML-like markup.
///
/// Comments are stripped first so commented-out material never counts,
/// then tags and punctuation are replaced with spaces. Tokens consisting
/// solely of digits (section and catalog numbers) are excluded.
pub fn count_markup_words(text: &str) -> u64 {
    let no_comments = COMMENT_RE.replace_all(text, "");
    let no_tags = TAG_RE.replace_all(&no_comments, " ");
    let clean = PUNCT_RE.replace_all(&no_tags, " ");

    clean
        .split_whitespace()
        .filter(|token| !is_pure_digits(token))
        .count() as u64
}

/// Count words in a structural document.
///
/// Walks the tree and collects every leaf string, at any nesting depth,
/// into one text blob. Structured leaves are already semantically
/// segmented, so no punctuation stripping is applied; numbers, booleans,
/// and nulls contribute no text. Pure-digit tokens are still excluded.
pub fn count_structured_words(document: &Value) -> u64 {
    let mut text = String::new();
    collect_leaf_text(document, &mut text);

    text.split_whitespace()
        .filter(|token| !is_pure_digits(token))
        .count() as u64
}

fn collect_leaf_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push(' ');
            out.push_str(s);
        }
        Value::Array(items) => {
            for item in items {
                collect_leaf_text(item, out);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                collect_leaf_text(child, out);
            }
        }
        // Numbers, booleans, and nulls carry no countable text.
        _ => {}
    }
}

fn is_pure_digits(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}
