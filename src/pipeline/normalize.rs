// src/pipeline/normalize.rs

//! Content normalization.
//!
//! Turns whatever the API delivered (markdown, plain text, a rich JSON tree or
//! HTML) into clean text for the block parser: entities decoded, escaped
//! brackets restored, invisible characters removed.

use scraper::{ElementRef, Html};
use serde_json::Value;

use crate::models::PageBody;

const ENTITIES: [(&str, &str); 8] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&#x27;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
];

/// Elements that end a line when rendered.
const BLOCK_ELEMENTS: [&str; 20] = [
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "h1", "h2", "h3", "h4",
    "h5", "h6", "hr", "li", "p", "pre", "section", "tr",
];

/// Render any page body to normalized text.
pub fn body_to_text(body: &PageBody) -> String {
    match body {
        PageBody::Text(text) => normalize(text),
        PageBody::Html(html) => normalize(&html_to_text(html)),
        PageBody::Tree(tree) => normalize(&flatten_tree(tree)),
    }
}

/// Normalize text until it stops changing.
///
/// Every pass either leaves the text alone or shortens it, so this
/// terminates, and the result is a fixed point: normalizing it again is a
/// no-op.
pub fn normalize(text: &str) -> String {
    let mut current = text.replace("\r\n", "\n").replace('\r', "\n");
    loop {
        let next = unescape_delimiters(&decode_entities(&strip_invisible(&current)));
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_invisible(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
            )
        })
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect()
}

/// Decode the handful of entities editors emit. Single left-to-right pass.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, replacement)) => {
                out.push_str(replacement);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn unescape_delimiters(text: &str) -> String {
    text.replace("\\[", "[").replace("\\]", "]")
}

/// Collect every string leaf of a block tree, depth-first, one per line.
pub fn flatten_tree(tree: &Value) -> String {
    let mut leaves = Vec::new();
    collect_leaves(tree, &mut leaves);
    leaves.join("\n")
}

fn collect_leaves<'a>(value: &'a Value, leaves: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => leaves.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_leaves(v, leaves)),
        Value::Object(map) => map.values().for_each(|v| collect_leaves(v, leaves)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Reduce HTML to text, breaking lines at block elements.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    walk(fragment.root_element(), &mut out);
    out
}

fn walk(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            let is_block = BLOCK_ELEMENTS.contains(&child_element.value().name());
            if is_block && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            walk(child_element, out);
            if is_block && !out.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}
