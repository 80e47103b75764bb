//! Footnotes: definition extraction, reference anchors and the end list.
//!
//! A [`FootnoteRegistry`] is created by the orchestrator for one conversion
//! and dropped when it returns. Nothing here is global, so concurrent
//! conversions never see each other's footnotes.

use super::lines;
use super::markup::escape_html;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Pattern for a footnote identifier, shared by definitions and citations.
pub const FOOTNOTE_ID: &str = r"[^\]\s]+";

static RE_DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\[\^({FOOTNOTE_ID})\]:[ \t]*(\S.*?)[ \t]*$")).unwrap()
});

/// Footnote bodies keyed by identifier, iterated in first-definition order.
///
/// Redefining an identifier replaces its body but keeps its position.
#[derive(Debug, Default, Clone)]
pub struct FootnoteRegistry {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl FootnoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, body: impl Into<String>) {
        let id = id.into();
        let body = body.into();
        match self.index.get(&id) {
            Some(&at) => self.entries[at].1 = body,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id, body));
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.index.get(id).map(|&at| self.entries[at].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, body)| (id.as_str(), body.as_str()))
    }
}

/// Remove every `[^id]: body` line from `text`, recording it in `registry`.
///
/// The removed line leaves an empty line behind so the text around it does
/// not merge into one paragraph. Lines inside fenced code are not definitions.
pub fn extract_definitions(text: &str, registry: &mut FootnoteRegistry) -> String {
    lines::rebuild(
        lines::split_chunks(text),
        |plain| {
            plain
                .into_iter()
                .map(|line| match RE_DEFINITION.captures(line) {
                    Some(caps) => {
                        registry.insert(&caps[1], &caps[2]);
                        String::new()
                    }
                    None => line.to_string(),
                })
                .collect()
        },
        lines::keep_fence,
    )
}

/// Superscript citation for a registered footnote.
///
/// Only the first citation carries the `fn-ref-{id}` anchor the back-link in
/// the footnote list points at.
pub fn render_reference(id: &str, first_citation: bool) -> String {
    let fragment = urlencoding::encode(id);
    let id = escape_html(id);
    if first_citation {
        format!(r##"<sup id="fn-ref-{id}"><a href="#fn-{fragment}">[{id}]</a></sup>"##)
    } else {
        format!(r##"<sup><a href="#fn-{fragment}">[{id}]</a></sup>"##)
    }
}

/// Append the footnote list to `html`, rendering each body with `render_body`.
///
/// Returns `html` unchanged when the registry is empty.
pub fn append_footnotes<F>(html: String, registry: &FootnoteRegistry, render_body: F) -> String
where
    F: Fn(&str) -> String,
{
    if registry.is_empty() {
        return html;
    }

    let mut out = html;
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str("<div class=\"footnotes\">\n<ol>");
    for (id, body) in registry.iter() {
        let fragment = urlencoding::encode(id);
        let id = escape_html(id);
        out.push_str(&format!(
            "\n<li id=\"fn-{id}\">{} <a href=\"#fn-ref-{fragment}\">\u{21A9}</a></li>",
            render_body(body)
        ));
    }
    out.push_str("\n</ol>\n</div>");
    out
}
