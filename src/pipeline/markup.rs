//! Markup helpers shared by the block and inline stages.
//!
//! Every pass after the first one runs over text that already contains
//! emitted HTML. Three tools keep the passes from stepping on each other:
//!
//! - [`escape_html`] for user text placed inside markup,
//! - [`replace_in_text`], a regex replacement that refuses matches whose
//!   endpoints fall inside emitted tag syntax or inside a `<code>` region,
//! - [`Shelf`], which parks rendered fragments behind private-use
//!   placeholders so later passes cannot see their contents.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::ops::Range;

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// ── Zones ────────────────────────────────────────────────────────────────────

static RE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>").unwrap());

/// Byte ranges of `text` that inline passes must leave alone.
#[derive(Debug, Default)]
struct Zones {
    /// Tag syntax (`<a href="…">`, `</em>`, `<br/>`), outside code regions.
    tags: Vec<Range<usize>>,
    /// Whole `<code …>…</code>` regions, tags included.
    code: Vec<Range<usize>>,
}

impl Zones {
    fn scan(text: &str) -> Self {
        let mut zones = Zones::default();
        let mut open_code: Option<usize> = None;

        for m in RE_TAG.find_iter(text) {
            let tag = m.as_str();
            match open_code {
                Some(start) => {
                    if tag.eq_ignore_ascii_case("</code>") {
                        zones.code.push(start..m.end());
                        open_code = None;
                    }
                }
                None if is_code_open(tag) => open_code = Some(m.start()),
                None => zones.tags.push(m.range()),
            }
        }
        // An unclosed <code> protects the rest of the text.
        if let Some(start) = open_code {
            zones.code.push(start..text.len());
        }
        zones
    }

    /// True when a match over `start..end` must be rejected.
    fn rejects(&self, start: usize, end: usize) -> bool {
        let last = end.saturating_sub(1).max(start);
        inside(&self.tags, start) || inside(&self.tags, last) || overlaps(&self.code, start, end)
    }
}

/// True when every tag opened in `fragment` is also closed in it, innermost
/// first. Void and self-closing tags are ignored.
pub fn tags_balanced(fragment: &str) -> bool {
    let mut open: Vec<String> = Vec::new();
    for m in RE_TAG.find_iter(fragment) {
        let tag = m.as_str();
        if tag.ends_with("/>") {
            continue;
        }
        let closing = tag.starts_with("</");
        let name = tag
            .trim_start_matches('<')
            .trim_start_matches('/')
            .split(|c: char| c.is_whitespace() || c == '>')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if matches!(name.as_str(), "br" | "hr" | "img") {
            continue;
        }
        if closing {
            if open.pop().as_deref() != Some(name.as_str()) {
                return false;
            }
        } else {
            open.push(name);
        }
    }
    open.is_empty()
}

fn is_code_open(tag: &str) -> bool {
    let lower = tag.to_ascii_lowercase();
    lower == "<code>" || lower.starts_with("<code ")
}

/// `ranges` is sorted and non-overlapping.
fn inside(ranges: &[Range<usize>], pos: usize) -> bool {
    let idx = ranges.partition_point(|r| r.start <= pos);
    idx > 0 && pos < ranges[idx - 1].end
}

fn overlaps(ranges: &[Range<usize>], start: usize, end: usize) -> bool {
    let idx = ranges.partition_point(|r| r.start < end);
    idx > 0 && ranges[idx - 1].end > start
}

/// Byte offset just past the character at `at` (or past the end).
fn step_past(text: &str, at: usize) -> usize {
    text[at..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| at + c.len_utf8())
}

/// Replace matches of `re` in `text`, skipping emitted markup.
///
/// `rewrite` returns `None` to decline a match; the search then resumes one
/// character after the declined match's start, so a shorter or later match
/// overlapping it can still be found. Matches touching tag syntax or a
/// `<code>` region are declined without calling `rewrite`.
pub fn replace_in_text<F>(re: &Regex, text: &str, mut rewrite: F) -> String
where
    F: FnMut(&Captures<'_>) -> Option<String>,
{
    let zones = Zones::scan(text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut pos = 0;

    while pos <= text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let Some(m) = caps.get(0) else {
            break;
        };

        let replacement = if zones.rejects(m.start(), m.end()) {
            None
        } else {
            rewrite(&caps)
        };

        match replacement {
            Some(replacement) => {
                out.push_str(&text[copied..m.start()]);
                out.push_str(&replacement);
                copied = m.end();
                pos = if m.end() > m.start() {
                    m.end()
                } else {
                    step_past(text, m.end())
                };
            }
            None => pos = step_past(text, m.start()),
        }
    }

    out.push_str(&text[copied..]);
    out
}

// ── Shelf ────────────────────────────────────────────────────────────────────

/// Sentinels used by the shelves of the inline stage.
pub const CODE_SENTINELS: (char, char) = ('\u{E000}', '\u{E001}');
pub const ESCAPE_SENTINELS: (char, char) = ('\u{E002}', '\u{E003}');

/// Replace any stray sentinel characters in user text with U+FFFD.
pub fn strip_sentinels(text: &str) -> Cow<'_, str> {
    let is_sentinel = |c: char| ('\u{E000}'..='\u{E003}').contains(&c);
    if text.contains(is_sentinel) {
        Cow::Owned(text.replace(is_sentinel, "\u{FFFD}"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Rendered fragments parked behind `{open}{index}{close}` placeholders.
#[derive(Debug)]
pub struct Shelf {
    open: char,
    close: char,
    items: Vec<String>,
}

impl Shelf {
    pub fn new((open, close): (char, char)) -> Self {
        Self {
            open,
            close,
            items: Vec::new(),
        }
    }

    /// Park `fragment` and return the placeholder standing in for it.
    pub fn stash(&mut self, fragment: String) -> String {
        let token = format!("{}{}{}", self.open, self.items.len(), self.close);
        self.items.push(fragment);
        token
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Swap every placeholder in `text` back for its fragment.
    pub fn restore(&self, text: &str) -> String {
        if self.items.is_empty() {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(at) = rest.find(self.open) {
            out.push_str(&rest[..at]);
            let after = &rest[at + self.open.len_utf8()..];
            let item = after.find(self.close).and_then(|end| {
                after[..end]
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.items.get(idx))
                    .map(|item| (item, end))
            });
            match item {
                Some((item, end)) => {
                    out.push_str(item);
                    rest = &after[end + self.close.len_utf8()..];
                }
                None => {
                    out.push(self.open);
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_five() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn replace_skips_tag_attributes() {
        let re = Regex::new(r"_([^_]+)_").unwrap();
        let text = r#"<a href="/a_b_c">link</a> and _this_"#;
        let out = replace_in_text(&re, text, |c| Some(format!("<em>{}</em>", &c[1])));
        assert_eq!(out, r#"<a href="/a_b_c">link</a> and <em>this</em>"#);
    }

    #[test]
    fn replace_skips_code_regions() {
        let re = Regex::new(r"\*([^*]+)\*").unwrap();
        let text = "<code>*raw*</code> *em*";
        let out = replace_in_text(&re, text, |c| Some(format!("<em>{}</em>", &c[1])));
        assert_eq!(out, "<code>*raw*</code> <em>em</em>");
    }

    #[test]
    fn declined_match_retries_one_char_later() {
        let re = Regex::new(r"ab").unwrap();
        let mut seen = 0;
        let out = replace_in_text(&re, "ab ab", |_| {
            seen += 1;
            (seen == 2).then(|| "X".to_string())
        });
        assert_eq!(out, "ab X");
    }

    #[test]
    fn spans_across_tags_are_allowed() {
        let re = Regex::new(r"\*\*(.+?)\*\*").unwrap();
        let text = r#"**<a href="u">x</a>**"#;
        let out = replace_in_text(&re, text, |c| Some(format!("<strong>{}</strong>", &c[1])));
        assert_eq!(out, r#"<strong><a href="u">x</a></strong>"#);
    }

    #[test]
    fn balanced_tags() {
        assert!(tags_balanced("a <strong>b</strong> <br/> c"));
        assert!(tags_balanced(r#"<a href="u"><em>x</em></a>"#));
        assert!(!tags_balanced("a <strong>b"));
        assert!(!tags_balanced("b</strong> c"));
        assert!(!tags_balanced("<em><strong>x</em></strong>"));
    }

    #[test]
    fn shelf_round_trip() {
        let mut shelf = Shelf::new(CODE_SENTINELS);
        let a = shelf.stash("<code>a</code>".into());
        let b = shelf.stash("<code>b</code>".into());
        let text = format!("x {a} y {b}");
        assert_eq!(shelf.restore(&text), "x <code>a</code> y <code>b</code>");
    }

    #[test]
    fn shelf_leaves_unknown_placeholders() {
        let shelf = {
            let mut s = Shelf::new(CODE_SENTINELS);
            s.stash("z".into());
            s
        };
        let text = "\u{E000}9\u{E001}";
        assert_eq!(shelf.restore(text), text);
    }

    #[test]
    fn strip_sentinels_replaces_private_use_markers() {
        assert_eq!(strip_sentinels("a\u{E000}b"), "a\u{FFFD}b");
        assert!(matches!(strip_sentinels("plain"), Cow::Borrowed(_)));
    }
}
