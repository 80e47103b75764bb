//! Block stage: turn line structure into block-level HTML.
//!
//! ## Pass Order
//!
//! Passes run in a fixed order and each one only rewrites *plain* lines (see
//! [`super::lines`]), so nothing emitted by an earlier pass is matched again:
//!
//! 1. Setext headers (`Title` over `===` / `---`)
//! 2. ATX headers (`# Title`)
//! 3. Horizontal rules (`***`, `- - -`, `___`)
//! 4. Blockquotes (`> quoted`)
//! 5. Lists (`- item`, `1. item`)
//! 6. Fenced code blocks
//! 7. Tables
//! 8. Paragraphs
//!
//! Setext must precede rules so `Title\n---` is a header, rules must precede
//! lists so `* * *` is a rule, and paragraphs come last so they only wrap
//! what no other pass claimed. Fenced code is only *rendered* at step 6, but
//! its lines are never plain, so steps 1–5 cannot reach into it.

use super::lines::{self, keep_fence};
use super::markup::escape_html;
use super::table;
use crate::config::ConversionConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static RE_SETEXT_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"^=+[ \t]*$").unwrap());
static RE_SETEXT_H2: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-+[ \t]*$").unwrap());
static RE_ATX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*)$").unwrap());
static RE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>(?:[ \t]+(.*))?$").unwrap());
static RE_UNORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*[*+-][ \t]+(.*)$").unwrap());
static RE_ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*(\d+)\.[ \t]+(.*)$").unwrap());

/// Apply every block pass to `text`, in order.
pub fn process_blocks(text: &str, config: &ConversionConfig) -> String {
    let s = setext_headers(text);
    let s = atx_headers(&s);
    let s = horizontal_rules(&s);
    let s = blockquotes(&s);
    let s = lists(&s);
    let s = fenced_code(&s);
    let s = if config.tables {
        table::render_tables(&s)
    } else {
        s
    };
    trace!("block passes done before paragraphs: {} bytes", s.len());
    paragraphs(&s)
}

/// Run `plain` over the plain chunks of `text`, leaving everything else.
fn map_plain<F>(text: &str, plain: F) -> String
where
    F: FnMut(Vec<&str>) -> Vec<String>,
{
    lines::rebuild(lines::split_chunks(text), plain, keep_fence)
}

// ── Pass 1: Setext headers ───────────────────────────────────────────────────

fn setext_headers(text: &str) -> String {
    map_plain(text, |lines| {
        let mut out = Vec::with_capacity(lines.len());
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let level = match lines.get(i + 1) {
                Some(next) if can_title_setext(line) => {
                    if RE_SETEXT_H1.is_match(next) {
                        Some(1)
                    } else if RE_SETEXT_H2.is_match(next) {
                        Some(2)
                    } else {
                        None
                    }
                }
                _ => None,
            };
            match level {
                Some(level) => {
                    out.push(format!("<h{level}>{}</h{level}>", line.trim()));
                    i += 2;
                }
                None => {
                    out.push(line.to_string());
                    i += 1;
                }
            }
        }
        out
    })
}

/// A line that could be the text of a setext header.
fn can_title_setext(line: &str) -> bool {
    !line.trim().is_empty()
        && !RE_ATX.is_match(line)
        && !RE_QUOTE.is_match(line)
        && !RE_UNORDERED.is_match(line)
        && !RE_ORDERED.is_match(line)
        && !is_horizontal_rule(line)
}

// ── Pass 2: ATX headers ──────────────────────────────────────────────────────

fn atx_headers(text: &str) -> String {
    map_plain(text, |lines| {
        lines
            .into_iter()
            .map(|line| match RE_ATX.captures(line) {
                Some(caps) => {
                    let level = caps[1].len();
                    let title = strip_closing_hashes(&caps[2]);
                    format!("<h{level}>{title}</h{level}>")
                }
                None => line.to_string(),
            })
            .collect()
    })
}

/// Drop trailing whitespace and a closing `#` run set off by whitespace.
fn strip_closing_hashes(title: &str) -> &str {
    let title = title.trim_end();
    let without = title.trim_end_matches('#');
    if without.len() == title.len() {
        title
    } else if without.is_empty() {
        ""
    } else if without.ends_with([' ', '\t']) {
        without.trim_end()
    } else {
        title
    }
}

// ── Pass 3: Horizontal rules ─────────────────────────────────────────────────

/// Three or more of the same `*`, `-` or `_`, optionally spaced out.
pub fn is_horizontal_rule(line: &str) -> bool {
    let mut marks = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = marks.next() else {
        return false;
    };
    if !matches!(first, '*' | '-' | '_') {
        return false;
    }
    let mut count = 1;
    for c in marks {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

fn horizontal_rules(text: &str) -> String {
    map_plain(text, |lines| {
        lines
            .into_iter()
            .map(|line| {
                if is_horizontal_rule(line) {
                    "<hr/>".to_string()
                } else {
                    line.to_string()
                }
            })
            .collect()
    })
}

// ── Pass 4: Blockquotes ──────────────────────────────────────────────────────

fn blockquotes(text: &str) -> String {
    map_plain(text, quote_lines)
}

/// Wrap each run of `>` lines once, recursing for nested `> >` quotes.
fn quote_lines(lines: Vec<&str>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        if !RE_QUOTE.is_match(lines[i]) {
            out.push(lines[i].to_string());
            i += 1;
            continue;
        }

        let mut inner: Vec<&str> = Vec::new();
        while let Some(caps) = lines.get(i).and_then(|l| RE_QUOTE.captures(l)) {
            inner.push(caps.get(1).map_or("", |m| m.as_str()));
            i += 1;
        }
        let body = quote_lines(inner).join("\n");
        out.push(format!("<blockquote>{body}</blockquote>"));
    }
    out
}

// ── Pass 5: Lists ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

/// A run of contiguous list lines sharing one marker family.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListBlock {
    kind: ListKind,
    start: u64,
    items: Vec<String>,
}

impl ListBlock {
    fn render(&self) -> Vec<String> {
        let open = match self.kind {
            ListKind::Unordered => "<ul>".to_string(),
            ListKind::Ordered if self.start != 1 => format!("<ol start=\"{}\">", self.start),
            ListKind::Ordered => "<ol>".to_string(),
        };
        let close = match self.kind {
            ListKind::Unordered => "</ul>",
            ListKind::Ordered => "</ol>",
        };
        let mut out = Vec::with_capacity(self.items.len() + 2);
        out.push(open);
        out.extend(self.items.iter().map(|item| format!("<li>{item}</li>")));
        out.push(close.to_string());
        out
    }
}

/// Classify one line as a list item, returning its kind, number and text.
fn list_item(line: &str) -> Option<(ListKind, u64, &str)> {
    if let Some(caps) = RE_UNORDERED.captures(line) {
        let text = caps.get(1).map_or("", |m| m.as_str());
        return Some((ListKind::Unordered, 0, text.trim()));
    }
    let caps = RE_ORDERED.captures(line)?;
    let number = caps[1].parse().unwrap_or(1);
    let text = caps.get(2).map_or("", |m| m.as_str());
    Some((ListKind::Ordered, number, text.trim()))
}

fn lists(text: &str) -> String {
    map_plain(text, |lines| {
        let mut out = Vec::with_capacity(lines.len());
        let mut current: Option<ListBlock> = None;

        for line in lines {
            match list_item(line) {
                Some((kind, number, item)) => match current.as_mut() {
                    Some(block) if block.kind == kind => block.items.push(item.to_string()),
                    _ => {
                        if let Some(done) = current.take() {
                            out.extend(done.render());
                        }
                        current = Some(ListBlock {
                            kind,
                            start: number,
                            items: vec![item.to_string()],
                        });
                    }
                },
                None => {
                    if let Some(done) = current.take() {
                        out.extend(done.render());
                    }
                    out.push(line.to_string());
                }
            }
        }
        if let Some(done) = current {
            out.extend(done.render());
        }
        out
    })
}

// ── Pass 6: Fenced code ──────────────────────────────────────────────────────

fn fenced_code(text: &str) -> String {
    lines::rebuild(
        lines::split_chunks(text),
        |plain| plain.into_iter().map(str::to_string).collect(),
        |lang, body| vec![render_code_block(lang, &body)],
    )
}

fn render_code_block(lang: &str, body: &[&str]) -> String {
    let first = body.iter().position(|l| !l.trim().is_empty());
    let last = body.iter().rposition(|l| !l.trim().is_empty());
    let code = match (first, last) {
        (Some(first), Some(last)) => body[first..=last].join("\n"),
        _ => String::new(),
    };
    let code = escape_html(&code);
    if lang.is_empty() {
        format!("<pre><code>{code}</code></pre>")
    } else {
        format!(
            "<pre><code class=\"language-{}\">{code}</code></pre>",
            escape_html(lang)
        )
    }
}

// ── Pass 8: Paragraphs ───────────────────────────────────────────────────────

/// Wrap each run of non-blank plain lines in `<p>`; blank lines are dropped.
fn paragraphs(text: &str) -> String {
    map_plain(text, |lines| {
        let mut out = Vec::new();
        let mut run: Vec<&str> = Vec::new();
        for line in lines.into_iter().chain(std::iter::once("")) {
            if line.trim().is_empty() {
                if !run.is_empty() {
                    out.push(format!("<p>{}</p>", run.join("\n").trim()));
                    run.clear();
                }
            } else {
                run.push(line);
            }
        }
        out
    })
}
