//! Line classification shared by the line-oriented passes.
//!
//! A document is split into chunks of consecutive lines:
//!
//! - [`Chunk::Plain`]: ordinary Markdown lines a pass may rewrite,
//! - [`Chunk::Fence`]: a complete, not yet rendered ```` ``` ```` block,
//! - [`Chunk::Markup`]: lines already emitted as HTML (or raw HTML written
//!   by the author): a single tag line, or a container tag through its
//!   matching close tag.
//!
//! Passes rewrite `Plain` chunks only, which is what keeps a later pass from
//! re-interpreting the output of an earlier one.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*```[ \t]*([A-Za-z0-9_+#.-]*)[ \t]*$").unwrap());
static RE_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*```[ \t]*$").unwrap());
static RE_LEADING_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(/?)([A-Za-z][A-Za-z0-9]*)(?:[\s>/]|$)").unwrap());

/// Tags whose content may span several lines.
const CONTAINERS: &[&str] = &["blockquote", "div", "ol", "pre", "table", "ul"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk<'a> {
    Plain(Vec<&'a str>),
    Fence {
        lang: &'a str,
        body: Vec<&'a str>,
    },
    Markup(Vec<&'a str>),
}

/// Split `text` into chunks. Joining every chunk's lines with `\n`, in order,
/// reproduces `text`'s lines exactly (fence delimiters excepted).
pub fn split_chunks(text: &str) -> Vec<Chunk<'_>> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut chunks = Vec::new();
    let mut plain: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(caps) = RE_FENCE_OPEN.captures(line) {
            if let Some(close) = (i + 1..lines.len()).find(|&j| RE_FENCE_CLOSE.is_match(lines[j])) {
                flush(&mut chunks, &mut plain);
                let lang = caps.get(1).map_or("", |m| m.as_str());
                chunks.push(Chunk::Fence {
                    lang,
                    body: lines[i + 1..close].to_vec(),
                });
                i = close + 1;
                continue;
            }
        }

        if let Some(end) = markup_extent(&lines, i) {
            flush(&mut chunks, &mut plain);
            chunks.push(Chunk::Markup(lines[i..=end].to_vec()));
            i = end + 1;
            continue;
        }

        plain.push(line);
        i += 1;
    }

    flush(&mut chunks, &mut plain);
    chunks
}

fn flush<'a>(chunks: &mut Vec<Chunk<'a>>, plain: &mut Vec<&'a str>) {
    if !plain.is_empty() {
        chunks.push(Chunk::Plain(std::mem::take(plain)));
    }
}

/// If line `i` starts with a tag, the index of the last line it covers.
fn markup_extent(lines: &[&str], i: usize) -> Option<usize> {
    let caps = RE_LEADING_TAG.captures(lines[i])?;
    let closing = !caps[1].is_empty();
    let name = caps[2].to_ascii_lowercase();
    if closing || !CONTAINERS.contains(&name.as_str()) {
        return Some(i);
    }

    let close = format!("</{name}>");
    let mut depth = 0usize;
    for (j, line) in lines.iter().enumerate().skip(i) {
        let line = line.to_ascii_lowercase();
        depth += count_open_tags(&line, &name);
        depth = depth.saturating_sub(line.matches(&close).count());
        if depth == 0 {
            return Some(j);
        }
    }
    // Unbalanced container: treat only the opening line as markup.
    Some(i)
}

/// Occurrences of `<name>`, `<name …>` or `<name/>` in a lowercased line.
fn count_open_tags(line: &str, name: &str) -> usize {
    let pat = format!("<{name}");
    line.match_indices(&pat)
        .filter(|(at, _)| {
            line[at + pat.len()..]
                .chars()
                .next()
                .map_or(true, |c| c == '>' || c == '/' || c.is_whitespace())
        })
        .count()
}

/// Rebuild a document from chunks, rendering each with the given closures.
pub fn rebuild<'a, P, F>(chunks: Vec<Chunk<'a>>, mut plain: P, mut fence: F) -> String
where
    P: FnMut(Vec<&'a str>) -> Vec<String>,
    F: FnMut(&'a str, Vec<&'a str>) -> Vec<String>,
{
    let mut out: Vec<String> = Vec::new();
    for chunk in chunks {
        match chunk {
            Chunk::Plain(lines) => out.extend(plain(lines)),
            Chunk::Fence { lang, body } => out.extend(fence(lang, body)),
            Chunk::Markup(lines) => out.extend(lines.into_iter().map(str::to_string)),
        }
    }
    out.join("\n")
}

/// Re-emit a fence unrendered, in canonical form.
pub fn keep_fence(lang: &str, body: Vec<&str>) -> Vec<String> {
    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format!("```{lang}"));
    lines.extend(body.into_iter().map(str::to_string));
    lines.push("```".to_string());
    lines
}
