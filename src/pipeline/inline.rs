//! Inline stage: spans inside block text.
//!
//! Code spans and backslash escapes are parked on [`Shelf`]s before any
//! other pass runs, so link and emphasis patterns never see their contents.
//! They are put back at their own positions in the pass order (8 and 9),
//! after which the footnote-reference and line-break passes run.

use super::footnotes::{render_reference, FootnoteRegistry, FOOTNOTE_ID};
use super::markup::{
    escape_html, replace_in_text, strip_sentinels, tags_balanced, Shelf, CODE_SENTINELS,
    ESCAPE_SENTINELS,
};
use crate::config::ConversionConfig;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::ops::Range;

static RE_CODE_DOUBLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"``([^\n]+?)``").unwrap());
static RE_CODE_SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
static RE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\\([\\`*{}\[\]()#+\-.!_>~|"'])"#).unwrap());

static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]\n]+)\]\(([^)\s]+)\)").unwrap());
static RE_AUTOLINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(https?://[^\s<>]+)>").unwrap());
static RE_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,})>").unwrap()
});
static RE_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]\n]*)\]\(([^)\s]+)\)(?:\{([^}\n]+)\})?").unwrap()
});

// Extra delimiters next to the strong markers (`***x***`) stay inside the
// strong element, where the emphasis pass pairs them up.
static RE_STRONG_STAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*(\**)([^\s*](?:[^\n]*?[^\s*])?)(\**)\*\*").unwrap()
});
static RE_STRONG_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__(_*)([^\s_](?:[^\n]*?[^\s_])?)(_*)__").unwrap());
static RE_EM_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^\s*](?:[^\n]*?[^\s*])?)\*").unwrap());
static RE_EM_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_([^\s_](?:[^\n]*?[^\s_])?)_").unwrap());
static RE_STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~(\S(?:[^\n]*?\S)?)~~").unwrap());

static RE_FOOTNOTE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\[\^({FOOTNOTE_ID})\]")).unwrap());
static RE_HARD_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}\n").unwrap());

/// Render inline spans in `text`.
///
/// `footnotes` is the registry used to link `[^id]` citations; pass `None`
/// to leave every citation verbatim (footnote bodies, footnotes disabled).
pub fn process_inline(
    text: &str,
    config: &ConversionConfig,
    footnotes: Option<&FootnoteRegistry>,
) -> String {
    let text = strip_sentinels(text);

    let mut code = Shelf::new(CODE_SENTINELS);
    let mut escapes = Shelf::new(ESCAPE_SENTINELS);
    let s = shelve_code_spans(&text, &mut code);
    let s = shelve_escapes(&s, &mut escapes);

    // ── Passes 1–4: links and images ──
    let s = links(&s);
    let s = replace_in_text(&RE_AUTOLINK, &s, |c| {
        let url = escape_html(&c[1]);
        Some(format!("<a href=\"{url}\">{url}</a>"))
    });
    let s = replace_in_text(&RE_EMAIL, &s, |c| {
        let addr = escape_html(&c[1]);
        Some(format!("<a href=\"mailto:{addr}\">{addr}</a>"))
    });
    let s = images(&s);

    // ── Passes 5–7: emphasis ──
    let s = replace_in_text(&RE_STRONG_STAR, &s, wrap_strong);
    let s = replace_in_text(&RE_STRONG_UNDERSCORE, &s, |c| {
        if outside_word(&s, c) {
            wrap_strong(c)
        } else {
            None
        }
    });
    let s = replace_in_text(&RE_EM_STAR, &s, |c| wrap("em", c));
    let s = replace_in_text(&RE_EM_UNDERSCORE, &s, |c| {
        if outside_word(&s, c) {
            wrap("em", c)
        } else {
            None
        }
    });
    let s = if config.strikethrough {
        replace_in_text(&RE_STRIKE, &s, |c| wrap("s", c))
    } else {
        s
    };

    // ── Passes 8–9: code spans and escapes come back ──
    let s = code.restore(&s);
    let s = escapes.restore(&s);

    // ── Pass 10: footnote references ──
    let s = match footnotes {
        Some(registry) if !registry.is_empty() => footnote_references(&s, registry),
        _ => s,
    };

    // ── Pass 11: hard line breaks ──
    replace_in_text(&RE_HARD_BREAK, &s, |_| Some("<br/>\n".to_string()))
}

/// Wrap capture 1 in `tag`, unless that would interleave with tags already
/// emitted inside it.
fn wrap(tag: &str, caps: &Captures<'_>) -> Option<String> {
    let body = &caps[1];
    tags_balanced(body).then(|| format!("<{tag}>{body}</{tag}>"))
}

fn wrap_strong(caps: &Captures<'_>) -> Option<String> {
    let body = format!("{}{}{}", &caps[1], &caps[2], &caps[3]);
    tags_balanced(&body).then(|| format!("<strong>{body}</strong>"))
}

/// Underscore delimiters must not touch a word character on their outer side.
fn outside_word(text: &str, caps: &Captures<'_>) -> bool {
    let Some(m) = caps.get(0) else {
        return false;
    };
    let before = text[..m.start()].chars().next_back();
    let after = text[m.end()..].chars().next();
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    !is_word(before) && !is_word(after)
}

/// True when an odd number of backslashes sits right before `at`.
fn is_escaped(text: &str, at: usize) -> bool {
    text[..at].chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn shelve_code_spans(text: &str, shelf: &mut Shelf) -> String {
    let mut stash = |re: &Regex, text: &str| {
        replace_in_text(re, text, |c| {
            let m = c.get(0)?;
            if is_escaped(text, m.start()) {
                return None;
            }
            let body = escape_html(c[1].trim());
            Some(shelf.stash(format!("<code>{body}</code>")))
        })
    };
    let s = stash(&RE_CODE_DOUBLE, text);
    stash(&RE_CODE_SINGLE, &s)
}

fn shelve_escapes(text: &str, shelf: &mut Shelf) -> String {
    replace_in_text(&RE_ESCAPE, text, |c| Some(shelf.stash(escape_html(&c[1]))))
}

fn links(text: &str) -> String {
    replace_in_text(&RE_LINK, text, |c| {
        let m = c.get(0)?;
        if text[..m.start()].ends_with('!') || c[1].starts_with('^') {
            return None;
        }
        Some(format!(
            "<a href=\"{}\">{}</a>",
            escape_html(&c[2]),
            &c[1]
        ))
    })
}

fn images(text: &str) -> String {
    replace_in_text(&RE_IMAGE, text, |c| {
        let src = escape_html(&c[2]);
        let alt = escape_html(&c[1]);
        let attrs = c
            .get(3)
            .map(|a| a.as_str().trim())
            .filter(|a| !a.is_empty())
            .map(|a| format!(" {a}"))
            .unwrap_or_default();
        Some(format!("<img src=\"{src}\" alt=\"{alt}\"{attrs}/>"))
    })
}

/// Escape text that this stage will render later, leaving raw the parts it
/// escapes itself: code spans, backslash escapes, images, autolinks and link
/// destinations. Table cells go through this at the block stage.
pub fn escape_outside_spans(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some((range, raw)) = next_raw_span(text, pos) {
        out.push_str(&escape_html(&text[pos..range.start]));
        out.push_str(&raw);
        pos = range.end;
    }
    out.push_str(&escape_html(&text[pos..]));
    out
}

/// The earliest span at or after `from` that the passes above would take,
/// with the text it should keep. Ties go to the pass that runs first.
fn next_raw_span(text: &str, from: usize) -> Option<(Range<usize>, String)> {
    let verbatim = |c: &Captures<'_>| c[0].to_string();
    let not_escaped = |c: &Captures<'_>| c.get(0).is_some_and(|m| !is_escaped(text, m.start()));

    let candidates = [
        first_accepted(&RE_CODE_DOUBLE, text, from, not_escaped, verbatim),
        first_accepted(&RE_CODE_SINGLE, text, from, not_escaped, verbatim),
        first_accepted(&RE_ESCAPE, text, from, |_| true, verbatim),
        first_accepted(&RE_IMAGE, text, from, |_| true, verbatim),
        first_accepted(
            &RE_LINK,
            text,
            from,
            |c| {
                c.get(0).is_some_and(|m| {
                    let bang = m.start() > 0
                        && text[..m.start()].ends_with('!')
                        && !is_escaped(text, m.start() - 1);
                    !bang && !c[1].starts_with('^')
                })
            },
            |c| format!("[{}]({})", escape_outside_spans(&c[1]), &c[2]),
        ),
        first_accepted(&RE_AUTOLINK, text, from, |_| true, verbatim),
        first_accepted(&RE_EMAIL, text, from, |_| true, verbatim),
    ];

    let mut best: Option<(Range<usize>, String)> = None;
    for candidate in candidates.into_iter().flatten() {
        if best.as_ref().map_or(true, |(b, _)| candidate.0.start < b.start) {
            best = Some(candidate);
        }
    }
    best
}

fn first_accepted<'t>(
    re: &Regex,
    text: &'t str,
    from: usize,
    accept: impl Fn(&Captures<'t>) -> bool,
    keep: impl Fn(&Captures<'t>) -> String,
) -> Option<(Range<usize>, String)> {
    let mut pos = from;
    while pos <= text.len() {
        let caps = re.captures_at(text, pos)?;
        let m = caps.get(0)?;
        if accept(&caps) {
            return Some((m.range(), keep(&caps)));
        }
        pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

fn footnote_references(text: &str, registry: &FootnoteRegistry) -> String {
    let mut cited: HashSet<String> = HashSet::new();
    replace_in_text(&RE_FOOTNOTE_REF, text, |c| {
        let id = &c[1];
        if !registry.contains(id) {
            return None;
        }
        let first = cited.insert(id.to_string());
        Some(render_reference(id, first))
    })
}
