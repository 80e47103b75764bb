//! Integration tests for the conversion engine.
//!
//! Everything here goes through the public `convert` / `convert_with` entry
//! points only; stage-level behaviour is covered by the unit tests next to
//! each pipeline module.

use md2html::{convert, convert_with, ConversionConfig};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Position of `needle` in `html`, failing the test if it is missing.
fn pos(html: &str, needle: &str) -> usize {
    html.find(needle)
        .unwrap_or_else(|| panic!("expected {needle:?} in output:\n{html}"))
}

const DOCUMENT: &str = "Title
=====

Intro with a [link](https://x.io) and `code`.

> quoted *text*

1. one
2. two

```rust
let x = 1 < 2;
```

Done[^n].

[^n]: The **end**.";

// ── Whole documents ──────────────────────────────────────────────────────────

#[test]
fn test_full_document() {
    let expected = "<h1>Title</h1>
<p>Intro with a <a href=\"https://x.io\">link</a> and <code>code</code>.</p>
<blockquote>quoted <em>text</em></blockquote>
<ol>
<li>one</li>
<li>two</li>
</ol>
<pre><code class=\"language-rust\">let x = 1 &lt; 2;</code></pre>
<p>Done<sup id=\"fn-ref-n\"><a href=\"#fn-n\">[n]</a></sup>.</p>
<div class=\"footnotes\">
<ol>
<li id=\"fn-n\">The <strong>end</strong>. <a href=\"#fn-ref-n\">\u{21A9}</a></li>
</ol>
</div>";
    assert_eq!(convert(DOCUMENT), expected);
}

#[test]
fn test_conversion_is_deterministic() {
    let first = convert(DOCUMENT);
    for _ in 0..5 {
        assert_eq!(convert(DOCUMENT), first);
    }
}

#[test]
fn test_empty_and_whitespace_input() {
    assert_eq!(convert(""), "");
    assert_eq!(convert("   "), "");
    assert_eq!(convert("\n\n\t\n"), "");
}

#[test]
fn test_crlf_documents_match_lf() {
    let crlf = DOCUMENT.replace('\n', "\r\n");
    assert_eq!(convert(&crlf), convert(DOCUMENT));
}

// ── Footnotes ────────────────────────────────────────────────────────────────

#[test]
fn test_footnote_definitions_are_removed() {
    let html = convert("Text[^a].\n\n[^a]: Ay\n\nMore text.");
    assert!(!html.contains("[^a]:"), "definition leaked:\n{html}");
    assert!(html.contains("<p>More text.</p>"));
}

#[test]
fn test_unregistered_footnote_is_verbatim() {
    assert_eq!(convert("see [^nope] here"), "<p>see [^nope] here</p>");
}

#[test]
fn test_footnote_ids_with_spaces_are_plain_text() {
    let html = convert("x[^my note]\n\n[^my note]: body");
    assert_eq!(html, "<p>x[^my note]</p>\n<p>[^my note]: body</p>");
}

#[test]
fn test_footnotes_listed_in_definition_order() {
    // Cited a then b, defined b then a.
    let html = convert("One[^a] two[^b].\n\n[^b]: Bee\n[^a]: Ay");
    assert!(pos(&html, "<li id=\"fn-b\">") < pos(&html, "<li id=\"fn-a\">"));
}

#[test]
fn test_last_footnote_definition_wins() {
    let html = convert("x[^d]\n\n[^d]: first\n[^d]: second");
    assert!(html.contains("<li id=\"fn-d\">second "));
    assert!(!html.contains("first"));
}

#[test]
fn test_repeated_citation_has_single_anchor() {
    let html = convert("a[^1] b[^1]\n\n[^1]: note");
    assert_eq!(html.matches("id=\"fn-ref-1\"").count(), 1);
    assert_eq!(html.matches("href=\"#fn-1\"").count(), 2);
}

// ── Escaping ─────────────────────────────────────────────────────────────────

#[test]
fn test_html_significant_characters_are_escaped() {
    let md = "`<a>`\n\n| h |\n|---|\n| <x> & \"q\" |\n\n![a \"b\" <c>](/i.png)\n\n```\n<tag attr='v'>\n```";
    let html = convert(md);

    assert!(html.contains("<code>&lt;a&gt;</code>"), "code span:\n{html}");
    assert!(html.contains("<td>&lt;x&gt; &amp; &quot;q&quot;</td>"), "table cell:\n{html}");
    assert!(
        html.contains("<img src=\"/i.png\" alt=\"a &quot;b&quot; &lt;c&gt;\"/>"),
        "image alt:\n{html}"
    );
    assert!(
        html.contains("<pre><code>&lt;tag attr=&#39;v&#39;&gt;</code></pre>"),
        "fenced code:\n{html}"
    );
}

#[test]
fn test_emitted_tags_are_not_double_escaped() {
    let html = convert("[q](/a?b=1&c=2)");
    assert_eq!(html, "<p><a href=\"/a?b=1&amp;c=2\">q</a></p>");
    assert!(!html.contains("&amp;amp;"));
}

#[test]
fn test_table_cell_spans_are_escaped_once() {
    let html = convert("A|B\n-|-\n`<b>`|[l](x?a=1&b=2)");
    assert!(
        html.contains("<td><code>&lt;b&gt;</code></td><td><a href=\"x?a=1&amp;b=2\">l</a></td>"),
        "table cell:\n{html}"
    );
    assert!(!html.contains("&amp;amp;") && !html.contains("&amp;lt;"), "{html}");
}

#[test]
fn test_backslash_escapes_are_literal() {
    assert_eq!(
        convert(r"\*literal\* and \_x\_"),
        "<p>*literal* and _x_</p>"
    );
}

// ── Blocks ───────────────────────────────────────────────────────────────────

#[test]
fn test_strong_wraps_em() {
    assert_eq!(
        convert("**a *b* c**"),
        "<p><strong>a <em>b</em> c</strong></p>"
    );
}

#[test]
fn test_triple_delimiters_nest() {
    assert_eq!(convert("***x***"), "<p><strong><em>x</em></strong></p>");
    assert_eq!(
        convert("**bold *em***"),
        "<p><strong>bold <em>em</em></strong></p>"
    );
}

#[test]
fn test_table_alignment() {
    let html = convert("A|B\n:--|--:\n1|2");
    assert!(html.contains("<th style=\"text-align:left\">A</th>"));
    assert!(html.contains("<th style=\"text-align:right\">B</th>"));
    assert!(html.contains("<td style=\"text-align:left\">1</td>"));
    assert!(html.contains("<td style=\"text-align:right\">2</td>"));
}

#[test]
fn test_adjacent_items_form_one_list() {
    assert_eq!(
        convert("- a\n- b\n- c"),
        "<ul>\n<li>a</li>\n<li>b</li>\n<li>c</li>\n</ul>"
    );
}

#[test]
fn test_list_directly_followed_by_table() {
    let html = convert("- a\nA|B\n-|-\n1|2");
    assert!(
        html.starts_with("<ul>\n<li>a</li>\n</ul>\n<table>"),
        "got:\n{html}"
    );
}

#[test]
fn test_setext_rule_and_header_are_distinguished() {
    assert_eq!(convert("Text\n---"), "<h2>Text</h2>");
    assert_eq!(convert("Text\n\n---"), "<p>Text</p>\n<hr/>");
}

#[test]
fn test_nested_blockquote() {
    assert_eq!(
        convert("> > deep"),
        "<blockquote><blockquote>deep</blockquote></blockquote>"
    );
}

#[test]
fn test_hard_line_break() {
    assert_eq!(convert("a  \nb"), "<p>a<br/>\nb</p>");
}

#[test]
fn test_trailing_spaces_inside_fence_are_kept() {
    assert_eq!(convert("```\na  \nb\n```"), "<pre><code>a  \nb</code></pre>");
}

#[test]
fn test_unterminated_fence_is_plain_text() {
    let html = convert("```\nnot closed");
    assert!(!html.contains("<pre>"));
    assert!(html.contains("not closed"));
}

// ── Configuration ────────────────────────────────────────────────────────────

#[test]
fn test_disabled_passes_leave_text() {
    let config = ConversionConfig::builder()
        .tables(false)
        .strikethrough(false)
        .build()
        .unwrap();
    let html = convert_with("~~x~~\n\nA|B\n-|-\n1|2", &config);
    assert!(html.contains("~~x~~"));
    assert!(!html.contains("<table>"));
}

#[test]
fn test_oversized_input_degrades_to_error_paragraph() {
    let config = ConversionConfig::builder()
        .max_input_bytes(Some(8))
        .build()
        .unwrap();
    let html = convert_with("# far too long", &config);
    assert!(html.starts_with("<p class=\"error\">Conversion error: "));
    assert!(html.ends_with("</p>"));
}

// ── Concurrency ──────────────────────────────────────────────────────────────

#[test]
fn test_concurrent_conversions_do_not_share_footnotes() {
    let docs: Vec<String> = (0..8)
        .map(|i| format!("Body {i}[^f{i}]\n\n[^f{i}]: note {i}"))
        .collect();
    let expected: Vec<String> = docs.iter().map(|d| convert(d)).collect();

    std::thread::scope(|scope| {
        for (i, doc) in docs.iter().enumerate() {
            let expected = &expected[i];
            scope.spawn(move || {
                for _ in 0..50 {
                    let html = convert(doc);
                    assert_eq!(&html, expected);
                    assert_eq!(html.matches("<li id=").count(), 1);
                }
            });
        }
    });
}
