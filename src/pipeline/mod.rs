//! Pipeline stages for Markdown-to-HTML conversion.
//!
//! Each submodule implements one transformation step; [`crate::engine`]
//! sequences them for a single document.
//!
//! ## Data Flow
//!
//! ```text
//! text ──▶ normalize ──▶ footnotes ──▶ block ──▶ inline ──▶ footnotes
//!          (LF only)     (extract)    (lines)   (spans)    (append list)
//! ```
//!
//! 1. [`normalize`]: reduce CRLF and bare CR line endings to LF
//! 2. [`footnotes`]: pull `[^id]: body` definitions into a per-call registry
//! 3. [`block`]: headers, rules, quotes, lists, fenced code, tables
//!    ([`table`]) and paragraphs, in a fixed order
//! 4. [`inline`]: links, images, emphasis, code spans, escapes,
//!    footnote citations and hard breaks
//! 5. [`footnotes`]: append the footnote list
//!
//! [`lines`] and [`markup`] hold the plumbing that keeps one pass from
//! re-reading what an earlier pass emitted. [`input`] is not a stage: it
//! loads document text for the async file/URL layer.

pub mod block;
pub mod footnotes;
pub mod inline;
pub mod input;
pub mod lines;
pub mod markup;
pub mod normalize;
pub mod table;
