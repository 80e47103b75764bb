//! Line-ending normalisation.
//!
//! Every later pass anchors its patterns on `\n`, so documents arriving with
//! Windows (`\r\n`) or classic Mac (`\r`) line endings are canonicalised
//! first.

/// Reduce CRLF and bare CR line terminators to LF.
pub fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}
