//! Pipe tables: a header row, a separator row and one or more data rows.
//!
//! ```text
//! | Name | Qty |        Name | Qty
//! |:-----|----:|   or   :----|----:
//! | nut  |   4 |        nut  | 4
//! ```
//!
//! Leading and trailing pipes are optional. Cell text is HTML-escaped here,
//! except for the spans the inline stage escapes when it renders them
//! (code spans, link targets, images), so nothing is escaped twice.

use super::inline::escape_outside_spans;
use super::lines;

/// Column alignment parsed from one separator cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Default,
    Left,
    Center,
    Right,
}

impl Alignment {
    /// `:--:` → center, `:--` → left, `--:` → right, `---` → default.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match (token.starts_with(':'), token.ends_with(':')) {
            (true, true) => Alignment::Center,
            (true, false) => Alignment::Left,
            (false, true) => Alignment::Right,
            (false, false) => Alignment::Default,
        }
    }

    fn style_attr(self) -> &'static str {
        match self {
            Alignment::Default => "",
            Alignment::Left => " style=\"text-align:left\"",
            Alignment::Center => " style=\"text-align:center\"",
            Alignment::Right => " style=\"text-align:right\"",
        }
    }
}

/// One matched table, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub headers: Vec<String>,
    pub alignments: Vec<Alignment>,
    pub rows: Vec<Vec<String>>,
}

impl TableSpec {
    pub fn parse(header: &str, separator: &str, rows: &[&str]) -> Self {
        Self {
            headers: split_cells(header),
            alignments: split_cells(separator)
                .iter()
                .map(|t| Alignment::parse(t))
                .collect(),
            rows: rows.iter().map(|r| split_cells(r)).collect(),
        }
    }

    /// Alignment for column `idx`; columns past the separator are unstyled.
    fn alignment(&self, idx: usize) -> Alignment {
        self.alignments.get(idx).copied().unwrap_or_default()
    }

    pub fn render(&self) -> String {
        let mut html = String::from("<table>\n<thead>\n<tr>");
        for (i, cell) in self.headers.iter().enumerate() {
            html.push_str(&format!(
                "<th{}>{}</th>",
                self.alignment(i).style_attr(),
                escape_outside_spans(cell)
            ));
        }
        html.push_str("</tr>\n</thead>\n<tbody>");
        for row in &self.rows {
            html.push_str("\n<tr>");
            for (i, cell) in row.iter().enumerate() {
                html.push_str(&format!(
                    "<td{}>{}</td>",
                    self.alignment(i).style_attr(),
                    escape_outside_spans(cell)
                ));
            }
            html.push_str("</tr>");
        }
        html.push_str("\n</tbody>\n</table>");
        html
    }
}

/// Split a row into trimmed cells. `\|` is a literal pipe inside a cell.
fn split_cells(line: &str) -> Vec<String> {
    let mut row = line.trim();
    row = row.strip_prefix('|').unwrap_or(row);
    if row.ends_with('|') && !row.ends_with("\\|") {
        row = &row[..row.len() - 1];
    }

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = row.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    (trimmed.starts_with('|') && trimmed.len() > 1) || split_cells(trimmed).len() > 1
}

fn is_separator_row(line: &str) -> bool {
    if !line.contains('|') {
        return false;
    }
    split_cells(line).iter().all(|cell| {
        cell.contains('-') && cell.chars().all(|c| c == '-' || c == ':' || c == ' ')
    })
}

/// Render every table found in the plain lines of `text`.
pub fn render_tables(text: &str) -> String {
    lines::rebuild(lines::split_chunks(text), render_plain, lines::keep_fence)
}

fn render_plain(lines: Vec<&str>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let starts_table = is_table_row(lines[i])
            && lines.get(i + 1).is_some_and(|l| is_separator_row(l))
            && lines.get(i + 2).is_some_and(|l| is_table_row(l));

        if starts_table {
            let body_end = (i + 2..lines.len())
                .find(|&j| !is_table_row(lines[j]))
                .unwrap_or(lines.len());
            let table = TableSpec::parse(lines[i], lines[i + 1], &lines[i + 2..body_end]);
            out.push(table.render());
            i = body_end;
            continue;
        }

        out.push(lines[i].to_string());
        i += 1;
    }

    out
}
