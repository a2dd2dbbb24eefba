//! Spreadsheet paste parsing.
//!
//! Two consumers share one line tokenizer:
//! - bulk score import drops blank lines and wants `(name, score)` rows;
//! - live grid paste keeps blank lines as positional "clear this cell" markers.

use serde::Serialize;

use crate::validate::parse_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankLines {
    Drop,
    Keep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Text(&'a str),
}

/// Rows that parsed plus a count of lines that did not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Parsed {
            rows: Vec::new(),
            skipped: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PastedScoreRow {
    pub student_name: String,
    pub score: f64,
}

/// One clipboard line as seen by the live grid.
#[derive(Debug, Clone, PartialEq)]
pub enum PasteCell {
    Clear,
    Value(f64),
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
    Spaces,
    LastSpace,
}

pub fn tokenize_lines(text: &str, blanks: BlankLines) -> Vec<Line<'_>> {
    let mut parts: Vec<&str> = text.split('\n').collect();
    // "a\nb\n" is two lines, not two lines and a blank one.
    if text.ends_with('\n') {
        parts.pop();
    }

    let mut out = Vec::with_capacity(parts.len());
    for raw in parts {
        let t = raw.strip_suffix('\r').unwrap_or(raw);
        if t.trim().is_empty() {
            if blanks == BlankLines::Keep {
                out.push(Line::Blank);
            }
            continue;
        }
        out.push(Line::Text(t));
    }
    out
}

/// Splits a line into a name and a trailing value field.
///
/// Delimiters are tried in order: tab, comma, runs of two or more spaces,
/// then the last single space. The first one that yields two or more
/// fields wins.
pub fn split_fields(line: &str) -> Option<(Delimiter, String, &str)> {
    let line = line.trim();

    if line.contains('\t') {
        let fields: Vec<&str> = line.split('\t').collect();
        return join_leading(Delimiter::Tab, &fields, " ");
    }
    if line.contains(',') {
        let fields: Vec<&str> = line.split(',').collect();
        return join_leading(Delimiter::Comma, &fields, ", ");
    }

    let wide: Vec<&str> = line
        .split("  ")
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if wide.len() >= 2 {
        return join_leading(Delimiter::Spaces, &wide, " ");
    }

    let (name, value) = line.rsplit_once(' ')?;
    Some((Delimiter::LastSpace, name.trim().to_string(), value.trim()))
}

fn join_leading<'a>(
    delim: Delimiter,
    fields: &[&'a str],
    sep: &str,
) -> Option<(Delimiter, String, &'a str)> {
    let (last, leading) = fields.split_last()?;
    if leading.is_empty() {
        return None;
    }
    let name = leading
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(sep);
    Some((delim, name, last.trim()))
}

/// Parses one line into a score row; `None` when the name is empty or the
/// trailing field is not a finite number.
pub fn parse_row(line: &str) -> Option<PastedScoreRow> {
    let (_, name, value) = split_fields(line)?;
    if name.trim().is_empty() {
        return None;
    }
    let score = parse_number(value)?;
    Some(PastedScoreRow {
        student_name: name.trim().to_string(),
        score,
    })
}

/// Bulk-import variant: blank lines are ignored, bad lines are counted.
/// Duplicate names are passed through untouched.
pub fn parse_rows(text: &str) -> Parsed<PastedScoreRow> {
    let mut parsed = Parsed::default();
    for line in tokenize_lines(text, BlankLines::Drop) {
        let Line::Text(t) = line else {
            continue;
        };
        match parse_row(t) {
            Some(row) => parsed.rows.push(row),
            None => parsed.skipped += 1,
        }
    }
    parsed
}

/// Live-grid variant: one entry per clipboard line, blank lines included.
pub fn parse_paste_column(text: &str) -> Vec<PasteCell> {
    tokenize_lines(text, BlankLines::Keep)
        .into_iter()
        .map(|line| match line {
            Line::Blank => PasteCell::Clear,
            Line::Text(t) => {
                let t = t.trim();
                if t == "-" {
                    return PasteCell::Clear;
                }
                if let Some(v) = parse_number(t) {
                    return PasteCell::Value(v);
                }
                // A copied "name<TAB>score" block still lands its scores;
                // any other non-numeric line is left alone.
                match split_fields(t) {
                    Some((Delimiter::Tab, name, value)) if !name.is_empty() => {
                        match parse_number(value) {
                            Some(v) => PasteCell::Value(v),
                            None => PasteCell::Invalid(t.to_string()),
                        }
                    }
                    _ => PasteCell::Invalid(t.to_string()),
                }
            }
        })
        .collect()
}
