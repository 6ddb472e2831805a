//! Table model parsed from raw pipe-delimited Markdown table text.
//!
//! The header row defines the column count for the whole table. Data rows
//! are truncated to that width, never padded; the separator row under the
//! header is discarded without validation.

/// One table cell, already stripped of inline markers.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub text: String,
    /// True when the raw cell carried backticks; renders in a code font.
    pub monospace: bool,
}

/// Header plus data rows. Every row has at most `header.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct TableModel {
    pub header: Vec<TableCell>,
    pub rows: Vec<Vec<TableCell>>,
}

impl TableModel {
    /// Parse raw table text (the lines of a pipe-table run).
    ///
    /// Returns `None` when the text has fewer than two non-blank lines or
    /// the header row has no non-empty cells; such runs are skipped silently
    /// by the caller. The second line is assumed to be the `---|---`
    /// separator and is dropped unconditionally.
    pub fn parse(raw: &str) -> Option<TableModel> {
        let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.len() < 2 {
            return None;
        }

        let header = parse_cells(lines[0]);
        if header.iter().all(|cell| cell.text.is_empty()) {
            return None;
        }

        let width = header.len();
        let rows = lines[2..]
            .iter()
            .map(|line| parse_cells(line))
            .filter(|row| row.iter().any(|cell| !cell.text.is_empty()))
            .map(|mut row| {
                row.truncate(width);
                row
            })
            .collect();

        Some(TableModel { header, rows })
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Total row count including the header row.
    pub fn row_count(&self) -> usize {
        self.rows.len() + 1
    }
}

/// Split one table line into cells.
///
/// Boundary pipes produce empty leading/trailing fragments which are
/// dropped; interior empty cells are kept so columns stay aligned.
fn parse_cells(line: &str) -> Vec<TableCell> {
    let mut parts: Vec<&str> = line.split('|').map(str::trim).collect();
    if parts.first() == Some(&"") {
        parts.remove(0);
    }
    if parts.last() == Some(&"") {
        parts.pop();
    }
    parts.into_iter().map(clean_cell).collect()
}

fn clean_cell(raw: &str) -> TableCell {
    let monospace = raw.contains('`');
    let text = raw.replace('`', "").replace("**", "");
    TableCell { text, monospace }
}
