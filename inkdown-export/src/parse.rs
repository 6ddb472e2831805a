//! Block parser (raw Markdown → ordered content blocks + diagram sources)
//!
//! Parsing runs in two line-based passes:
//!
//! 1. Table masking: every maximal run of two-or-more consecutive lines that
//!    each contain a pipe is lifted out and replaced by a single placeholder
//!    line. The placeholder is framed by a control character (U+001A) that no
//!    markdown document contains, so it cannot collide with real content.
//! 2. Fence splitting: triple-backtick delimiter lines open and close code
//!    regions on the masked text. A fence tagged `mermaid` (any case) feeds
//!    the diagram list instead of producing a code block. An opener without
//!    a closer is not a fence and stays prose.
//!
//! Placeholders are expanded back into [`ContentBlock::Table`] only inside
//! prose segments. A table run that sat inside a fenced region keeps its
//! placeholder token literally; it is never reinterpreted as a table.

/// One structural element of the source document, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Plain prose lines (headings, lists and paragraphs, still unformatted).
    Prose(String),
    /// Raw pipe-table text, parsed later by the table model.
    Table(String),
    /// A fenced code block with its literal language tag (may be empty).
    Code { language: String, text: String },
    /// Index into the diagram source list returned next to the blocks.
    Diagram(usize),
}

const MASK: char = '\u{1a}';

/// Split markdown into content blocks and collect mermaid diagram sources.
///
/// Diagram sources are trimmed; code block bodies are kept verbatim. Blank
/// prose segments are dropped.
pub fn parse(source: &str) -> (Vec<ContentBlock>, Vec<String>) {
    let (masked, tables) = mask_table_runs(source);

    let mut blocks = Vec::new();
    let mut diagrams = Vec::new();
    let mut prose_run: Vec<&str> = Vec::new();

    let lines: Vec<&str> = masked.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        if let Some(tag) = fence_delimiter(lines[i]) {
            let close = (i + 1..lines.len()).find(|&j| fence_delimiter(lines[j]).is_some());
            match close {
                Some(close) => {
                    flush_prose(&mut prose_run, &tables, &mut blocks);
                    let body = lines[i + 1..close].join("\n");
                    if tag.eq_ignore_ascii_case("mermaid") {
                        diagrams.push(body.trim().to_string());
                        blocks.push(ContentBlock::Diagram(diagrams.len() - 1));
                    } else {
                        blocks.push(ContentBlock::Code {
                            language: tag.to_string(),
                            text: body,
                        });
                    }
                    i = close + 1;
                }
                None => {
                    // Unclosed fence: the delimiter line is ordinary prose.
                    prose_run.push(lines[i]);
                    i += 1;
                }
            }
        } else {
            prose_run.push(lines[i]);
            i += 1;
        }
    }
    flush_prose(&mut prose_run, &tables, &mut blocks);

    (blocks, diagrams)
}

/// Recognize a fence delimiter line and return its trimmed language tag.
fn fence_delimiter(line: &str) -> Option<&str> {
    line.trim().strip_prefix("```").map(str::trim)
}

/// Replace table runs with placeholder lines, keeping the runs aside.
fn mask_table_runs(source: &str) -> (String, Vec<String>) {
    let mut tables = Vec::new();
    let mut out: Vec<String> = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    let mut finish_run = |run: &mut Vec<&str>, out: &mut Vec<String>, tables: &mut Vec<String>| {
        if run.len() >= 2 {
            out.push(format!("{MASK}table:{}{MASK}", tables.len()));
            tables.push(run.join("\n"));
        } else {
            out.extend(run.iter().map(|l| l.to_string()));
        }
        run.clear();
    };

    for line in source.lines() {
        if line.contains('|') {
            run.push(line);
        } else {
            finish_run(&mut run, &mut out, &mut tables);
            out.push(line.to_string());
        }
    }
    finish_run(&mut run, &mut out, &mut tables);

    (out.join("\n"), tables)
}

/// Decode a placeholder line back to its table index.
fn placeholder_index(line: &str) -> Option<usize> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix(MASK)?
        .strip_suffix(MASK)?
        .strip_prefix("table:")?
        .parse()
        .ok()
}

/// Emit the accumulated prose lines, expanding table placeholders.
fn flush_prose(prose_run: &mut Vec<&str>, tables: &[String], blocks: &mut Vec<ContentBlock>) {
    let mut chunk: Vec<&str> = Vec::new();

    let mut finish_chunk = |chunk: &mut Vec<&str>, blocks: &mut Vec<ContentBlock>| {
        let text = chunk.join("\n");
        if !text.trim().is_empty() {
            blocks.push(ContentBlock::Prose(text));
        }
        chunk.clear();
    };

    for line in prose_run.drain(..) {
        match placeholder_index(line).and_then(|idx| tables.get(idx)) {
            Some(raw) => {
                finish_chunk(&mut chunk, blocks);
                blocks.push(ContentBlock::Table(raw.clone()));
            }
            None => chunk.push(line),
        }
    }
    finish_chunk(&mut chunk, blocks);
}
