//! Document plan construction.
//!
//! The builder walks the parsed block sequence once and emits two separate
//! operation queues: insertions and styling. While walking it keeps a
//! simulated cursor that advances exactly as the destination document grows
//! when the insertion queue executes, so every styling offset is expressed in
//! the final coordinate space. The contract for offset-addressed backends is
//! strict: run every insertion first, then every styling operation. Backends
//! that construct styled objects directly (the `.docx` writer) ignore the
//! ordering and intersect the style queue with each insertion's range instead.
//!
//! Cursor units are characters. An embedded image or table consumes exactly
//! one unit regardless of its visual size.

use crate::inline::{self, LineKind, Style};
use crate::parse::ContentBlock;
use crate::render::RenderedDiagram;
use crate::table::TableModel;

/// Paragraph-level treatment of one inserted text run.
#[derive(Debug, Clone, PartialEq)]
pub enum ParagraphKind {
    Body,
    Heading(usize),
    Bullet { indent: usize },
    Numbered { indent: usize },
    Code { language: String },
    /// Blank spacing emitted after an embedded image.
    Spacer,
}

/// One content insertion, positioned in the final coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOp {
    Text {
        at: usize,
        paragraph: ParagraphKind,
        text: String,
    },
    /// Embedded diagram image; `diagram` indexes the rendered diagram set.
    Image { at: usize, diagram: usize },
    Table { at: usize, table: TableModel },
}

impl InsertOp {
    /// Position of this insertion in final document coordinates.
    pub fn at(&self) -> usize {
        match self {
            InsertOp::Text { at, .. } | InsertOp::Image { at, .. } | InsertOp::Table { at, .. } => {
                *at
            }
        }
    }

    /// Cursor units this insertion occupies once executed: the character
    /// count for text, one opaque unit for images and tables.
    pub fn advance(&self) -> usize {
        match self {
            InsertOp::Text { text, .. } => text.chars().count(),
            InsertOp::Image { .. } | InsertOp::Table { .. } => 1,
        }
    }
}

/// One styling instruction over `[start, end)` in final document coordinates.
///
/// Only valid once every [`InsertOp`] of the same plan has executed.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleOp {
    pub start: usize,
    pub end: usize,
    pub style: Style,
}

/// Ordered operation log for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    pub title: String,
    pub inserts: Vec<InsertOp>,
    pub styles: Vec<StyleOp>,
}

/// Walks content blocks in document order and produces a [`DocumentPlan`].
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    origin: usize,
}

impl DocumentBuilder {
    /// `origin` is the first writable offset of the target backend: 0 for
    /// backends counting from zero, 1 for the remote documents API.
    pub fn new(origin: usize) -> Self {
        Self { origin }
    }

    /// Build the operation log for one document.
    ///
    /// `rendered` holds the diagram render results in source order. A failed
    /// render (`None`) emits nothing for that diagram; the surrounding
    /// content closes up without a gap.
    pub fn build(
        &self,
        title: impl Into<String>,
        blocks: &[ContentBlock],
        rendered: &[RenderedDiagram],
    ) -> DocumentPlan {
        let mut plan = DocumentPlan {
            title: title.into(),
            inserts: Vec::new(),
            styles: Vec::new(),
        };
        let mut cursor = self.origin;

        for block in blocks {
            match block {
                ContentBlock::Prose(text) => self.push_prose(text, &mut cursor, &mut plan),
                ContentBlock::Table(raw) => {
                    // Tables that do not parse into a model are dropped, not
                    // rendered as prose.
                    if let Some(table) = TableModel::parse(raw) {
                        plan.inserts.push(InsertOp::Table { at: cursor, table });
                        cursor += 1;
                    }
                }
                ContentBlock::Code { language, text } => {
                    let padded = format!("\n{text}\n");
                    let advance = padded.chars().count();
                    plan.styles.push(StyleOp {
                        start: cursor,
                        end: cursor + advance,
                        style: Style::CodeBlock,
                    });
                    plan.inserts.push(InsertOp::Text {
                        at: cursor,
                        paragraph: ParagraphKind::Code {
                            language: language.clone(),
                        },
                        text: padded,
                    });
                    cursor += advance;
                }
                ContentBlock::Diagram(index) => {
                    if rendered.get(*index).is_some_and(|image| image.is_some()) {
                        plan.inserts.push(InsertOp::Image {
                            at: cursor,
                            diagram: *index,
                        });
                        cursor += 1;
                        plan.inserts.push(InsertOp::Text {
                            at: cursor,
                            paragraph: ParagraphKind::Spacer,
                            text: "\n\n".to_string(),
                        });
                        cursor += 2;
                    }
                }
            }
        }

        plan
    }

    fn push_prose(&self, text: &str, cursor: &mut usize, plan: &mut DocumentPlan) {
        for line in text.lines() {
            let (kind, prefix, content) = match inline::classify(line) {
                LineKind::Blank => (ParagraphKind::Body, String::new(), ""),
                LineKind::Heading { level, text } => {
                    (ParagraphKind::Heading(level), String::new(), text)
                }
                LineKind::Bullet { indent, text } => (
                    ParagraphKind::Bullet { indent },
                    format!("{}\u{2022} ", " ".repeat(indent)),
                    text,
                ),
                // The literal numeral is kept so numbering survives backends
                // without native list counters.
                LineKind::Numbered {
                    indent,
                    number,
                    text,
                } => (
                    ParagraphKind::Numbered { indent },
                    format!("{}{number}. ", " ".repeat(indent)),
                    text,
                ),
                LineKind::Paragraph { text } => (ParagraphKind::Body, String::new(), text),
            };

            let (plain, spans) = inline::format_inline(content);
            let anchor = *cursor + prefix.chars().count();
            if let ParagraphKind::Heading(level) = &kind {
                plan.styles.push(StyleOp {
                    start: anchor,
                    end: anchor + plain.chars().count(),
                    style: Style::Heading(*level),
                });
            }
            for span in &spans {
                plan.styles.push(StyleOp {
                    start: anchor + span.start,
                    end: anchor + span.end,
                    style: span.style.clone(),
                });
            }

            let text = format!("{prefix}{plain}\n");
            let advance = text.chars().count();
            plan.inserts.push(InsertOp::Text {
                at: *cursor,
                paragraph: kind,
                text,
            });
            *cursor += advance;
        }
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new(0)
    }
}
