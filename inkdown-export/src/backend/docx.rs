//! Local `.docx` backend
//!
//! Writes the minimal WordprocessingML package Word needs: content types,
//! the package and document relationship parts, a styles part defining
//! Title and Heading1-6, the document body, and one `word/media` part per
//! embedded diagram. Run styling comes from intersecting the plan's style
//! queue with each insertion's recorded range; because paragraphs are
//! constructed directly, insertion order cannot shift any offset here.

use crate::backend::{heading_font_size, Backend, BackendArtifact};
use crate::builder::{DocumentPlan, InsertOp, ParagraphKind, StyleOp};
use crate::error::ExportError;
use crate::inline::Style;
use crate::render::RenderedDiagram;
use crate::table::{TableCell, TableModel};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// DrawingML extent units per inch.
const EMU_PER_INCH: f64 = 914_400.0;
/// Twips of left indent per leading whitespace character (0.25").
const INDENT_TWIPS_PER_CHAR: usize = 360;
/// Usable width between the A4 page margins, in twips.
const PAGE_CONTENT_TWIPS: usize = 9026;
/// Shading behind code paragraphs.
const CODE_FILL: &str = "F2F2F2";
/// Header-row shading in tables.
const TABLE_HEADER_FILL: &str = "D9E2F3";
/// Link run color.
const LINK_COLOR: &str = "0000FF";

const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// Backend producing a Word document as in-memory bytes.
pub struct DocxBackend {
    image_width_in: f64,
}

impl DocxBackend {
    /// `image_width_in` is the fixed width of embedded diagram images in
    /// inches; height follows the PNG aspect ratio.
    pub fn new(image_width_in: f64) -> Self {
        Self { image_width_in }
    }
}

impl Default for DocxBackend {
    fn default() -> Self {
        Self::new(6.0)
    }
}

impl Backend for DocxBackend {
    fn name(&self) -> &str {
        "docx"
    }

    fn description(&self) -> &str {
        "Local Microsoft Word (.docx) file"
    }

    fn file_extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn publish(
        &self,
        plan: &DocumentPlan,
        diagrams: &[RenderedDiagram],
    ) -> Result<BackendArtifact, ExportError> {
        let mut media: Vec<Vec<u8>> = Vec::new();
        let body = self.build_body(plan, diagrams, &mut media)?;
        let package = write_package(&document_xml(&body), &media)?;
        Ok(BackendArtifact::Binary(package))
    }
}

impl DocxBackend {
    fn build_body(
        &self,
        plan: &DocumentPlan,
        diagrams: &[RenderedDiagram],
        media: &mut Vec<Vec<u8>>,
    ) -> Result<String, ExportError> {
        let mut body = String::new();
        if !plan.title.is_empty() {
            body.push_str(&paragraph(
                "<w:pPr><w:pStyle w:val=\"Title\"/></w:pPr>",
                &plain_run(&plan.title),
            ));
        }
        for op in &plan.inserts {
            match op {
                InsertOp::Text {
                    at,
                    paragraph,
                    text,
                } => push_text(&mut body, *at, paragraph, text, &plan.styles),
                InsertOp::Image { diagram, .. } => {
                    self.push_image(&mut body, *diagram, diagrams, media)?
                }
                InsertOp::Table { table, .. } => push_table(&mut body, table),
            }
        }
        Ok(body)
    }

    fn push_image(
        &self,
        body: &mut String,
        diagram: usize,
        diagrams: &[RenderedDiagram],
        media: &mut Vec<Vec<u8>>,
    ) -> Result<(), ExportError> {
        let bytes = diagrams
            .get(diagram)
            .and_then(|image| image.as_ref())
            .ok_or_else(|| {
                ExportError::Render(format!("plan references unrendered diagram {diagram}"))
            })?;
        let number = media.len() + 1;
        let cx = (self.image_width_in * EMU_PER_INCH) as u64;
        // Unreadable headers fall back to a 4:3 box instead of failing.
        let (width, height) = png_dimensions(bytes).unwrap_or((4, 3));
        let cy = cx * u64::from(height) / u64::from(width);
        // rId1 is the styles part; image relationships follow.
        body.push_str(&drawing_xml(number, &format!("rId{}", number + 1), cx, cy));
        media.push(bytes.clone());
        Ok(())
    }
}

fn push_text(body: &mut String, at: usize, kind: &ParagraphKind, text: &str, styles: &[StyleOp]) {
    match kind {
        ParagraphKind::Spacer => body.push_str("<w:p/>"),
        ParagraphKind::Code { .. } => push_code(body, text),
        ParagraphKind::Heading(level) => {
            let p_pr = format!(
                "<w:pPr><w:pStyle w:val=\"Heading{}\"/></w:pPr>",
                (*level).min(6)
            );
            body.push_str(&paragraph(&p_pr, &styled_runs(line_of(text), at, styles)));
        }
        ParagraphKind::Bullet { indent } | ParagraphKind::Numbered { indent } => {
            let p_pr = if *indent > 0 {
                format!(
                    "<w:pPr><w:ind w:left=\"{}\"/></w:pPr>",
                    indent * INDENT_TWIPS_PER_CHAR
                )
            } else {
                String::new()
            };
            body.push_str(&paragraph(&p_pr, &styled_runs(line_of(text), at, styles)));
        }
        ParagraphKind::Body => {
            body.push_str(&paragraph("", &styled_runs(line_of(text), at, styles)));
        }
    }
}

/// One insertion line without its terminating newline.
fn line_of(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

/// Code arrives newline-padded; each inner line becomes one boxed paragraph
/// so the shading and border read as a single block.
fn push_code(body: &mut String, text: &str) {
    let inner = text.strip_prefix('\n').unwrap_or(text);
    let inner = inner.strip_suffix('\n').unwrap_or(inner);
    for line in inner.split('\n') {
        let run = if line.is_empty() {
            String::new()
        } else {
            format!(
                "<w:r><w:rPr><w:rFonts w:ascii=\"Courier New\" w:hAnsi=\"Courier New\"/>\
                 <w:sz w:val=\"20\"/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r>",
                xml_escape(line)
            )
        };
        body.push_str(&paragraph(&code_paragraph_props(), &run));
    }
}

fn code_paragraph_props() -> String {
    let mut borders = String::new();
    for edge in ["top", "left", "bottom", "right"] {
        borders.push_str(&format!(
            "<w:{edge} w:val=\"single\" w:sz=\"4\" w:space=\"10\" w:color=\"000000\"/>"
        ));
    }
    format!(
        "<w:pPr><w:pBdr>{borders}</w:pBdr>\
         <w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{CODE_FILL}\"/></w:pPr>"
    )
}

/// Character-level run styling.
#[derive(Clone, PartialEq, Default)]
struct RunStyle {
    bold: bool,
    italic: bool,
    link: bool,
}

fn run_style_at(pos: usize, styles: &[StyleOp]) -> RunStyle {
    let mut style = RunStyle::default();
    for op in styles {
        if pos < op.start || pos >= op.end {
            continue;
        }
        match &op.style {
            Style::Bold => style.bold = true,
            Style::Italic => style.italic = true,
            Style::Link(_) => style.link = true,
            // Paragraph-level styles are carried by the insertion kind.
            Style::Heading(_) | Style::CodeBlock => {}
        }
    }
    style
}

/// Split one line into maximal runs of uniform styling, positioned at `at`.
fn styled_runs(line: &str, at: usize, styles: &[StyleOp]) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::new();
    let mut index = 0;
    while index < chars.len() {
        let style = run_style_at(at + index, styles);
        let start = index;
        while index < chars.len() && run_style_at(at + index, styles) == style {
            index += 1;
        }
        let segment: String = chars[start..index].iter().collect();
        out.push_str(&run_xml(&segment, &style));
    }
    out
}

fn run_xml(text: &str, style: &RunStyle) -> String {
    let mut props = String::new();
    if style.bold {
        props.push_str("<w:b/>");
    }
    if style.italic {
        props.push_str("<w:i/>");
    }
    if style.link {
        props.push_str(&format!(
            "<w:color w:val=\"{LINK_COLOR}\"/><w:u w:val=\"single\"/>"
        ));
    }
    let r_pr = if props.is_empty() {
        String::new()
    } else {
        format!("<w:rPr>{props}</w:rPr>")
    };
    format!(
        "<w:r>{r_pr}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
        xml_escape(text)
    )
}

fn plain_run(text: &str) -> String {
    run_xml(text, &RunStyle::default())
}

fn paragraph(p_pr: &str, runs: &str) -> String {
    if p_pr.is_empty() && runs.is_empty() {
        "<w:p/>".to_string()
    } else {
        format!("<w:p>{p_pr}{runs}</w:p>")
    }
}

fn push_table(body: &mut String, table: &TableModel) {
    let columns = table.column_count().max(1);
    let column_width = PAGE_CONTENT_TWIPS / columns;

    let mut borders = String::new();
    for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        borders.push_str(&format!(
            "<w:{edge} w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>"
        ));
    }
    body.push_str(&format!(
        "<w:tbl><w:tblPr><w:tblW w:w=\"5000\" w:type=\"pct\"/>\
         <w:tblBorders>{borders}</w:tblBorders></w:tblPr><w:tblGrid>"
    ));
    for _ in 0..columns {
        body.push_str(&format!("<w:gridCol w:w=\"{column_width}\"/>"));
    }
    body.push_str("</w:tblGrid>");

    body.push_str("<w:tr>");
    for index in 0..columns {
        body.push_str(&table_cell_xml(table.header.get(index), true));
    }
    body.push_str("</w:tr>");

    for row in &table.rows {
        body.push_str("<w:tr>");
        for index in 0..columns {
            body.push_str(&table_cell_xml(row.get(index), false));
        }
        body.push_str("</w:tr>");
    }
    // Spacing after the table, as after images.
    body.push_str("</w:tbl><w:p/>");
}

fn table_cell_xml(cell: Option<&TableCell>, header: bool) -> String {
    let tc_pr = if header {
        format!(
            "<w:tcPr><w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{TABLE_HEADER_FILL}\"/></w:tcPr>"
        )
    } else {
        String::new()
    };
    let run = match cell {
        None => String::new(),
        Some(cell) if cell.text.is_empty() => String::new(),
        Some(cell) => {
            let props = if header {
                "<w:b/><w:sz w:val=\"22\"/>".to_string()
            } else if cell.monospace {
                "<w:rFonts w:ascii=\"Courier New\" w:hAnsi=\"Courier New\"/><w:sz w:val=\"18\"/>"
                    .to_string()
            } else {
                String::new()
            };
            let r_pr = if props.is_empty() {
                String::new()
            } else {
                format!("<w:rPr>{props}</w:rPr>")
            };
            format!(
                "<w:r>{r_pr}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
                xml_escape(&cell.text)
            )
        }
    };
    format!("<w:tc>{tc_pr}{}</w:tc>", paragraph("", &run))
}

fn drawing_xml(number: usize, rid: &str, cx: u64, cy: u64) -> String {
    format!(
        "<w:p><w:r><w:drawing><wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
         <wp:extent cx=\"{cx}\" cy=\"{cy}\"/>\
         <wp:docPr id=\"{number}\" name=\"Diagram {number}\"/>\
         <a:graphic xmlns:a=\"{A_NS}\">\
         <a:graphicData uri=\"{PIC_NS}\">\
         <pic:pic xmlns:pic=\"{PIC_NS}\">\
         <pic:nvPicPr><pic:cNvPr id=\"{number}\" name=\"Diagram {number}\"/><pic:cNvPicPr/></pic:nvPicPr>\
         <pic:blipFill><a:blip r:embed=\"{rid}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
         <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr>\
         </pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"
    )
}

/// Width and height from a PNG IHDR header.
fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    if bytes.len() < 24 || bytes[..8] != SIGNATURE || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    (width > 0 && height > 0).then_some((width, height))
}

fn document_xml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
         xmlns:wp=\"{WP_NS}\">\
         <w:body>{body}<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/>\
         <w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" \
         w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/></w:sectPr></w:body></w:document>"
    )
}

fn content_types_xml(has_images: bool) -> String {
    let png_default = if has_images {
        "<Default Extension=\"png\" ContentType=\"image/png\"/>"
    } else {
        ""
    };
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>{png_default}\
         <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
         <Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\
         </Types>"
    )
}

fn package_rels_xml() -> &'static str {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
     <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
     <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
     </Relationships>"
}

fn document_rels_xml(image_count: usize) -> String {
    let mut relationships = String::from(
        "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
    );
    for number in 1..=image_count {
        relationships.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" Target=\"media/image{number}.png\"/>",
            number + 1
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         {relationships}</Relationships>"
    )
}

fn styles_xml() -> String {
    let mut styles = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\">\
         <w:name w:val=\"Normal\"/><w:qFormat/></w:style>\
         <w:style w:type=\"paragraph\" w:styleId=\"Title\">\
         <w:name w:val=\"Title\"/><w:basedOn w:val=\"Normal\"/><w:qFormat/>\
         <w:pPr><w:spacing w:after=\"240\"/></w:pPr>\
         <w:rPr><w:sz w:val=\"56\"/><w:szCs w:val=\"56\"/></w:rPr></w:style>",
    );
    for level in 1..=6usize {
        let half_points = heading_font_size(level) * 2;
        styles.push_str(&format!(
            "<w:style w:type=\"paragraph\" w:styleId=\"Heading{level}\">\
             <w:name w:val=\"heading {level}\"/><w:basedOn w:val=\"Normal\"/><w:qFormat/>\
             <w:pPr><w:spacing w:before=\"240\" w:after=\"120\"/><w:outlineLvl w:val=\"{}\"/></w:pPr>\
             <w:rPr><w:b/><w:sz w:val=\"{half_points}\"/><w:szCs w:val=\"{half_points}\"/></w:rPr>\
             </w:style>",
            level - 1
        ));
    }
    styles.push_str("</w:styles>");
    styles
}

fn write_package(document: &str, media: &[Vec<u8>]) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    start_file(&mut zip, "[Content_Types].xml", options)?;
    write_part(&mut zip, content_types_xml(!media.is_empty()).as_bytes())?;
    start_file(&mut zip, "_rels/.rels", options)?;
    write_part(&mut zip, package_rels_xml().as_bytes())?;
    start_file(&mut zip, "word/document.xml", options)?;
    write_part(&mut zip, document.as_bytes())?;
    start_file(&mut zip, "word/_rels/document.xml.rels", options)?;
    write_part(&mut zip, document_rels_xml(media.len()).as_bytes())?;
    start_file(&mut zip, "word/styles.xml", options)?;
    write_part(&mut zip, styles_xml().as_bytes())?;
    for (index, image) in media.iter().enumerate() {
        start_file(&mut zip, &format!("word/media/image{}.png", index + 1), options)?;
        write_part(&mut zip, image)?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| ExportError::Render(format!("docx package: {e}")))?;
    Ok(cursor.into_inner())
}

fn start_file(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    options: SimpleFileOptions,
) -> Result<(), ExportError> {
    zip.start_file(name, options)
        .map_err(|e| ExportError::Render(format!("docx package part '{name}': {e}")))
}

fn write_part(zip: &mut ZipWriter<Cursor<Vec<u8>>>, bytes: &[u8]) -> Result<(), ExportError> {
    zip.write_all(bytes)
        .map_err(|e| ExportError::Render(format!("docx package write: {e}")))
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
