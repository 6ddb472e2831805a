//! Package-level checks on the .docx writer: required parts, styles,
//! tables, media, and escaping, verified by reading the zip back.

use inkdown_export::backend::docx::DocxBackend;
use inkdown_export::backend::{Backend, BackendArtifact};
use inkdown_export::builder::DocumentBuilder;
use inkdown_export::parse;
use regex::Regex;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::common::{png_with_dimensions, SAMPLE_PNG};

fn publish_bytes(markdown: &str, rendered: &[Option<Vec<u8>>]) -> Vec<u8> {
    let backend = DocxBackend::default();
    let (blocks, _) = parse::parse(markdown);
    let plan =
        DocumentBuilder::new(backend.cursor_origin()).build("Test Document", &blocks, rendered);
    match backend.publish(&plan, rendered).expect("publish") {
        BackendArtifact::Binary(bytes) => bytes,
        other => panic!("expected binary artifact, got {other:?}"),
    }
}

fn archive(bytes: &[u8]) -> ZipArchive<Cursor<Vec<u8>>> {
    ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid zip")
}

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = archive(bytes);
    let mut part = archive.by_name(name).expect("part present");
    let mut content = String::new();
    part.read_to_string(&mut content).expect("utf8 part");
    content
}

fn read_binary_part(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = archive(bytes);
    let mut part = archive.by_name(name).expect("part present");
    let mut content = Vec::new();
    part.read_to_end(&mut content).expect("read part");
    content
}

#[test]
fn package_has_the_required_parts() {
    let bytes = publish_bytes("Hello.\n", &[]);
    let archive = archive(&bytes);
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    for required in [
        "[Content_Types].xml",
        "_rels/.rels",
        "word/document.xml",
        "word/_rels/document.xml.rels",
        "word/styles.xml",
    ] {
        assert!(names.iter().any(|n| n == required), "missing {required}");
    }
}

#[test]
fn title_paragraph_uses_the_title_style() {
    let document = read_part(&publish_bytes("Hello.\n", &[]), "word/document.xml");
    assert!(document.contains("<w:pStyle w:val=\"Title\"/>"));
    assert!(document.contains(">Test Document</w:t>"));
}

#[test]
fn headings_map_to_named_styles() {
    let document = read_part(
        &publish_bytes("# Alpha\n\n### Gamma\n", &[]),
        "word/document.xml",
    );
    assert!(document.contains("<w:pStyle w:val=\"Heading1\"/>"));
    assert!(document.contains("<w:pStyle w:val=\"Heading3\"/>"));
    let styles = read_part(&publish_bytes("# Alpha\n", &[]), "word/styles.xml");
    assert!(styles.contains("w:styleId=\"Heading1\""));
    assert!(styles.contains("w:styleId=\"Heading6\""));
}

#[test]
fn inline_styles_produce_distinct_runs() {
    let md = "Body with **bold** and *italic* and [docs](https://example.com/d).\n";
    let document = read_part(&publish_bytes(md, &[]), "word/document.xml");
    assert!(document.contains("<w:b/>"));
    assert!(document.contains("<w:i/>"));
    assert!(document.contains("<w:color w:val=\"0000FF\"/>"));
    assert!(document.contains("<w:u w:val=\"single\"/>"));
    assert!(document.contains(">docs</w:t>"));
}

#[test]
fn indented_bullets_carry_left_indent() {
    let document = read_part(
        &publish_bytes("- top\n  - nested\n", &[]),
        "word/document.xml",
    );
    assert!(document.contains("\u{2022} top"));
    assert!(document.contains("<w:ind w:left=\"720\"/>"));
}

#[test]
fn code_paragraphs_are_boxed_and_shaded() {
    let document = read_part(
        &publish_bytes("```rust\nlet x = 1;\n```\n", &[]),
        "word/document.xml",
    );
    assert!(document.contains("<w:pBdr>"));
    assert!(document.contains("w:fill=\"F2F2F2\""));
    assert!(document.contains("Courier New"));
    assert!(document.contains("<w:sz w:val=\"20\"/>"));
    assert!(document.contains("let x = 1;"));
}

#[test]
fn tables_style_header_and_monospace_cells() {
    let md = "| Name | Value |\n| ---- | ----- |\n| `rate` | 42 |\n";
    let document = read_part(&publish_bytes(md, &[]), "word/document.xml");
    assert!(document.contains("<w:tbl>"));
    assert!(document.contains("<w:tblW w:w=\"5000\" w:type=\"pct\"/>"));
    assert!(document.contains("w:fill=\"D9E2F3\""));
    // Monospace body cell: Courier New at 9 pt.
    assert!(document.contains("<w:sz w:val=\"18\"/>"));
    assert_eq!(document.matches("<w:tc>").count(), 4);
}

#[test]
fn images_embed_media_with_scaled_extent() {
    let md = "```mermaid\ngraph TD;\n```\n";
    let rendered = vec![Some(SAMPLE_PNG.clone())];
    let bytes = publish_bytes(md, &rendered);

    assert_eq!(
        read_binary_part(&bytes, "word/media/image1.png"),
        *SAMPLE_PNG
    );

    let rels = read_part(&bytes, "word/_rels/document.xml.rels");
    assert!(rels.contains("Id=\"rId2\""));
    assert!(rels.contains("Target=\"media/image1.png\""));

    let types = read_part(&bytes, "[Content_Types].xml");
    assert!(types.contains("Extension=\"png\""));

    // 6 inch width; the 800x400 fixture halves it for the height.
    let document = read_part(&bytes, "word/document.xml");
    let extent = Regex::new(r#"<wp:extent cx="(\d+)" cy="(\d+)"/>"#).unwrap();
    let captures = extent.captures(&document).expect("extent present");
    assert_eq!(&captures[1], "5486400");
    assert_eq!(&captures[2], "2743200");
}

#[test]
fn malformed_png_falls_back_to_a_default_aspect() {
    let md = "```mermaid\ngraph TD;\n```\n";
    let rendered = vec![Some(b"not a png".to_vec())];
    let document = read_part(&publish_bytes(md, &rendered), "word/document.xml");
    let extent = Regex::new(r#"<wp:extent cx="(\d+)" cy="(\d+)"/>"#).unwrap();
    let captures = extent.captures(&document).expect("extent present");
    // 4:3 when the header cannot be read.
    assert_eq!(&captures[1], "5486400");
    assert_eq!(&captures[2], "4114800");
}

#[test]
fn failed_diagram_render_leaves_no_trace() {
    let md = "before\n\n```mermaid\ngraph TD;\n```\n\nafter\n";
    let bytes = publish_bytes(md, &[None]);

    let archive = archive(&bytes);
    assert!(!archive.file_names().any(|n| n.starts_with("word/media/")));
    drop(archive);

    let document = read_part(&bytes, "word/document.xml");
    assert!(!document.contains("<w:drawing>"));
    let types = read_part(&bytes, "[Content_Types].xml");
    assert!(!types.contains("Extension=\"png\""));
}

#[test]
fn markup_characters_are_escaped() {
    let document = read_part(
        &publish_bytes("AT&T shipped <tags> & more.\n", &[]),
        "word/document.xml",
    );
    assert!(document.contains("AT&amp;T shipped &lt;tags&gt; &amp; more."));
}

#[test]
fn image_width_is_configurable() {
    let backend = DocxBackend::new(3.0);
    let (blocks, _) = parse::parse("```mermaid\ngraph TD;\n```\n");
    let rendered = vec![Some(png_with_dimensions(600, 600))];
    let plan = DocumentBuilder::new(0).build("T", &blocks, &rendered);
    let bytes = match backend.publish(&plan, &rendered).expect("publish") {
        BackendArtifact::Binary(bytes) => bytes,
        other => panic!("expected binary artifact, got {other:?}"),
    };
    let document = read_part(&bytes, "word/document.xml");
    // 3 inches square: 3 * 914400 EMU both ways.
    assert!(document.contains("<wp:extent cx=\"2743200\" cy=\"2743200\"/>"));
}
