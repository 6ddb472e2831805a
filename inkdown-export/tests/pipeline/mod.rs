//! Whole-pipeline tests over the public publish API, plus snapshots that
//! pin the block stream and the operation plan for one reference document.

use inkdown_export::builder::{DocumentBuilder, InsertOp};
use inkdown_export::parse::{self, ContentBlock};
use inkdown_export::{
    publish, BackendRegistry, DiagramRenderer, DocumentPlan, PublishArtifact, PublishSpec,
    RetryPolicy,
};
use insta::assert_snapshot;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

use crate::common::{scripted_server, ScriptedResponse};

const KITCHEN_SINK: &str = r#"# Overview

Intro with **bold**, *italic*, and [a link](https://example.com/ref).

- first point
  - nested point
3. ordered item

```python
total = 1 + 2
print(total)
```

| Name | Value |
| ---- | ----- |
| `rate` | 42 |

```mermaid
graph TD;
  A-->B;
```

Closing words.
"#;

fn render_blocks(blocks: &[ContentBlock], sources: &[String]) -> String {
    let mut lines = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Prose(text) => {
                lines.push("prose:".to_string());
                lines.extend(text.lines().map(|line| format!("  {line:?}")));
            }
            ContentBlock::Table(raw) => {
                lines.push("table:".to_string());
                lines.extend(raw.lines().map(|line| format!("  {line:?}")));
            }
            ContentBlock::Code { language, text } => {
                lines.push(format!("code [{language}]:"));
                lines.extend(text.lines().map(|line| format!("  {line:?}")));
            }
            ContentBlock::Diagram(index) => {
                lines.push(format!("diagram #{index}: {:?}", sources[*index]));
            }
        }
    }
    lines.join("\n")
}

fn render_plan(plan: &DocumentPlan) -> String {
    let mut lines = vec![format!("title: {}", plan.title)];
    for op in &plan.inserts {
        lines.push(match op {
            InsertOp::Text {
                at,
                paragraph,
                text,
            } => format!("insert text @{at} {paragraph:?} {text:?}"),
            InsertOp::Image { at, diagram } => format!("insert image @{at} diagram {diagram}"),
            InsertOp::Table { at, table } => format!(
                "insert table @{at} {}x{}",
                table.row_count(),
                table.column_count()
            ),
        });
    }
    for op in &plan.styles {
        lines.push(format!("style [{}..{}) {:?}", op.start, op.end, op.style));
    }
    lines.join("\n")
}

#[test]
fn kitchen_sink_block_stream() {
    let (blocks, sources) = parse::parse(KITCHEN_SINK);
    assert_snapshot!("kitchen_sink_blocks", render_blocks(&blocks, &sources));
}

#[test]
fn demo_document_plan() {
    let source = "# Report\n\nPlain **bold** text.\n\n```mermaid\ngraph LR;\n```\n\n| A |\n| - |\n| 1 |\n";
    let (blocks, sources) = parse::parse(source);
    assert_eq!(sources.len(), 1);
    let plan = DocumentBuilder::new(1).build("Demo", &blocks, &[Some(vec![0u8; 8])]);
    assert_snapshot!("demo_plan", render_plan(&plan));
}

#[test]
fn publishes_a_docx_file_end_to_end() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.docx");
    let renderer = DiagramRenderer::remote(
        "http://127.0.0.1:9",
        RetryPolicy {
            attempts: 1,
            initial_delay: Duration::from_millis(1),
        },
    );

    let spec = PublishSpec::new("# Title\n\nBody **bold**.\n", "Report", "docx")
        .with_output_path(&path);
    let outcome = publish(spec, &BackendRegistry::with_defaults(), &renderer).expect("publish");

    assert_eq!(outcome.artifact, PublishArtifact::File(path.clone()));
    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn diagram_failures_do_not_abort_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.docx");
    let (base, _requests) = scripted_server(vec![ScriptedResponse::status(404)]);
    let renderer = DiagramRenderer::remote(
        &base,
        RetryPolicy {
            attempts: 1,
            initial_delay: Duration::from_millis(1),
        },
    );

    let source = "Before.\n\n```mermaid\ngraph TD;\n```\n\nAfter.\n";
    let spec = PublishSpec::new(source, "Partial", "docx").with_output_path(&path);
    publish(spec, &BackendRegistry::with_defaults(), &renderer).expect("publish");

    assert!(fs::metadata(&path).unwrap().len() > 0);
}
