//! Document publishing pipeline.
//!
//! Provides a high-level API for converting Markdown source to a finished
//! document. This module bridges the gap between the parsing/building layers
//! and the backend registry, handling diagram rendering and file I/O.
//!
//! Use this for "convert this file" call sites where you want a single
//! function that handles parsing, rendering, backend selection, and optional
//! file writing.
//!
//! For more control over the conversion process, use [`BackendRegistry`] and
//! [`DocumentBuilder`] directly.

use crate::backend::{BackendArtifact, BackendRegistry};
use crate::builder::DocumentBuilder;
use crate::error::ExportError;
use crate::parse;
use crate::render::{DiagramRenderer, RenderedDiagram};
use std::fs;
use std::path::{Path, PathBuf};

/// Specifies how to publish a document.
///
/// Use the builder pattern to configure the publication:
///
/// ```ignore
/// let spec = PublishSpec::new(markdown, "Quarterly Report", "docx")
///     .with_output_path("report.docx");
/// ```
///
/// Backends that produce a binary file require an output path; the remote
/// backend ignores it.
#[derive(Debug)]
pub struct PublishSpec<'a> {
    /// Raw Markdown source to convert.
    pub source: &'a str,
    /// Document title, rendered as the leading title paragraph.
    pub title: &'a str,
    /// Target backend name (e.g. "docx", "remote").
    pub backend: &'a str,
    /// Optional file path for writing output. Required for file backends.
    pub output: Option<PathBuf>,
}

impl<'a> PublishSpec<'a> {
    /// Creates a new publish specification for the given source and backend.
    pub fn new(source: &'a str, title: &'a str, backend: &'a str) -> Self {
        Self {
            source,
            title,
            backend,
            output: None,
        }
    }

    /// Sets the output file path. If provided, binary content is written to disk.
    pub fn with_output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }
}

/// The output from a successful publish operation.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishArtifact {
    /// Path to the written file (file backends).
    File(PathBuf),
    /// Document created on the remote service.
    Remote { document_id: String, url: String },
}

/// Result of a publish operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    /// The published artifact (written file or remote document handle).
    pub artifact: PublishArtifact,
}

/// Publishes Markdown source as described by `spec`.
///
/// Parses the source, renders every embedded diagram in source order, builds
/// the operation plan at the backend's cursor origin, and hands the plan to
/// the backend. A diagram that fails to render is logged and skipped; the
/// rest of the document still publishes.
///
/// # Errors
///
/// Returns [`ExportError`] if:
/// - The backend is not registered
/// - The backend rejects the plan (network, authentication, encoding)
/// - A file backend is selected without an output path
/// - Writing the output file fails
pub fn publish(
    spec: PublishSpec<'_>,
    registry: &BackendRegistry,
    renderer: &DiagramRenderer,
) -> Result<PublishOutcome, ExportError> {
    let backend = registry.get(spec.backend)?;
    let (blocks, diagram_sources) = parse::parse(spec.source);
    let diagrams = render_diagrams(renderer, &diagram_sources);
    let plan = DocumentBuilder::new(backend.cursor_origin()).build(spec.title, &blocks, &diagrams);

    match backend.publish(&plan, &diagrams)? {
        BackendArtifact::Binary(bytes) => write_binary(bytes, spec.output, backend.name()),
        BackendArtifact::Remote { document_id, url } => Ok(PublishOutcome {
            artifact: PublishArtifact::Remote { document_id, url },
        }),
    }
}

/// Renders diagram sources in document order, recording `None` for failures.
fn render_diagrams(renderer: &DiagramRenderer, sources: &[String]) -> Vec<RenderedDiagram> {
    sources
        .iter()
        .enumerate()
        .map(|(index, source)| match renderer.render(source) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("diagram {index} failed to render, skipping: {err}");
                None
            }
        })
        .collect()
}

fn write_binary(
    bytes: Vec<u8>,
    output: Option<PathBuf>,
    backend: &str,
) -> Result<PublishOutcome, ExportError> {
    let path = output.ok_or_else(|| ExportError::OutputRequired(backend.to_string()))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                ExportError::Filesystem(format!("creating {}: {err}", parent.display()))
            })?;
        }
    }
    fs::write(&path, &bytes)
        .map_err(|err| ExportError::Filesystem(format!("writing {}: {err}", path.display())))?;
    Ok(PublishOutcome {
        artifact: PublishArtifact::File(path),
    })
}
