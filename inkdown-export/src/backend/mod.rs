//! Backend registry for destination discovery and selection
//!
//! A backend turns a [`DocumentPlan`] into a published document: a local
//! file the caller writes to disk, or a document created on a remote
//! service. Backends are registered and retrieved by name.

pub mod auth;
pub mod docx;
pub mod remote;

use crate::builder::DocumentPlan;
use crate::error::ExportError;
use crate::render::RenderedDiagram;
use std::collections::HashMap;

/// Output produced by publishing one document.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendArtifact {
    /// Complete file contents; the caller decides where they land.
    Binary(Vec<u8>),
    /// Document created on a remote service.
    Remote { document_id: String, url: String },
}

/// Trait for document destinations.
///
/// # Examples
///
/// ```ignore
/// struct MyBackend;
///
/// impl Backend for MyBackend {
///     fn name(&self) -> &str {
///         "my-backend"
///     }
///
///     fn publish(
///         &self,
///         plan: &DocumentPlan,
///         diagrams: &[RenderedDiagram],
///     ) -> Result<BackendArtifact, ExportError> {
///         Ok(BackendArtifact::Binary(Vec::new()))
///     }
/// }
/// ```
pub trait Backend: Send + Sync {
    /// Unique name used for registration and selection.
    fn name(&self) -> &str;

    /// Human-readable description for listings.
    fn description(&self) -> &str {
        ""
    }

    /// File extensions written by this backend (empty for remote backends).
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    /// Whether publishing produces a file the caller must write.
    fn writes_file(&self) -> bool {
        !self.file_extensions().is_empty()
    }

    /// First writable cursor offset in this backend's document model.
    ///
    /// Plans must be built with the same origin, or every insertion and
    /// styling offset is off by the difference.
    fn cursor_origin(&self) -> usize {
        0
    }

    /// Publish one planned document.
    ///
    /// `diagrams` holds the rendered diagram set the plan's image insertions
    /// index into.
    fn publish(
        &self,
        plan: &DocumentPlan,
        diagrams: &[RenderedDiagram],
    ) -> Result<BackendArtifact, ExportError>;
}

/// Registry of document backends
///
/// Provides a centralized registry for all available backends.
/// Backends can be registered and retrieved by name.
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        BackendRegistry {
            backends: HashMap::new(),
        }
    }

    /// Register a backend
    ///
    /// If a backend with the same name already exists, it will be replaced.
    pub fn register<B: Backend + 'static>(&mut self, backend: B) {
        self.backends
            .insert(backend.name().to_string(), Box::new(backend));
    }

    /// Get a backend by name
    pub fn get(&self, name: &str) -> Result<&dyn Backend, ExportError> {
        self.backends
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| ExportError::BackendNotFound(name.to_string()))
    }

    /// Check if a backend exists
    pub fn has(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// List all available backend names (sorted)
    pub fn list_backends(&self) -> Vec<String> {
        let mut names: Vec<_> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Publish a plan through the named backend
    pub fn publish(
        &self,
        plan: &DocumentPlan,
        diagrams: &[RenderedDiagram],
        backend: &str,
    ) -> Result<BackendArtifact, ExportError> {
        self.get(backend)?.publish(plan, diagrams)
    }

    /// Create a registry with the built-in backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(docx::DocxBackend::default());
        registry.register(remote::RemoteBackend::default());

        registry
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Heading font size in points, shared by both shipped backends: 22pt for
/// level 1, stepping down 2pt per level with a 12pt floor.
pub(crate) fn heading_font_size(level: usize) -> usize {
    24usize.saturating_sub(2 * level).max(12)
}
