//! Error types for conversion and publishing operations

use std::fmt;

/// Errors that can occur while converting and publishing a document
#[derive(Debug, Clone, PartialEq)]
pub enum ExportError {
    /// Input path does not exist
    InputNotFound(String),
    /// A diagram could not be rendered to an image
    DiagramRender(String),
    /// Authentication against the remote API failed or credentials are missing
    Authentication(String),
    /// The remote documents API rejected a request
    RemoteApi(String),
    /// Reading or writing a local file failed
    Filesystem(String),
    /// Backend not found in registry
    BackendNotFound(String),
    /// The selected backend writes a file but no output path was given
    OutputRequired(String),
    /// Building the output document failed
    Render(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::InputNotFound(path) => write!(f, "Input '{path}' does not exist"),
            ExportError::DiagramRender(msg) => write!(f, "Diagram render error: {msg}"),
            ExportError::Authentication(msg) => write!(f, "Authentication error: {msg}"),
            ExportError::RemoteApi(msg) => write!(f, "Remote API error: {msg}"),
            ExportError::Filesystem(msg) => write!(f, "Filesystem error: {msg}"),
            ExportError::BackendNotFound(name) => write!(f, "Backend '{name}' not found"),
            ExportError::OutputRequired(backend) => {
                write!(f, "Backend '{backend}' requires an output path")
            }
            ExportError::Render(msg) => write!(f, "Render error: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl ExportError {
    /// Whether this error must abort a whole batch run instead of a single document.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExportError::Authentication(_))
    }
}
