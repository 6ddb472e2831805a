//! Markdown to word-processor document conversion
//!
//!     This crate turns Markdown (with embedded Mermaid diagram blocks) into
//!     richly formatted documents, either a local `.docx` file or a document
//!     created on a remote documents API.
//!
//!     TLDR: for backend authors:
//!         - The parsing layers never touch a backend; they produce a
//!           `DocumentPlan` of positioned operations and stop there.
//!         - A backend consumes the plan, it never re-reads the Markdown.
//!         - Implement the `Backend` trait, register it, and the publish
//!           pipeline and CLI pick it up by name.
//!
//! Architecture
//!
//!     Data flows strictly forward: raw Markdown -> typed blocks (plus
//!     extracted diagram sources) -> rendered diagram images -> a two-phase
//!     operation plan -> one backend. Each layer is a plain function or a
//!     small struct over owned data, so every stage can be tested without
//!     the stages around it.
//!
//!     This is a pure lib, that is, it powers the inkdown CLI but is shell
//!     agnostic: no code here reads stdin, prints, or inspects env vars.
//!     The one place that looks interactive, the sign-in code prompt, is a
//!     trait (`backend::auth::AuthPrompt`) the shell implements.
//!
//!     The file structure:
//!     .
//!     ├── error.rs
//!     ├── parse.rs          # Markdown -> ordered content blocks
//!     ├── inline.rs         # line classification + bold/italic/link spans
//!     ├── table.rs          # pipe-table model
//!     ├── render.rs         # Mermaid source -> PNG bytes
//!     ├── builder.rs        # blocks -> positioned operation plan
//!     ├── backend
//!     │   ├── mod.rs        # Backend trait + BackendRegistry
//!     │   ├── docx.rs       # WordprocessingML package writer
//!     │   ├── remote.rs     # remote documents API client
//!     │   └── auth.rs       # token cache + refresh/interactive exchange
//!     ├── publish.rs        # high-level pipeline
//!     └── http.rs           # shared HTTP agent and size limits
//!
//! Testing
//!     tests
//!     ├── lib.rs            # wires the submodules below
//!     ├── common/           # stub HTTP server, PNG fixtures
//!     ├── builder.rs
//!     ├── backends/
//!     ├── render.rs
//!     ├── auth.rs
//!     └── pipeline.rs
//!
//!     Note that rust does not by default discover tests in subdirectories,
//!     so tests/lib.rs declares them as modules.
//!
//! Core Algorithm
//!
//!     The heart of the crate is position tracking (./builder.rs). Backends
//!     address content by absolute character offset, and styling a range
//!     that later insertions would shift is a silent corruption. The builder
//!     therefore works in two phases over a simulated cursor: it lays out
//!     every insertion first, recording where each piece of text will land
//!     in the finished document, and computes styling ranges against those
//!     final coordinates. The plan's contract is that all insertions execute
//!     before any styling does.
//!
//! Backends
//!
//!     Backend capabilities are implemented with the Backend trait. A
//!     backend has a name, optional file extensions, a cursor origin, and a
//!     publish() method. See the trait def [./backend/mod.rs].
//!     - `docx`: builds the OOXML package in memory with the zip crate and
//!       returns the bytes; no external process.
//!     - `remote`: REST client for a documents API and a file-storage API,
//!       bearer-token auth with a cached, refreshable token.
//!
//! Library Choices
//!
//!     Conversion is offloaded to specialized crates where one exists: zip
//!     for the OOXML container, ureq for blocking HTTP, base64 for the
//!     render-service URL scheme, serde_json for API payloads. The Markdown
//!     subset handled here is small and line-oriented, so parsing is done
//!     directly rather than through a full CommonMark parser whose tree
//!     we would immediately flatten back into lines.

pub mod backend;
pub mod builder;
pub mod error;
pub mod http;
pub mod inline;
pub mod parse;
pub mod publish;
pub mod render;
pub mod table;

pub use backend::{Backend, BackendArtifact, BackendRegistry};
pub use builder::{DocumentBuilder, DocumentPlan};
pub use error::ExportError;
pub use publish::{publish, PublishArtifact, PublishOutcome, PublishSpec};
pub use render::{DiagramRenderer, RenderedDiagram, RetryPolicy};
