//! Diagram rendering (mermaid source → raster image bytes)
//!
//! The primary path asks a render service over HTTP: the diagram source is
//! base64url-encoded straight into the GET path, and throttling or transient
//! server failures (429/500/503) are retried with exponential backoff. The
//! opt-in fallback shells out to a locally installed mermaid CLI through a
//! scoped temp directory.
//!
//! The mode is fixed when the renderer is constructed; nothing mutates it
//! afterwards. A render failure is not fatal to a conversion: callers record
//! the diagram as absent and keep going.

use crate::error::ExportError;
use crate::http;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use std::thread;
use std::time::Duration;

/// Bytes of a successfully rendered diagram, or `None` when rendering failed.
pub type RenderedDiagram = Option<Vec<u8>>;

/// Environment variable that overrides local tool discovery.
#[cfg(feature = "native-render")]
pub const TOOL_BIN_ENV: &str = "INKDOWN_MMDC_BIN";

/// Retry schedule for the render service.
///
/// `attempts` bounds the total number of tries; the delay doubles after each
/// retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_secs(2),
        }
    }
}

enum RenderMode {
    Remote,
    #[cfg(feature = "native-render")]
    LocalTool(std::path::PathBuf),
}

/// Renders mermaid sources to PNG bytes.
pub struct DiagramRenderer {
    mode: RenderMode,
    service_url: String,
    policy: RetryPolicy,
    agent: ureq::Agent,
}

impl DiagramRenderer {
    /// Renderer that always uses the remote render service.
    pub fn remote(service_url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            mode: RenderMode::Remote,
            service_url: service_url.into(),
            policy,
            agent: http::agent(),
        }
    }

    /// Renderer that prefers a locally installed mermaid CLI.
    ///
    /// Discovery checks [`TOOL_BIN_ENV`] first, then `PATH`. When the tool
    /// cannot be found the renderer silently downgrades to the remote
    /// service, warning once.
    #[cfg(feature = "native-render")]
    pub fn with_local_tool(
        tool: &str,
        service_url: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        let mode = match resolve_tool(tool) {
            Some(path) => RenderMode::LocalTool(path),
            None => {
                log::warn!(
                    "mermaid tool '{tool}' not found on PATH; falling back to the render service"
                );
                RenderMode::Remote
            }
        };
        Self {
            mode,
            service_url: service_url.into(),
            policy,
            agent: http::agent(),
        }
    }

    /// Whether this renderer will invoke the local CLI tool.
    pub fn uses_local_tool(&self) -> bool {
        #[cfg(feature = "native-render")]
        {
            matches!(self.mode, RenderMode::LocalTool(_))
        }
        #[cfg(not(feature = "native-render"))]
        {
            false
        }
    }

    /// Render one diagram source to image bytes.
    pub fn render(&self, source: &str) -> Result<Vec<u8>, ExportError> {
        match &self.mode {
            RenderMode::Remote => self.render_remote(source),
            #[cfg(feature = "native-render")]
            RenderMode::LocalTool(path) => render_with_tool(path, source),
        }
    }

    fn render_remote(&self, source: &str) -> Result<Vec<u8>, ExportError> {
        let encoded = URL_SAFE.encode(source);
        let url = format!("{}/img/{encoded}", self.service_url.trim_end_matches('/'));

        let mut delay = self.policy.initial_delay;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.agent.get(&url).call() {
                Ok(response) => {
                    return response
                        .into_body()
                        .with_config()
                        .limit(http::MAX_IMAGE_SIZE)
                        .read_to_vec()
                        .map_err(|e| {
                            ExportError::DiagramRender(format!(
                                "failed to read render service response: {e}"
                            ))
                        });
                }
                Err(ureq::Error::StatusCode(code))
                    if retryable(code) && attempt < self.policy.attempts =>
                {
                    log::warn!(
                        "render service returned {code}, retrying in {delay:?} \
                         (attempt {attempt} of {})",
                        self.policy.attempts
                    );
                    thread::sleep(delay);
                    delay *= 2;
                }
                Err(ureq::Error::StatusCode(code)) => {
                    return Err(ExportError::DiagramRender(format!(
                        "render service returned status {code}"
                    )));
                }
                Err(e) => {
                    return Err(ExportError::DiagramRender(format!(
                        "render service request failed: {e}"
                    )));
                }
            }
        }
    }
}

/// HTTP statuses worth retrying: throttling and transient server failures.
fn retryable(code: u16) -> bool {
    matches!(code, 429 | 500 | 503)
}

#[cfg(feature = "native-render")]
fn resolve_tool(tool: &str) -> Option<std::path::PathBuf> {
    if let Some(path) = std::env::var_os(TOOL_BIN_ENV) {
        if !path.is_empty() {
            return Some(std::path::PathBuf::from(path));
        }
    }
    which::which(tool).ok()
}

/// Run the mermaid CLI against a source file in a scoped temp directory.
///
/// The directory (input and output files included) is removed when the
/// guard drops, on success and on every error path.
#[cfg(feature = "native-render")]
fn render_with_tool(tool: &std::path::Path, source: &str) -> Result<Vec<u8>, ExportError> {
    use std::fs;
    use std::process::Command;

    let dir = tempfile::tempdir()
        .map_err(|e| ExportError::DiagramRender(format!("temp dir error: {e}")))?;
    let input = dir.path().join("diagram.mmd");
    let output = dir.path().join("diagram.png");
    fs::write(&input, source).map_err(|e| ExportError::DiagramRender(e.to_string()))?;

    let status = Command::new(tool)
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("-t")
        .arg("default")
        .arg("-b")
        .arg("white")
        .status()
        .map_err(|e| {
            ExportError::DiagramRender(format!(
                "failed to launch mermaid tool ({}): {e}",
                tool.display()
            ))
        })?;

    if !status.success() {
        return Err(ExportError::DiagramRender(format!(
            "mermaid tool exited with status {status}"
        )));
    }

    fs::read(&output).map_err(|e| ExportError::DiagramRender(e.to_string()))
}
