//! Shared configuration loader for the inkdown toolchain.
//!
//! `defaults/inkdown.default.toml` is embedded into every binary so that docs
//! and runtime behavior stay in sync. Applications layer user-specific files
//! on top of those defaults via [`Loader`] before deserializing into
//! [`InkdownConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use inkdown_export::backend::remote::RemoteOptions;
use inkdown_export::render::RetryPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_TOML: &str = include_str!("../defaults/inkdown.default.toml");

/// Top-level configuration consumed by inkdown applications.
#[derive(Debug, Clone, Deserialize)]
pub struct InkdownConfig {
    pub render: RenderConfig,
    pub docx: DocxConfig,
    pub output: OutputConfig,
    pub remote: RemoteConfig,
}

/// Diagram rendering knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub service_url: String,
    pub tool: String,
    pub retry_attempts: u32,
    pub retry_initial_delay_ms: u64,
}

impl From<RenderConfig> for RetryPolicy {
    fn from(config: RenderConfig) -> Self {
        RetryPolicy {
            attempts: config.retry_attempts,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
        }
    }
}

impl From<&RenderConfig> for RetryPolicy {
    fn from(config: &RenderConfig) -> Self {
        RetryPolicy {
            attempts: config.retry_attempts,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
        }
    }
}

/// Knobs for the local .docx backend.
#[derive(Debug, Clone, Deserialize)]
pub struct DocxConfig {
    pub image_width_in: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub directory: String,
}

/// Remote documents API endpoints and credential locations.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub docs_host: String,
    pub files_host: String,
    pub credentials: PathBuf,
    pub token_cache: Option<PathBuf>,
}

impl From<RemoteConfig> for RemoteOptions {
    fn from(config: RemoteConfig) -> Self {
        RemoteOptions {
            docs_host: config.docs_host,
            files_host: config.files_host,
            credentials_path: config.credentials,
            token_path: config.token_cache,
        }
    }
}

impl From<&RemoteConfig> for RemoteOptions {
    fn from(config: &RemoteConfig) -> Self {
        RemoteOptions {
            docs_host: config.docs_host.clone(),
            files_host: config.files_host.clone(),
            credentials_path: config.credentials.clone(),
            token_path: config.token_cache.clone(),
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<InkdownConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<InkdownConfig, ConfigError> {
    Loader::new().build()
}
