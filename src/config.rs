//! Configuration types for block processing runs.
//!
//! All run behaviour is controlled through [`ProcessConfig`], built via its
//! [`ProcessConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! A run can additionally be seeded from a YAML configuration file (see
//! [`ConfigFile`]): recognized keys override the built-in defaults, and
//! command-line flags override the file. Unrecognized keys are ignored.

use crate::error::ProcessError;
use crate::progress::ProgressCallback;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator paragraph written between output blocks.
pub const DEFAULT_SEPARATOR: &str = "\n*********\n";

/// Configuration for a block-processing run.
///
/// Built via [`ProcessConfig::builder()`] or using
/// [`ProcessConfig::default()`] plus field assignment.
///
/// # Example
/// ```rust
/// use blockshift::ProcessConfig;
///
/// let config = ProcessConfig::builder()
///     .provider("groq")
///     .model("llama3-70b-8192")
///     .input_path("poems.txt")
///     .output_path("poems.out.txt")
///     .system_message_path("system.txt")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ProcessConfig {
    /// Backend provider identifier: "groq", "openai", "google", "ollama".
    /// Default: "groq".
    pub provider: String,

    /// Model identifier passed to the backend. Default: "llama3-70b-8192".
    pub model: String,

    /// API key for credential-requiring providers (groq, openai, google).
    /// Ollama runs locally and needs none.
    pub api_key: Option<String>,

    /// Sampling temperature for the completion. Range 0.0–2.0. Default: 0.7.
    pub temperature: f32,

    /// Maximum tokens the model may generate per block. Default: 4096.
    pub max_tokens: u32,

    /// Bound on the model-call retry loop. Default: 3.
    ///
    /// Every error is retried with exponential backoff (2 s, 4 s, 8 s, …)
    /// until this many attempts have been made; the final failure carries
    /// the original backend error. Retries are deliberately unconditional
    /// on the error type.
    pub max_retries: u32,

    /// Seconds slept between blocks to respect backend rate limits.
    /// Default: 1.0.
    pub delay_between_requests: f64,

    /// Separator paragraph inserted before each output block except the
    /// first. Default: [`DEFAULT_SEPARATOR`].
    pub separator: String,

    /// Path to the input document.
    pub input_path: PathBuf,

    /// Path to the output document.
    pub output_path: PathBuf,

    /// Path to the system-message file (read once at startup, trimmed).
    pub system_message_path: PathBuf,

    /// Optional per-block progress callback. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "llama3-70b-8192".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 4096,
            max_retries: 3,
            delay_between_requests: 1.0,
            separator: DEFAULT_SEPARATOR.to_string(),
            input_path: PathBuf::new(),
            output_path: PathBuf::new(),
            system_message_path: PathBuf::new(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ProcessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("delay_between_requests", &self.delay_between_requests)
            .field("separator", &self.separator)
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("system_message_path", &self.system_message_path)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl ProcessConfig {
    /// Create a new builder for `ProcessConfig`.
    pub fn builder() -> ProcessConfigBuilder {
        ProcessConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProcessConfig`].
#[derive(Debug)]
pub struct ProcessConfigBuilder {
    config: ProcessConfig,
}

impl ProcessConfigBuilder {
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.config.provider = provider.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.max(1);
        self
    }

    pub fn delay_between_requests(mut self, secs: f64) -> Self {
        self.config.delay_between_requests = secs.max(0.0);
        self
    }

    pub fn separator(mut self, sep: impl Into<String>) -> Self {
        self.config.separator = sep.into();
        self
    }

    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_path = path.into();
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn system_message_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.system_message_path = path.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessConfig, ProcessError> {
        let c = &self.config;
        if c.provider.trim().is_empty() {
            return Err(ProcessError::InvalidConfig("Provider must be set".into()));
        }
        if c.input_path.as_os_str().is_empty() {
            return Err(ProcessError::InvalidConfig(
                "Input document path must be set".into(),
            ));
        }
        if c.output_path.as_os_str().is_empty() {
            return Err(ProcessError::InvalidConfig(
                "Output document path must be set".into(),
            ));
        }
        if c.system_message_path.as_os_str().is_empty() {
            return Err(ProcessError::InvalidConfig(
                "System message path must be set".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Configuration file ───────────────────────────────────────────────────

/// YAML configuration file, section per concern.
///
/// ```yaml
/// llm:
///   provider: groq
///   model: llama3-70b-8192
///   api_key: gsk_...
///   temperature: 0.7
///   max_tokens: 4096
/// files:
///   input: poems.txt
///   output: poems.out.txt
///   system_message: system.txt
///   separator: "\n*********\n"
/// processing:
///   max_retries: 3
///   delay_between_requests: 1.0
/// ```
///
/// Every key is optional; recognized keys override built-in defaults and
/// unrecognized keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub files: FileSection,
    #[serde(default)]
    pub processing: ProcessingSection,
}

/// `llm:` section of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmSection {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// `files:` section of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileSection {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub system_message: Option<PathBuf>,
    pub separator: Option<String>,
}

/// `processing:` section of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessingSection {
    pub max_retries: Option<u32>,
    pub delay_between_requests: Option<f64>,
}

impl ConfigFile {
    /// Load and parse a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProcessError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ProcessError::ConfigFileUnreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        serde_yaml::from_str(&raw).map_err(|e| ProcessError::ConfigFileUnreadable {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Overlay the file's recognized keys onto `config`.
    pub fn apply_to(&self, config: &mut ProcessConfig) {
        if let Some(ref v) = self.llm.provider {
            config.provider = v.clone();
        }
        if let Some(ref v) = self.llm.model {
            config.model = v.clone();
        }
        if let Some(ref v) = self.llm.api_key {
            config.api_key = Some(v.clone());
        }
        if let Some(v) = self.llm.temperature {
            config.temperature = v.clamp(0.0, 2.0);
        }
        if let Some(v) = self.llm.max_tokens {
            config.max_tokens = v;
        }
        if let Some(ref v) = self.files.input {
            config.input_path = v.clone();
        }
        if let Some(ref v) = self.files.output {
            config.output_path = v.clone();
        }
        if let Some(ref v) = self.files.system_message {
            config.system_message_path = v.clone();
        }
        if let Some(ref v) = self.files.separator {
            config.separator = v.clone();
        }
        if let Some(v) = self.processing.max_retries {
            config.max_retries = v.max(1);
        }
        if let Some(v) = self.processing.delay_between_requests {
            config.delay_between_requests = v.max(0.0);
        }
    }
}
