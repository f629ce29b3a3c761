//! Error types for the blockshift library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ProcessError`] — **Fatal**: the run cannot proceed at all (missing
//!   input document, missing system-message file, missing credential for a
//!   provider that requires one, unsupported provider identifier). Returned
//!   as `Err(ProcessError)` from the top-level `process*` functions before
//!   any block is touched.
//!
//! * [`BlockError`] — **Non-fatal**: a single block failed (retries
//!   exhausted, the sink could not save) but every other block is
//!   unaffected. Stored inside [`crate::report::BlockRecord`] so callers
//!   can inspect partial success rather than losing the whole document to
//!   one bad block.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first block failure, log and continue, or collect all failures for a
//! post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the blockshift library.
///
/// Block-level failures use [`BlockError`] and are stored in
/// [`crate::report::BlockRecord`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ProcessError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// Input document was not found at the given path.
    #[error("Input document not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// System-message file was not found at the given path.
    #[error("System message file not found: '{path}'")]
    SystemMessageNotFound { path: PathBuf },

    /// The selected provider requires an API key and none was supplied.
    #[error("API key is required for provider '{provider}'\nPass --api-key or set it in the configuration file.")]
    MissingApiKey { provider: String },

    /// The provider identifier is not one of the known backends.
    #[error("Unsupported provider: '{provider}' (expected groq, openai, google, or ollama)")]
    UnsupportedProvider { provider: String },

    /// Builder or configuration-file validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read or parsed.
    #[error("Failed to load configuration file '{path}': {detail}")]
    ConfigFileUnreadable { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read the input document for inspection.
    #[error("Failed to read document '{path}': {source}")]
    DocumentReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single block.
///
/// Stored in [`crate::report::BlockOutcome::Failed`] when a block fails.
/// The overall run continues with the next block.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum BlockError {
    /// The model call failed after exhausting its retries.
    #[error("Block {block}: model call failed after {retries} retries: {detail}")]
    ModelFailed {
        block: usize,
        retries: u32,
        detail: String,
    },

    /// The sink could not durably save the accumulated output.
    #[error("Block {block}: failed to persist output: {detail}")]
    PersistFailed { block: usize, detail: String },
}
