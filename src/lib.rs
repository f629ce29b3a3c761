//! # blockshift
//!
//! Transform a document block by block through an LLM backend, persisting
//! each transformed block as soon as it arrives.
//!
//! ## Why this crate?
//!
//! Feeding a whole document to a model in one request loses everything
//! when the call fails, truncates, or times out. Instead this crate splits
//! the document at blank-paragraph boundaries, sends each block through the
//! model separately, and durably saves the output after every single
//! block — a slow or flaky backend costs you one block's work, never the
//! document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Extract    blank-paragraph-delimited blocks, in order
//!  ├─ 2. Normalize  collapse whitespace, drop empty blocks
//!  ├─ 3. Complete   groq / openai / google / ollama, bounded retry + backoff
//!  ├─ 4. Persist    append to the output document, save after every block
//!  └─ 5. Pace       fixed delay before the next block (rate limits)
//! ```
//!
//! Blocks are processed strictly one at a time; the run report counts
//! successes, skips, and failures so callers can judge partial results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blockshift::{process, ProcessConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProcessConfig::builder()
//!         .provider("groq")
//!         .model("llama3-70b-8192")
//!         .api_key(std::env::var("GROQ_API_KEY")?)
//!         .input_path("poems.txt")
//!         .output_path("poems.out.txt")
//!         .system_message_path("system.txt")
//!         .build()?;
//!
//!     let report = process(&config).await?;
//!     eprintln!(
//!         "{}/{} blocks processed",
//!         report.stats.processed_blocks, report.stats.total_blocks
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `blockshift` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! blockshift = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod llm;
pub mod normalize;
pub mod process;
pub mod progress;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConfigFile, ProcessConfig, ProcessConfigBuilder, DEFAULT_SEPARATOR};
pub use document::{BlockSink, DocumentInfo, ParagraphSource, SinkError, TextFileSink, TextFileSource};
pub use error::{BlockError, ProcessError};
pub use extract::{BlockExtractor, ExtractError, TextBlock};
pub use llm::{ChatMessage, CompletionOptions, ModelBackend, ModelClient};
pub use process::{inspect, process, run_pipeline};
pub use progress::{NoopProgressCallback, ProcessProgressCallback, ProgressCallback};
pub use report::{BlockOutcome, BlockRecord, RunReport, RunStats};
