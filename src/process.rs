//! Run orchestration: extraction → normalisation → model call → persistence.
//!
//! The pipeline is strictly sequential — exactly one in-flight block at a
//! time. The only suspension points on the single execution path are the
//! pacing sleep between blocks and the backoff sleeps inside the model
//! client; there is no concurrent access to the sink or the client, so no
//! locking is needed. Stopping mid-run loses at most the in-flight block:
//! everything already persisted stays persisted, because the sink saves
//! after every single append.
//!
//! Block extraction is eager, not streamed — the total count is needed for
//! progress reporting before the first model call is issued.

use crate::config::ProcessConfig;
use crate::document::{BlockSink, DocumentInfo, ParagraphSource, TextFileSink, TextFileSource};
use crate::error::{BlockError, ProcessError};
use crate::extract::{BlockExtractor, TextBlock};
use crate::llm::{self, CompletionOptions, ModelClient};
use crate::normalize;
use crate::progress::ProgressCallback;
use crate::report::{BlockOutcome, BlockRecord, RunReport, RunStats};
use std::path::Path;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Running counters, mutated only by the pipeline loop.
#[derive(Debug, Clone, Copy, Default)]
struct PipelineProgress {
    total: usize,
    succeeded: usize,
    current: usize,
}

/// Process a document end to end.
///
/// This is the primary entry point for the library: validate the fatal
/// preconditions, initialise the model client, then drive every extracted
/// block through the pipeline.
///
/// # Returns
/// `Ok(RunReport)` whenever the run itself could start, even if individual
/// blocks failed or the source turned out to be unreadable — check
/// [`RunReport::completed`] and the counts.
///
/// # Errors
/// Returns `Err(ProcessError)` only for fatal configuration problems:
/// missing input document, missing system-message file, missing credential,
/// unsupported provider identifier.
pub async fn process(config: &ProcessConfig) -> Result<RunReport, ProcessError> {
    // ── Step 1: Validate required files ──────────────────────────────────
    if !config.input_path.exists() {
        return Err(ProcessError::InputNotFound {
            path: config.input_path.clone(),
        });
    }
    if !config.system_message_path.exists() {
        return Err(ProcessError::SystemMessageNotFound {
            path: config.system_message_path.clone(),
        });
    }

    // ── Step 2: Load the system message ──────────────────────────────────
    let system_message = load_system_message(&config.system_message_path);

    // ── Step 3: Initialise the model client ──────────────────────────────
    let backend = llm::create_backend(config)?;
    let client = ModelClient::new(
        backend,
        config.max_retries,
        CompletionOptions {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        },
    );
    info!(
        provider = client.backend_name(),
        model = %config.model,
        "model client initialised"
    );

    // ── Step 4: Open source and sink ─────────────────────────────────────
    let source = TextFileSource::new(&config.input_path);
    let mut sink = TextFileSink::new(&config.output_path, &config.separator);

    // ── Step 5: Drive the pipeline ───────────────────────────────────────
    Ok(run_pipeline(&client, &source, &mut sink, &system_message, config).await)
}

/// Drive extraction and per-block processing over explicit collaborators.
///
/// Exposed separately from [`process`] so callers (and tests) can supply
/// their own source, sink, or backend. Never returns `Err`: an unreadable
/// source is reported in-band via `extraction_failed`, and per-block
/// failures are recorded per block.
pub async fn run_pipeline(
    client: &ModelClient,
    source: &dyn ParagraphSource,
    sink: &mut dyn BlockSink,
    system_message: &str,
    config: &ProcessConfig,
) -> RunReport {
    let run_start = Instant::now();
    let callback = config.progress_callback.as_ref();

    // ── Extracting ───────────────────────────────────────────────────────
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut extraction_failed = false;
    for item in BlockExtractor::new(source) {
        match item {
            Ok(block) => blocks.push(block),
            Err(e) => {
                warn!(error = %e, "extraction failed; run has zero processable blocks");
                blocks.clear();
                extraction_failed = true;
                break;
            }
        }
    }

    let mut progress = PipelineProgress {
        total: blocks.len(),
        ..Default::default()
    };
    if !extraction_failed {
        info!(total_blocks = progress.total, "starting block processing");
    }
    if let Some(cb) = callback {
        cb.on_run_start(progress.total);
    }

    // ── Processing blocks ────────────────────────────────────────────────
    let mut records: Vec<BlockRecord> = Vec::with_capacity(blocks.len());
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for (pos, block) in blocks.iter().enumerate() {
        progress.current = block.index;
        let block_start = Instant::now();

        let outcome = process_block(client, sink, system_message, block, progress.total, callback).await;
        match &outcome {
            BlockOutcome::Completed { .. } => progress.succeeded += 1,
            BlockOutcome::Skipped => skipped += 1,
            BlockOutcome::Failed { .. } => failed += 1,
        }
        debug!(
            block = progress.current,
            succeeded = progress.succeeded,
            total = progress.total,
            "block outcome recorded"
        );

        records.push(BlockRecord {
            index: block.index,
            duration_ms: block_start.elapsed().as_millis() as u64,
            outcome,
        });

        // Pace requests between blocks; the final block needs no delay.
        if pos + 1 < blocks.len() {
            sleep(Duration::from_secs_f64(
                config.delay_between_requests.max(0.0),
            ))
            .await;
        }
    }

    // ── Done ─────────────────────────────────────────────────────────────
    info!(
        succeeded = progress.succeeded,
        total = progress.total,
        "block processing finished"
    );
    if let Some(cb) = callback {
        cb.on_run_complete(progress.total, progress.succeeded);
    }

    RunReport {
        stats: RunStats {
            total_blocks: progress.total,
            processed_blocks: progress.succeeded,
            skipped_blocks: skipped,
            failed_blocks: failed,
            total_duration_ms: run_start.elapsed().as_millis() as u64,
        },
        blocks: records,
        extraction_failed,
    }
}

/// Normalise, invoke, and persist a single block.
async fn process_block(
    client: &ModelClient,
    sink: &mut dyn BlockSink,
    system_message: &str,
    block: &TextBlock,
    total: usize,
    callback: Option<&ProgressCallback>,
) -> BlockOutcome {
    // ── Normalizing ──────────────────────────────────────────────────────
    let stats = normalize::analyze(&block.text);
    debug!(block = block.index, %stats, "block analyzed");

    let cleaned = normalize::clean(&block.text);
    if cleaned.is_empty() {
        warn!(block = block.index, "block is empty after cleaning; skipping");
        if let Some(cb) = callback {
            cb.on_block_skipped(block.index, total);
        }
        return BlockOutcome::Skipped;
    }

    // ── Invoking ─────────────────────────────────────────────────────────
    info!(block = block.index + 1, total, "processing block");
    if let Some(cb) = callback {
        cb.on_block_start(block.index, total);
    }

    let output = match client.complete(system_message, &cleaned).await {
        Ok(text) => text,
        Err(e) => {
            warn!(block = block.index, error = %e, "block failed; continuing with next block");
            if let Some(cb) = callback {
                cb.on_block_error(block.index, total, e.to_string());
            }
            return BlockOutcome::Failed {
                error: BlockError::ModelFailed {
                    block: block.index,
                    retries: e.retries,
                    detail: e.source.to_string(),
                },
            };
        }
    };

    // ── Persisting ───────────────────────────────────────────────────────
    match sink.append_block(&output) {
        Ok(()) => {
            info!(block = block.index, chars = output.len(), "block persisted");
            if let Some(cb) = callback {
                cb.on_block_complete(block.index, total, output.len());
            }
            BlockOutcome::Completed {
                chars: output.len(),
            }
        }
        Err(e) => {
            // Persistence failure fails the block, never the run.
            warn!(block = block.index, error = %e, "failed to persist block output");
            if let Some(cb) = callback {
                cb.on_block_error(block.index, total, e.to_string());
            }
            BlockOutcome::Failed {
                error: BlockError::PersistFailed {
                    block: block.index,
                    detail: e.to_string(),
                },
            }
        }
    }
}

/// Read the system message, trimmed of surrounding whitespace.
///
/// The file's existence was validated up front; a read failure here
/// degrades to an empty system message rather than aborting the run.
fn load_system_message(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(raw) => raw.trim().to_string(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read system message; continuing with empty message");
            String::new()
        }
    }
}

/// Gather document information without a model call or credential.
pub fn inspect(path: impl AsRef<Path>) -> Result<DocumentInfo, ProcessError> {
    let path = path.as_ref();
    TextFileSource::new(path)
        .info()
        .map_err(|e| ProcessError::DocumentReadFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
