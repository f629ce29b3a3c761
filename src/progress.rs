//! Progress-callback trait for per-block pipeline events.
//!
//! Inject an [`Arc<dyn ProcessProgressCallback>`] via
//! [`crate::config::ProcessConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each block. The callback is the
//! library's observability seam: the core never initialises a global
//! logger, so hosts can forward events to a progress bar, a channel, or a
//! database record without the library knowing how the host communicates.

use std::sync::Arc;

/// Called by the pipeline as it processes each block.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`; the
/// pipeline itself processes one block at a time, so calls arrive
/// strictly in order.
pub trait ProcessProgressCallback: Send + Sync {
    /// Called once after extraction, before any block is processed.
    fn on_run_start(&self, total_blocks: usize) {
        let _ = total_blocks;
    }

    /// Called just before a block's model call is issued.
    fn on_block_start(&self, index: usize, total_blocks: usize) {
        let _ = (index, total_blocks);
    }

    /// Called when a block's output is durably persisted.
    fn on_block_complete(&self, index: usize, total_blocks: usize, output_len: usize) {
        let _ = (index, total_blocks, output_len);
    }

    /// Called when a block is dropped because cleaning left nothing to send.
    fn on_block_skipped(&self, index: usize, total_blocks: usize) {
        let _ = (index, total_blocks);
    }

    /// Called when a block fails terminally (retries exhausted or sink
    /// failure).
    fn on_block_error(&self, index: usize, total_blocks: usize, error: String) {
        let _ = (index, total_blocks, error);
    }

    /// Called once after the last block's outcome is recorded.
    fn on_run_complete(&self, total_blocks: usize, success_count: usize) {
        let _ = (total_blocks, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ProcessProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::ProcessConfig`].
pub type ProgressCallback = Arc<dyn ProcessProgressCallback>;
