//! Structured run outcome: per-block records plus aggregate stats.

use crate::error::BlockError;
use serde::{Deserialize, Serialize};

/// Outcome of one block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockOutcome {
    /// Transformed and durably persisted.
    Completed { chars: usize },
    /// Dropped before the model call: cleaning left nothing to send.
    Skipped,
    /// Terminal failure for this block only; the run continued.
    Failed { error: BlockError },
}

/// Record of a single block's journey through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    /// 0-indexed block position in the source document.
    pub index: usize,
    /// Wall-clock time spent on this block, backoff included.
    pub duration_ms: u64,
    pub outcome: BlockOutcome,
}

impl BlockRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, BlockOutcome::Completed { .. })
    }
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Blocks extracted from the source document.
    pub total_blocks: usize,
    /// Blocks transformed and persisted.
    pub processed_blocks: usize,
    /// Blocks dropped because cleaning left them empty.
    pub skipped_blocks: usize,
    /// Blocks that failed terminally.
    pub failed_blocks: usize,
    /// Wall-clock duration of the whole run.
    pub total_duration_ms: u64,
}

/// Full outcome of a run.
///
/// Returned as `Ok` even when individual blocks failed — fatal
/// configuration problems are the only `Err` path. The
/// [`completed`](RunReport::completed) boolean models "the run completed",
/// not "every block succeeded"; callers judge acceptability from the
/// counts in [`RunStats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub stats: RunStats,
    pub blocks: Vec<BlockRecord>,
    /// True when the source could not be opened or read; the run then has
    /// zero processable blocks.
    pub extraction_failed: bool,
}

impl RunReport {
    /// Whether the run completed: true whenever extraction itself did not
    /// fail, regardless of individual block failures.
    pub fn completed(&self) -> bool {
        !self.extraction_failed
    }
}
