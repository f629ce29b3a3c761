//! End-to-end pipeline tests for blockshift.
//!
//! Every scenario runs against the scripted [`MockBackend`] — no network,
//! no credentials — so these tests exercise the real pipeline (extraction,
//! normalisation, retry loop, incremental persistence, pacing) fully
//! deterministically.

use blockshift::llm::MockBackend;
use blockshift::{
    run_pipeline, BlockOutcome, BlockSink, CompletionOptions, ModelClient, ParagraphSource,
    ProcessConfig, ProcessProgressCallback, SinkError, TextFileSink, TextFileSource,
    DEFAULT_SEPARATOR,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Paragraph source backed by a fixed list.
struct VecSource {
    paragraphs: Vec<String>,
    open_fails: bool,
}

impl VecSource {
    fn of(paragraphs: &[&str]) -> Self {
        Self {
            paragraphs: paragraphs.iter().map(|s| s.to_string()).collect(),
            open_fails: false,
        }
    }

    fn unreadable() -> Self {
        Self {
            paragraphs: Vec::new(),
            open_fails: true,
        }
    }
}

impl ParagraphSource for VecSource {
    fn open(&self) -> io::Result<Box<dyn Iterator<Item = io::Result<String>> + Send>> {
        if self.open_fails {
            return Err(io::Error::new(io::ErrorKind::NotFound, "document unreadable"));
        }
        Ok(Box::new(self.paragraphs.clone().into_iter().map(Ok)))
    }
}

/// In-memory sink recording the visible paragraph sequence and counting
/// durable saves (one per successful append).
#[derive(Default)]
struct MemorySink {
    separator: String,
    paragraphs: Vec<String>,
    saves: usize,
    offline: bool,
}

impl MemorySink {
    fn with_separator(separator: &str) -> Self {
        Self {
            separator: separator.to_string(),
            ..Self::default()
        }
    }

    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }
}

impl BlockSink for MemorySink {
    fn append_block(&mut self, text: &str) -> Result<(), SinkError> {
        if self.offline {
            return Err(SinkError::Io(io::Error::new(
                io::ErrorKind::Other,
                "sink offline",
            )));
        }
        if !self.paragraphs.is_empty() {
            self.paragraphs.push(self.separator.clone());
        }
        self.paragraphs.push(text.to_string());
        self.saves += 1;
        Ok(())
    }
}

fn mock_client(backend: MockBackend, max_retries: u32) -> ModelClient {
    ModelClient::new(
        Arc::new(backend),
        max_retries,
        CompletionOptions::default(),
    )
}

fn quick_config() -> ProcessConfig {
    ProcessConfig {
        delay_between_requests: 0.0,
        ..ProcessConfig::default()
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

/// Two blocks through an uppercasing model: the sink sees the paragraphs
/// in order with the default separator between them, and is durably saved
/// once per block — two saves, not one batch.
#[tokio::test]
async fn two_blocks_persist_incrementally_with_separator() {
    let client = mock_client(MockBackend::uppercase(), 3);
    let source = VecSource::of(&["Hello", "", "World"]);
    let mut sink = MemorySink::with_separator(DEFAULT_SEPARATOR);

    let report = run_pipeline(&client, &source, &mut sink, "shout", &quick_config()).await;

    assert_eq!(
        sink.paragraphs,
        vec!["HELLO", DEFAULT_SEPARATOR, "WORLD"],
        "sink must see transformed blocks in order, separator between"
    );
    assert_eq!(sink.saves, 2, "one durable save per block, never batched");

    assert!(report.completed());
    assert_eq!(report.stats.total_blocks, 2);
    assert_eq!(report.stats.processed_blocks, 2);
    assert_eq!(report.stats.failed_blocks, 0);
    assert!(report.blocks.iter().all(|b| b.succeeded()));
}

/// The second block's model call exhausts its retries: only the first
/// block reaches the sink, the report shows 1/2, and the run still counts
/// as completed because extraction succeeded.
#[tokio::test(start_paused = true)]
async fn failed_block_is_recorded_and_run_continues() {
    let backend = MockBackend::uppercase().failing_when_input_contains("World");
    let client = mock_client(backend, 3);
    let source = VecSource::of(&["Hello", "", "World"]);
    let mut sink = MemorySink::with_separator(DEFAULT_SEPARATOR);

    let report = run_pipeline(&client, &source, &mut sink, "shout", &quick_config()).await;

    assert_eq!(sink.paragraphs, vec!["HELLO"]);
    assert_eq!(sink.saves, 1);

    assert!(report.completed(), "extraction succeeded, so the run completed");
    assert_eq!(report.stats.total_blocks, 2);
    assert_eq!(report.stats.processed_blocks, 1);
    assert_eq!(report.stats.failed_blocks, 1);

    match &report.blocks[1].outcome {
        BlockOutcome::Failed { error } => {
            let msg = error.to_string();
            assert!(msg.contains("3 retries"), "got: {msg}");
        }
        other => panic!("expected Failed outcome, got {other:?}"),
    }
}

/// A block failure must not poison later blocks: block 2 fails, block 3
/// still gets processed and persisted.
#[tokio::test(start_paused = true)]
async fn pipeline_moves_on_after_a_failure() {
    let backend = MockBackend::uppercase().failing_when_input_contains("poison");
    let client = mock_client(backend, 2);
    let source = VecSource::of(&["one", "", "poison", "", "three"]);
    let mut sink = MemorySink::with_separator("|");

    let report = run_pipeline(&client, &source, &mut sink, "", &quick_config()).await;

    assert_eq!(sink.paragraphs, vec!["ONE", "|", "THREE"]);
    assert_eq!(report.stats.processed_blocks, 2);
    assert_eq!(report.stats.failed_blocks, 1);
}

/// An unreadable source is not a crash: zero processable blocks, nothing
/// persisted, and the report says the run did not complete.
#[tokio::test]
async fn unreadable_source_reports_non_completion() {
    let client = mock_client(MockBackend::uppercase(), 3);
    let source = VecSource::unreadable();
    let mut sink = MemorySink::with_separator(DEFAULT_SEPARATOR);

    let report = run_pipeline(&client, &source, &mut sink, "", &quick_config()).await;

    assert!(!report.completed());
    assert!(report.extraction_failed);
    assert_eq!(report.stats.total_blocks, 0);
    assert_eq!(sink.saves, 0);
}

/// A document of only blank paragraphs is a successful, empty run —
/// distinguishable from the unreadable-source case.
#[tokio::test]
async fn all_blank_document_completes_with_zero_blocks() {
    let client = mock_client(MockBackend::uppercase(), 3);
    let source = VecSource::of(&["", "   ", ""]);
    let mut sink = MemorySink::with_separator(DEFAULT_SEPARATOR);

    let report = run_pipeline(&client, &source, &mut sink, "", &quick_config()).await;

    assert!(report.completed());
    assert_eq!(report.stats.total_blocks, 0);
    assert_eq!(sink.saves, 0);
}

/// Sink failures fail the block, not the run: both blocks are recorded as
/// failed, the model was still called for each, and the run completes.
#[tokio::test]
async fn sink_failure_fails_blocks_but_not_the_run() {
    let client = mock_client(MockBackend::uppercase(), 3);
    let source = VecSource::of(&["Hello", "", "World"]);
    let mut sink = MemorySink::offline();

    let report = run_pipeline(&client, &source, &mut sink, "", &quick_config()).await;

    assert!(report.completed());
    assert_eq!(report.stats.processed_blocks, 0);
    assert_eq!(report.stats.failed_blocks, 2);
    assert!(report
        .blocks
        .iter()
        .all(|b| matches!(b.outcome, BlockOutcome::Failed { .. })));
}

/// File-backed run: paragraphs come from a real input file and the output
/// file on disk reflects each append as it happens.
#[tokio::test]
async fn file_to_file_run_produces_separated_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    std::fs::write(&input, "Hello\n\nWorld\n").unwrap();

    let client = mock_client(MockBackend::uppercase(), 3);
    let source = TextFileSource::new(&input);
    let mut sink = TextFileSink::new(&output, DEFAULT_SEPARATOR);

    let report = run_pipeline(&client, &source, &mut sink, "shout", &quick_config()).await;

    assert_eq!(report.stats.processed_blocks, 2);
    let contents = std::fs::read_to_string(&output).unwrap();
    assert!(contents.contains("HELLO"));
    assert!(contents.contains("*********"));
    assert!(contents.contains("WORLD"));
    assert!(
        contents.find("HELLO").unwrap() < contents.find("WORLD").unwrap(),
        "blocks must appear in source order"
    );
}

/// Progress callbacks fire once per event, in order, with correct totals.
#[tokio::test(start_paused = true)]
async fn progress_callbacks_fire_per_block() {
    struct Counting {
        run_total: AtomicUsize,
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        final_success: AtomicUsize,
    }

    impl ProcessProgressCallback for Counting {
        fn on_run_start(&self, total: usize) {
            self.run_total.store(total, Ordering::SeqCst);
        }
        fn on_block_start(&self, _i: usize, _t: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_block_complete(&self, _i: usize, _t: usize, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_block_error(&self, _i: usize, _t: usize, _e: String) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
        fn on_run_complete(&self, _total: usize, success: usize) {
            self.final_success.store(success, Ordering::SeqCst);
        }
    }

    let counting = Arc::new(Counting {
        run_total: AtomicUsize::new(0),
        starts: AtomicUsize::new(0),
        completes: AtomicUsize::new(0),
        errors: AtomicUsize::new(0),
        final_success: AtomicUsize::new(0),
    });

    let mut config = quick_config();
    config.progress_callback =
        Some(Arc::clone(&counting) as Arc<dyn ProcessProgressCallback>);

    let backend = MockBackend::uppercase().failing_when_input_contains("bad");
    let client = mock_client(backend, 2);
    let source = VecSource::of(&["good", "", "bad"]);
    let mut sink = MemorySink::with_separator("-");

    run_pipeline(&client, &source, &mut sink, "", &config).await;

    assert_eq!(counting.run_total.load(Ordering::SeqCst), 2);
    assert_eq!(counting.starts.load(Ordering::SeqCst), 2);
    assert_eq!(counting.completes.load(Ordering::SeqCst), 1);
    assert_eq!(counting.errors.load(Ordering::SeqCst), 1);
    assert_eq!(counting.final_success.load(Ordering::SeqCst), 1);
}

/// Model calls are stateless between blocks: the second call carries only
/// the system instruction and the second block, never prior history.
#[tokio::test]
async fn model_calls_carry_no_history() {
    let backend = Arc::new(MockBackend::uppercase());
    let client = ModelClient::new(
        Arc::clone(&backend) as _,
        3,
        CompletionOptions::default(),
    );
    let source = VecSource::of(&["first", "", "second"]);
    let mut sink = MemorySink::with_separator("-");

    run_pipeline(&client, &source, &mut sink, "instruction", &quick_config()).await;

    let last = backend.last_messages();
    assert_eq!(last.len(), 2, "exactly system + user, no history");
    assert_eq!(last[0].role, "system");
    assert_eq!(last[0].content, "instruction");
    assert_eq!(last[1].role, "user");
    assert_eq!(last[1].content, "second");
}
