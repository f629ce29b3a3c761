//! CLI binary for blockshift.
//!
//! A thin shim over the library crate that maps CLI flags and an optional
//! YAML configuration file to `ProcessConfig` and prints results.

use anyhow::{Context, Result};
use blockshift::{
    inspect, process, ConfigFile, ProcessConfig, ProcessProgressCallback, ProgressCallback,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus a per-block log
/// line for every completed, skipped, or failed block.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set by
    /// `on_run_start` (called after extraction, before any block).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} blocks  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

impl ProcessProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_blocks: usize) {
        self.activate_bar(total_blocks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_blocks} blocks…"))
        ));
    }

    fn on_block_start(&self, index: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(format!("block {}", index + 1));
    }

    fn on_block_complete(&self, index: usize, total: usize, output_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Block {:>3}/{:<3}  {:<11}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{output_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_block_skipped(&self, index: usize, total: usize) {
        self.bar.println(format!(
            "  {} Block {:>3}/{:<3}  {}",
            dim("−"),
            index + 1,
            total,
            dim("empty after cleaning, skipped"),
        ));
        self.bar.inc(1);
    }

    fn on_block_error(&self, index: usize, total: usize, error: String) {
        let secs = self.elapsed_secs(index);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error
        };

        self.bar.println(format!(
            "  {} Block {:>3}/{:<3}  {}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_blocks: usize, success_count: usize) {
        let failed_or_skipped = total_blocks.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed_or_skipped == 0 {
            eprintln!(
                "{} {} blocks processed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} blocks processed",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_blocks,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic run
  blockshift -i poems.txt -o poems.out.txt -s system.txt

  # Pick provider and model explicitly
  blockshift -i in.txt -o out.txt -s system.txt -p openai -m gpt-4o-mini

  # Seed everything from a YAML file, override the model on the flag
  blockshift -c blockshift.yaml -m llama3-8b-8192

  # Local inference, no API key
  blockshift -i in.txt -o out.txt -s system.txt -p ollama -m llama3

  # Inspect the input document (no model call, no credential)
  blockshift --inspect-only -i in.txt

  # Structured JSON run report
  blockshift -i in.txt -o out.txt -s system.txt --json > report.json

SUPPORTED PROVIDERS:
  Provider   Endpoint                                  API key
  ────────   ───────────────────────────────────────   ───────
  groq       api.groq.com (OpenAI-compatible)          required
  openai     api.openai.com                            required
  google     generativelanguage.googleapis.com         required
  ollama     localhost:11434 (override: OLLAMA_HOST)   none

CONFIGURATION FILE (YAML, keys optional, flags win):
  llm:
    provider: groq
    model: llama3-70b-8192
    api_key: gsk_...
    temperature: 0.7
    max_tokens: 4096
  files:
    input: poems.txt
    output: poems.out.txt
    system_message: system.txt
  processing:
    max_retries: 3
    delay_between_requests: 1.0

ENVIRONMENT VARIABLES:
  BLOCKSHIFT_PROVIDER   Override provider (groq, openai, google, ollama)
  BLOCKSHIFT_MODEL      Override model ID
  BLOCKSHIFT_API_KEY    API key for the selected provider
  OLLAMA_HOST           Ollama endpoint (default: http://localhost:11434)
"#;

/// Transform document text blocks through an LLM backend.
#[derive(Parser, Debug)]
#[command(
    name = "blockshift",
    version,
    about = "Transform document text blocks through an LLM backend",
    long_about = "Split a document into blank-line-delimited blocks, transform each block \
through an LLM provider (Groq, OpenAI, Google Gemini, or a local Ollama), and save the \
output incrementally after every block.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input document path.
    #[arg(short, long, env = "BLOCKSHIFT_INPUT")]
    input: Option<PathBuf>,

    /// Output document path.
    #[arg(short, long, env = "BLOCKSHIFT_OUTPUT")]
    output: Option<PathBuf>,

    /// System message file path.
    #[arg(short, long, env = "BLOCKSHIFT_SYSTEM_MESSAGE")]
    system_message: Option<PathBuf>,

    /// LLM provider: groq, openai, google, ollama.
    #[arg(short, long, env = "BLOCKSHIFT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier (e.g. llama3-70b-8192, gpt-4o-mini).
    #[arg(short, long, env = "BLOCKSHIFT_MODEL")]
    model: Option<String>,

    /// API key for the selected provider.
    #[arg(short = 'k', long, env = "BLOCKSHIFT_API_KEY")]
    api_key: Option<String>,

    /// YAML configuration file path.
    #[arg(short, long, env = "BLOCKSHIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "BLOCKSHIFT_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max model output tokens per block.
    #[arg(long, env = "BLOCKSHIFT_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Attempts per block before giving up.
    #[arg(long, env = "BLOCKSHIFT_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Seconds slept between blocks.
    #[arg(long, env = "BLOCKSHIFT_DELAY")]
    delay: Option<f64>,

    /// Separator paragraph between output blocks.
    #[arg(long, env = "BLOCKSHIFT_SEPARATOR")]
    separator: Option<String>,

    /// Output the structured run report as JSON on stdout.
    #[arg(long, env = "BLOCKSHIFT_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "BLOCKSHIFT_NO_PROGRESS")]
    no_progress: bool,

    /// Print document info only, no model call.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BLOCKSHIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BLOCKSHIFT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let input = cli
            .input
            .clone()
            .context("--inspect-only needs an input document (-i)")?;
        let info = inspect(&input).context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise info")?
            );
        } else {
            println!("File:         {}", input.display());
            println!("Paragraphs:   {}", info.paragraph_count);
            println!("Size:         {} bytes", info.file_size);
        }
        return Ok(());
    }

    // ── Build config: defaults ← file ← flags ────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ProcessProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = process(&config).await.context("Processing failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet && !show_progress {
        // The progress callback already printed its own summary.
        eprintln!(
            "Processed {}/{} blocks in {}ms",
            report.stats.processed_blocks, report.stats.total_blocks, report.stats.total_duration_ms
        );
        if report.stats.failed_blocks > 0 {
            eprintln!("  {} blocks failed", report.stats.failed_blocks);
        }
    }

    if !report.completed() {
        eprintln!("{} input document could not be read", red("✘"));
        std::process::exit(1);
    }

    Ok(())
}

/// Map the YAML file and CLI flags onto `ProcessConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ProcessConfig> {
    let mut config = ProcessConfig::default();

    // File-based configuration overrides built-in defaults.
    if let Some(ref path) = cli.config {
        match ConfigFile::load(path) {
            Ok(file) => file.apply_to(&mut config),
            Err(e) => eprintln!("{} {e}; continuing with defaults", cyan("⚠")),
        }
    }

    // Command-line flags override the file.
    if let Some(ref v) = cli.input {
        config.input_path = v.clone();
    }
    if let Some(ref v) = cli.output {
        config.output_path = v.clone();
    }
    if let Some(ref v) = cli.system_message {
        config.system_message_path = v.clone();
    }
    if let Some(ref v) = cli.provider {
        config.provider = v.clone();
    }
    if let Some(ref v) = cli.model {
        config.model = v.clone();
    }
    if let Some(ref v) = cli.api_key {
        config.api_key = Some(v.clone());
    }
    if let Some(v) = cli.temperature {
        config.temperature = v.clamp(0.0, 2.0);
    }
    if let Some(v) = cli.max_tokens {
        config.max_tokens = v;
    }
    if let Some(v) = cli.max_retries {
        config.max_retries = v.max(1);
    }
    if let Some(v) = cli.delay {
        config.delay_between_requests = v.max(0.0);
    }
    if let Some(ref v) = cli.separator {
        config.separator = v.clone();
    }
    config.progress_callback = progress;

    if config.input_path.as_os_str().is_empty() {
        anyhow::bail!("No input document given (use -i or the configuration file)");
    }
    if config.output_path.as_os_str().is_empty() {
        anyhow::bail!("No output path given (use -o or the configuration file)");
    }
    if config.system_message_path.as_os_str().is_empty() {
        anyhow::bail!("No system message file given (use -s or the configuration file)");
    }

    Ok(config)
}
