//! CLI binary for edgequake-bookmeta.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and `BatchOptions`, then writes the combined table.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_bookmeta::pipeline::generate::to_csv;
use edgequake_bookmeta::{
    configure_registry, process_folder, write_output, BatchOptions, BatchProgressCallback,
    CapabilityKind, ExtractionConfig, ExtractionConfigBuilder, Formatted, ProgressCallback, Registry,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar anchored at the bottom of the terminal
/// plus one log line per book.
struct CliProgressCallback {
    bar: ProgressBar,
    book_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` tells us how many books there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning photos…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            book_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} books  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn book_elapsed(&self) -> f64 {
        self.book_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_books: usize) {
        self.activate_bar(total_books);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting metadata for {total_books} books…"))
        ));
    }

    fn on_book_start(&self, book: &str, _index: usize, _total: usize) {
        if let Ok(mut t) = self.book_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(book.to_string());
    }

    fn on_book_complete(&self, book: &str, index: usize, total: usize, rows: usize) {
        self.bar.println(format!(
            "  {} Book {:>3}/{:<3}  {:<20}  {:<8}  {}",
            green("✓"),
            index,
            total,
            book,
            dim(&format!("{rows:>3} rows")),
            dim(&format!("{:.1}s", self.book_elapsed())),
        ));
        self.bar.inc(1);
    }

    fn on_book_error(&self, book: &str, index: usize, total: usize, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Book {:>3}/{:<3}  {:<20}  {}  {}",
            red("✗"),
            index,
            total,
            book,
            red(&msg),
            dim(&format!("{:.1}s", self.book_elapsed())),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_books: usize, success_count: usize) {
        self.bar.finish_and_clear();
        eprintln!("{}", batch_summary(total_books, success_count));
    }
}

/// Closing line of a run. Failures are the books that did not succeed.
fn batch_summary(total_books: usize, success_count: usize) -> String {
    let failed = total_books.saturating_sub(success_count);
    if failed == 0 {
        return format!(
            "{} {} books extracted successfully",
            green("✔"),
            bold(&success_count.to_string())
        );
    }
    format!(
        "{} {}/{} books extracted  ({} failed)",
        if failed == total_books {
            red("✘")
        } else {
            cyan("⚠")
        },
        bold(&success_count.to_string()),
        total_books,
        red(&failed.to_string()),
    )
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Photos named book1_1.jpg, book1_2.jpg, book2_1.jpg … → output.csv
  book2table photos/

  # Write to stdout
  book2table photos/ -o -

  # Use an edgequake-llm provider instead of Anthropic
  book2table --provider openai --provider-model gpt-4.1 --model openai photos/

  # Per-book results as JSON
  book2table --json photos/ -o books.json

  # Show registered models and formats
  book2table --list

FILE NAMING:
  All photos of one book share the prefix before the first underscore:
  moby_1.jpg, moby_2.jpg → book "moby". Accepted: .jpg, .jpeg, .png

FORMATS:
  CSV        comma-separated, one header line (default)
  TABLE      row records; written as CSV
  MARC21     reserved, not implemented
  BIBFRAME2  reserved, not implemented

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (fallback: ANTHROPIC_KEY)
  ANTHROPIC_MODEL         Claude model ID (default claude-3-5-sonnet-20240620)
  ANTHROPIC_BASE_URL      Anthropic endpoint (default https://api.anthropic.com)
  EDGEQUAKE_LLM_PROVIDER  edgequake-llm provider to register (openai, gemini, ollama, …)
  EDGEQUAKE_MODEL         Model for that provider
  OPENAI_API_KEY, GEMINI_API_KEY, …  read by the provider itself
"#;

/// Extract book metadata from photos into a table using vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "book2table",
    version,
    about = "Extract book metadata from photos into a CSV table using vision LLMs",
    long_about = "Group the photos in a folder by book (file-name prefix before the first \
underscore), send each book's photos to a vision model in one request and collect the \
bibliographic metadata it reads into one CSV table.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the book photos.
    #[arg(required_unless_present = "list")]
    folder: Option<PathBuf>,

    /// Output file; `-` writes to stdout.
    #[arg(short, long, env = "BOOK2TABLE_OUTPUT", default_value = "output.csv")]
    output: PathBuf,

    /// Output format: CSV, TABLE, MARC21, BIBFRAME2.
    #[arg(long, env = "BOOK2TABLE_FORMAT", default_value = "CSV")]
    format: String,

    /// Registered AI model name to use.
    #[arg(long, env = "BOOK2TABLE_MODEL", default_value = "anthropic")]
    model: String,

    /// edgequake-llm provider to register (openai, gemini, ollama, azure, …).
    #[arg(long, env = "BOOK2TABLE_PROVIDER")]
    provider: Option<String>,

    /// Model ID for `--provider` (default gpt-4.1-nano).
    #[arg(long, env = "BOOK2TABLE_PROVIDER_MODEL")]
    provider_model: Option<String>,

    /// Max LLM output tokens per book.
    #[arg(long, env = "BOOK2TABLE_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–1.0).
    #[arg(long, env = "BOOK2TABLE_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Per-book LLM call timeout in seconds.
    #[arg(long, env = "BOOK2TABLE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Write per-book results and stats as JSON instead of the table.
    #[arg(long, env = "BOOK2TABLE_JSON")]
    json: bool,

    /// List registered models and formats, then exit.
    #[arg(long)]
    list: bool,

    /// Disable progress bar.
    #[arg(long, env = "BOOK2TABLE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "BOOK2TABLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "BOOK2TABLE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.list && !is_stdout(&cli.output);
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

    // ── Build registry ───────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let registry = configure_registry(&config).context("Failed to set up models")?;

    if cli.list {
        print_registry(&registry);
        return Ok(());
    }

    let folder = cli.folder.as_deref().context("FOLDER is required")?;
    if registry.ai_model(&cli.model).is_none() {
        anyhow::bail!(
            "AI model '{}' is not available (registered: {}). Set ANTHROPIC_API_KEY or use --provider.",
            cli.model,
            names_or_none(&registry, CapabilityKind::AiModel)
        );
    }

    let mut options = BatchOptions::new(&cli.model, &cli.format);
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new_dynamic();
        options = options.with_progress(cb);
    }

    // ── Run batch ────────────────────────────────────────────────────────
    let output = process_folder(Arc::new(registry), folder, options)
        .await
        .with_context(|| format!("Extraction failed for {}", folder.display()))?;

    let result = if cli.json {
        Formatted::Text(serde_json::to_string_pretty(&output).context("Failed to serialise output")?)
    } else {
        output
            .combined()
            .context("No book produced any output")?
    };

    if is_stdout(&cli.output) {
        let body = match result {
            Formatted::Text(text) => text,
            Formatted::Table(rows) => to_csv(&rows),
        };
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(body.as_bytes())
            .context("Failed to write to stdout")?;
        if !body.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    } else {
        write_output(&cli.output, &result)
            .await
            .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    }

    // ── Summary ──────────────────────────────────────────────────────────
    let stats = &output.stats;
    if !cli.quiet {
        let destination = if is_stdout(&cli.output) {
            "stdout".to_string()
        } else {
            cli.output.display().to_string()
        };
        eprintln!(
            "{}  {}/{} books  {} images  {}ms  →  {}",
            if stats.failed_books == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_books,
            stats.total_books,
            stats.total_images,
            stats.total_duration_ms,
            bold(&destination),
        );
        for failed in output.books.iter().filter_map(|b| b.error.as_ref()) {
            eprintln!("   {} {}", red("✗"), dim(&failed.to_string()));
        }
    }

    Ok(())
}

/// Map CLI args onto the environment-derived config.
fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfigBuilder::from_config(ExtractionConfig::from_env())
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(ref model) = cli.provider_model {
        builder = builder.provider_model(model.as_str());
    }

    builder.build().context("Invalid configuration")
}

fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn names_or_none(registry: &Registry, kind: CapabilityKind) -> String {
    let names = registry.list_names(kind);
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn print_registry(registry: &Registry) {
    for (label, kind) in [
        ("AI models", CapabilityKind::AiModel),
        ("Output formats", CapabilityKind::OutputGenerator),
        ("Text extractors", CapabilityKind::TextExtractor),
    ] {
        println!("{:<16} {}", format!("{label}:"), names_or_none(registry, kind));
    }
}
