//! CLI binary for pdf-folio-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig`, runs the batch and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_folio_extract::pipeline::ocr::tesseract_available;
use pdf_folio_extract::{
    extract_directory_to_csv, ExtractedRecord, ExtractionConfig, ExtractionProgressCallback,
    ProgressCallback, DEFAULT_OUTPUT_FILE,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar plus one log line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the document currently being processed.
    started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_batch_start` reports how many PDFs there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning directory…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} PDFs  \
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

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total} PDF files…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, name: &str) {
        if let Ok(mut s) = self.started.lock() {
            *s = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, record: &ExtractedRecord) {
        let folio = if record.folio.is_empty() {
            dim("no folio")
        } else {
            format!("folio {}", record.folio)
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            green("✓"),
            index,
            total,
            record.source_filename,
            folio,
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, name: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} PDFs processed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} PDFs processed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process every PDF in pdfs_entrada/ into resultados_pdfs.csv
  folio2csv pdfs_entrada

  # Custom output file and OCR language
  folio2csv pdfs_entrada -o salida/folios.csv --lang spa+eng

  # Keep the rendered page and a one-row CSV per document
  folio2csv pdfs_entrada --artifacts documentos

  # Machine-readable batch report (records, failures, stats)
  folio2csv pdfs_entrada --json > report.json

OUTPUT COLUMNS:
  nombre_pdf, path_pdf, folio, fecha, rut, nombre, estado

REQUIREMENTS:
  tesseract   with the language data for --lang (e.g. tesseract-ocr-spa)
  pdfium      shared library; looked up in --pdfium-lib, PDFIUM_LIB_PATH,
              next to the executable, the current directory, then the
              system library path

ENVIRONMENT VARIABLES:
  FOLIO2CSV_OUTPUT, FOLIO2CSV_DPI, FOLIO2CSV_LANG, FOLIO2CSV_TESSERACT,
  FOLIO2CSV_PASSWORD, FOLIO2CSV_ARTIFACTS, PDFIUM_LIB_PATH
  RUST_LOG    overrides the log filter (e.g. RUST_LOG=pdf_folio_extract=debug)
"#;

/// Extract folio, date, RUT, name and status from scanned PDFs into a CSV.
#[derive(Parser, Debug)]
#[command(
    name = "folio2csv",
    version,
    about = "Extract folio, date, RUT, name and status from scanned PDFs into a CSV",
    long_about = "Render the first page of every PDF in a directory, OCR it with tesseract, \
locate the printed folio and read the date, RUT, holder name and status around it. \
One CSV row is written per processed document.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the PDF files (not searched recursively).
    input_dir: PathBuf,

    /// CSV file to write.
    #[arg(short, long, env = "FOLIO2CSV_OUTPUT", default_value = DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Rendering DPI (72–600).
    #[arg(long, env = "FOLIO2CSV_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Tesseract language code(s), e.g. spa or spa+eng.
    #[arg(long, env = "FOLIO2CSV_LANG", default_value = "spa")]
    lang: String,

    /// Tesseract executable name or path.
    #[arg(long, env = "FOLIO2CSV_TESSERACT", default_value = "tesseract")]
    tesseract: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "FOLIO2CSV_PASSWORD")]
    password: Option<String>,

    /// pdfium shared library, or a directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Write <DIR>/<stem>/<stem>.png and <stem>.csv for every document.
    #[arg(long, env = "FOLIO2CSV_ARTIFACTS", value_name = "DIR")]
    artifacts: Option<PathBuf>,

    /// Print the batch report (records, failures, stats) as JSON on stdout.
    #[arg(long, env = "FOLIO2CSV_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "FOLIO2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FOLIO2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FOLIO2CSV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
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

    // ── External tools ───────────────────────────────────────────────────
    if !tesseract_available(&cli.tesseract) {
        anyhow::bail!(
            "'{}' is not callable; install tesseract (with the '{}' language data) or pass --tesseract",
            cli.tesseract,
            cli.lang
        );
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let output = extract_directory_to_csv(&cli.input_dir, &cli.output, &config)
        .await
        .with_context(|| format!("Extraction from {} failed", cli.input_dir.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} PDFs  {}ms  →  {}",
            if stats.failed_documents == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_documents,
            stats.total_documents,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        if stats.records_without_folio > 0 {
            eprintln!(
                "   {}",
                dim(&format!(
                    "{} documents without a folio (empty fields)",
                    stats.records_without_folio
                ))
            );
        }
        for failure in &output.failures {
            eprintln!("   {} {}: {}", red("✗"), failure.source_filename, failure.error);
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .language(&cli.lang)
        .tesseract_cmd(&cli.tesseract);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    if let Some(ref dir) = cli.artifacts {
        builder = builder.artifacts_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
