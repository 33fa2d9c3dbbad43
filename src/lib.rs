//! # pdf-folio-extract
//!
//! Pull structured fields out of scanned single-form PDFs and collect them
//! into one CSV table.
//!
//! Every document in the input directory is expected to carry a printed
//! **folio** number near the top of its first page. The folio is used as a
//! layout anchor: once OCR has located it, the date is read from a band
//! around it and the holder's name and RUT from the block below it. The
//! document status is read from the whole page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! directory
//!  │
//!  ├─ 1. Input    list *.pdf (sorted), check %PDF magic
//!  ├─ 2. Render   page 1 → image via pdfium (spawn_blocking)
//!  ├─ 3. OCR      tesseract TSV → words with boxes
//!  ├─ 4. Anchor   locate "FOLIO N° …", derive header / identity crops
//!  ├─ 5. Fields   fecha · rut · nombre · estado
//!  └─ 6. Output   one CSV row per processed document
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_folio_extract::{extract_directory_to_csv, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder().dpi(300).language("spa").build()?;
//!     let output = extract_directory_to_csv("pdfs_entrada", "resultados_pdfs.csv", &config).await?;
//!     eprintln!(
//!         "{} rows, {} failed",
//!         output.stats.processed_documents, output.stats.failed_documents
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `folio2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## External tools
//!
//! - a pdfium shared library (see [`pipeline::render::bind_pdfium`] for the lookup order)
//! - the `tesseract` binary with the configured language data installed

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, RegionLayout, DEFAULT_OUTPUT_FILE};
pub use error::{DocumentError, ExtractError};
pub use extract::{extract_directory, extract_directory_sync, extract_directory_to_csv, Extractor};
pub use output::{BatchOutput, BatchStats, DocumentFailure, ExtractedRecord};
pub use pipeline::ocr::{OcrEngine, OcrMode, OcrPage, TesseractCli};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
