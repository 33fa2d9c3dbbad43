//! Batch extraction entry points.
//!
//! A batch walks one input directory, processes its PDFs strictly one at a
//! time in file-name order, and collects a record per document that made it
//! through. A document that fails is logged and skipped; the batch only
//! fails as a whole when there is nothing to process or nothing succeeded.
//!
//! ## Per-document flow
//!
//! ```text
//! validate ─▶ render p.1 ─▶ OCR page ─▶ locate folio ─┬─▶ OCR header   ─▶ fecha
//!                                                     └─▶ OCR identity ─▶ nombre, rut
//!                                         full-page text ─────────────▶ estado + fallbacks
//! ```
//!
//! Rendering and OCR block (pdfium, `tesseract` subprocesses), so each
//! document runs inside `spawn_blocking`; the batch awaits it before moving
//! on to the next file.

use crate::config::ExtractionConfig;
use crate::error::{DocumentError, ExtractError};
use crate::output::{BatchOutput, BatchStats, DocumentFailure, ExtractedRecord};
use crate::pipeline::cleanup::clean_ocr_text;
use crate::pipeline::fields::{find_estado, find_fecha, find_nombre, find_rut};
use crate::pipeline::input::{self, file_name_lossy, file_stem};
use crate::pipeline::ocr::{OcrEngine, OcrMode, TesseractCli};
use crate::pipeline::regions::{derive_regions, locate_folio, Rect};
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer};
use crate::pipeline::table;
use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Renders, recognises and parses documents.
///
/// Cheap to clone: the engines sit behind `Arc`s.
#[derive(Clone)]
pub struct Extractor {
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    config: ExtractionConfig,
}

impl Extractor {
    /// Build an extractor backed by pdfium and the `tesseract` CLI.
    ///
    /// # Errors
    /// [`ExtractError::PdfiumBindingFailed`] if no pdfium library can be loaded.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let rasterizer = PdfiumRasterizer::new(
            config.pdfium_lib_path.as_deref(),
            config.max_rendered_pixels,
        )?;

        let mut ocr = TesseractCli::new(&config.tesseract_cmd, &config.language, config.dpi);
        ocr.full_page_psm = config.full_page_psm;
        ocr.region_psm = config.region_psm;

        Ok(Self::with_engines(
            Arc::new(rasterizer),
            Arc::new(ocr),
            config.clone(),
        ))
    }

    /// Build an extractor from caller-supplied engines.
    pub fn with_engines(
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<dyn OcrEngine>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            rasterizer,
            ocr,
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract one record from one PDF. Blocking.
    ///
    /// A page without a folio still yields a record: source columns filled,
    /// every extracted field empty.
    pub fn extract_document(&self, pdf_path: &Path) -> Result<ExtractedRecord, DocumentError> {
        let start = Instant::now();
        let mut record =
            ExtractedRecord::empty(file_name_lossy(pdf_path), pdf_path.display().to_string());

        input::validate_pdf(pdf_path)?;

        let image = self.rasterizer.render_first_page(
            pdf_path,
            self.config.dpi,
            self.config.password.as_deref(),
        )?;

        let page = self.ocr.recognize(&image, OcrMode::FullPage)?;
        let full_text = clean_ocr_text(&page.text());
        debug!(
            "{}: full-page OCR → {} lines, {} chars",
            record.source_filename,
            page.lines.len(),
            full_text.len()
        );

        let Some(anchor) = locate_folio(&page) else {
            info!("{}: no folio found, emitting empty record", record.source_filename);
            self.write_artifacts(&record, &image);
            return Ok(record);
        };
        debug!(
            "{}: folio {} at {:?}",
            record.source_filename, anchor.folio, anchor.bbox
        );
        record.folio = anchor.folio.clone();

        let regions = derive_regions(&anchor, image.width(), image.height(), &self.config.layout);
        let header_text = self.recognize_region(&image, regions.header, &record.source_filename);
        let identity_text =
            self.recognize_region(&image, regions.identity, &record.source_filename);

        record.fecha = find_fecha(&header_text)
            .or_else(|| find_fecha(&full_text))
            .unwrap_or_default();
        record.rut = find_rut(&identity_text)
            .or_else(|| find_rut(&full_text))
            .unwrap_or_default();
        record.nombre = find_nombre(&identity_text)
            .or_else(|| find_nombre(&full_text))
            .unwrap_or_default();
        record.estado = find_estado(&full_text).unwrap_or_default();

        debug!(
            "{}: extracted in {}ms: {:?}",
            record.source_filename,
            start.elapsed().as_millis(),
            record
        );
        self.write_artifacts(&record, &image);
        Ok(record)
    }

    /// OCR a crop of the page; an empty rectangle or a failed pass yields "".
    fn recognize_region(&self, image: &DynamicImage, rect: Rect, name: &str) -> String {
        if rect.is_empty() {
            return String::new();
        }
        let crop = image.crop_imm(rect.x, rect.y, rect.width, rect.height);
        match self.ocr.recognize(&crop, OcrMode::Region) {
            Ok(page) => clean_ocr_text(&page.text()),
            Err(e) => {
                warn!("{}: region OCR at {:?} failed, using full page: {}", name, rect, e);
                String::new()
            }
        }
    }

    /// Keep the rendered page and a one-row CSV when `artifacts_dir` is set.
    fn write_artifacts(&self, record: &ExtractedRecord, image: &DynamicImage) {
        let Some(root) = self.config.artifacts_dir.as_deref() else {
            return;
        };
        if let Err(e) = save_artifacts(root, record, image) {
            warn!("{}: {}", record.source_filename, e);
        }
    }

    /// Process every PDF in `dir`, one at a time.
    ///
    /// # Errors
    /// - [`ExtractError::DirectoryNotFound`] / [`ExtractError::NotADirectory`]
    /// - [`ExtractError::NoPdfsFound`] when the directory holds no PDF
    /// - [`ExtractError::AllDocumentsFailed`] when no document produced a record
    pub async fn extract_directory(
        &self,
        dir: impl AsRef<Path>,
    ) -> Result<BatchOutput, ExtractError> {
        let total_start = Instant::now();
        let dir = dir.as_ref();
        info!("Scanning {}", dir.display());

        let pdfs = input::list_pdfs(dir)?;
        if pdfs.is_empty() {
            return Err(ExtractError::NoPdfsFound {
                path: dir.to_path_buf(),
            });
        }
        let total = pdfs.len();
        info!("Found {} PDF files", total);

        let callback = self.config.progress_callback.clone();
        if let Some(ref cb) = callback {
            cb.on_batch_start(total);
        }

        let mut records = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (i, path) in pdfs.into_iter().enumerate() {
            let index = i + 1;
            let name = file_name_lossy(&path);
            info!("Processing {}/{}: {}", index, total, name);
            if let Some(ref cb) = callback {
                cb.on_document_start(index, total, &name);
            }

            let worker = self.clone();
            let task_path = path.clone();
            let result = tokio::task::spawn_blocking(move || worker.extract_document(&task_path))
                .await
                .unwrap_or_else(|e| Err(DocumentError::TaskAborted(e.to_string())));

            match result {
                Ok(record) => {
                    if let Some(ref cb) = callback {
                        cb.on_document_complete(index, total, &record);
                    }
                    records.push(record);
                }
                Err(error) => {
                    warn!("Failed to process {}: {}", name, error);
                    if let Some(ref cb) = callback {
                        cb.on_document_error(index, total, &name, &error.to_string());
                    }
                    failures.push(DocumentFailure {
                        source_filename: name,
                        source_path: path.display().to_string(),
                        error,
                    });
                }
            }
        }

        if let Some(ref cb) = callback {
            cb.on_batch_complete(total, records.len());
        }

        if records.is_empty() {
            let first_error = failures
                .first()
                .map(|f| format!("{}: {}", f.source_filename, f.error))
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ExtractError::AllDocumentsFailed { total, first_error });
        }

        let stats = BatchStats {
            total_documents: total,
            processed_documents: records.len(),
            failed_documents: failures.len(),
            records_without_folio: records.iter().filter(|r| r.folio.is_empty()).count(),
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Batch complete: {}/{} documents, {}ms total",
            stats.processed_documents, total, stats.total_duration_ms
        );

        Ok(BatchOutput {
            records,
            failures,
            stats,
        })
    }

    /// Process `dir` and write the records to `output_path` as CSV.
    ///
    /// The file is written atomically (temp file + rename) and only when the
    /// batch produced at least one record.
    pub async fn extract_directory_to_csv(
        &self,
        dir: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<BatchOutput, ExtractError> {
        let output = self.extract_directory(dir).await?;

        let path = output_path.as_ref().to_path_buf();
        let records = output.records.clone();
        tokio::task::spawn_blocking(move || table::write_csv_file(&path, &records))
            .await
            .map_err(|e| ExtractError::Internal(format!("CSV writer task failed: {}", e)))??;
        info!(
            "Wrote {} records to {}",
            output.records.len(),
            output_path.as_ref().display()
        );
        Ok(output)
    }
}

/// Extract records from every PDF in `dir` using pdfium and tesseract.
///
/// The directory is scanned before pdfium is bound, so an empty directory
/// reports [`ExtractError::NoPdfsFound`] even on a machine without pdfium.
///
/// # Example
/// ```rust,no_run
/// use pdf_folio_extract::{extract_directory, ExtractionConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let output = extract_directory("pdfs_entrada", &ExtractionConfig::default()).await?;
///     for r in &output.records {
///         println!("{} → folio {} rut {}", r.source_filename, r.folio, r.rut);
///     }
///     Ok(())
/// }
/// ```
pub async fn extract_directory(
    dir: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ExtractError> {
    let dir = dir.as_ref();
    ensure_has_pdfs(dir)?;
    Extractor::from_config(config)?.extract_directory(dir).await
}

/// Extract every PDF in `dir` and write the records to `output_path` as CSV.
///
/// No file is created when the batch fails.
pub async fn extract_directory_to_csv(
    dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ExtractError> {
    let dir = dir.as_ref();
    ensure_has_pdfs(dir)?;
    Extractor::from_config(config)?
        .extract_directory_to_csv(dir, output_path)
        .await
}

/// Synchronous wrapper around [`extract_directory`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_directory_sync(
    dir: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_directory(dir, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn ensure_has_pdfs(dir: &Path) -> Result<(), ExtractError> {
    if input::list_pdfs(dir)?.is_empty() {
        return Err(ExtractError::NoPdfsFound {
            path: dir.to_path_buf(),
        });
    }
    Ok(())
}

/// `<root>/<stem>/<stem>.png` and `<root>/<stem>/<stem>.csv`.
fn save_artifacts(
    root: &Path,
    record: &ExtractedRecord,
    image: &DynamicImage,
) -> Result<(), DocumentError> {
    let stem = artifact_stem(root, &record.source_filename);
    let stem = stem.as_str();
    let dir = root.join(stem);
    let fail = |detail: String| DocumentError::ArtifactWriteFailed {
        path: dir.clone(),
        detail,
    };

    std::fs::create_dir_all(&dir).map_err(|e| fail(e.to_string()))?;
    image
        .save_with_format(dir.join(format!("{stem}.png")), ImageFormat::Png)
        .map_err(|e| fail(e.to_string()))?;
    table::write_csv_file(&dir.join(format!("{stem}.csv")), std::slice::from_ref(record))
        .map_err(|e| fail(e.to_string()))?;

    debug!("Artifacts written to {}", dir.display());
    Ok(())
}

/// Artifact folder name for `file_name`.
///
/// Normally the file stem. When `<root>/<stem>/<stem>.csv` already belongs to
/// another PDF with the same stem (`a.pdf` next to `a.PDF`), the extension is
/// appended (`a_pdf`) so neither document's artifacts are overwritten.
fn artifact_stem(root: &Path, file_name: &str) -> String {
    let stem = file_stem(file_name);
    let existing = root.join(stem).join(format!("{stem}.csv"));
    let owner = std::fs::File::open(&existing)
        .ok()
        .and_then(|f| table::read_records(f).ok())
        .and_then(|rows| rows.into_iter().next())
        .map(|r| r.source_filename);

    match owner {
        Some(owner) if owner != file_name => {
            let ext = file_name.get(stem.len() + 1..).unwrap_or_default();
            let renamed = format!("{stem}_{ext}");
            warn!(
                "{}: artifacts for {} already use '{}', writing to '{}'",
                file_name, owner, stem, renamed
            );
            renamed
        }
        _ => stem.to_string(),
    }
}
