//! Error types for the pdf-folio-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **Fatal**. The batch cannot proceed at all (input
//!   directory missing, no PDFs, pdfium not loadable, output not writable).
//!   Returned as `Err(ExtractError)` from the top-level `extract_*` functions.
//!
//! * [`DocumentError`]: **Non-fatal**. A single document failed (not a PDF,
//!   corrupt, OCR crashed) but the rest of the batch is fine. Stored inside
//!   [`crate::output::DocumentFailure`] so callers can report it after the run.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-folio-extract library.
///
/// Per-document failures use [`DocumentError`] and are collected in
/// [`crate::output::BatchOutput::failures`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input directory does not exist.
    #[error("Input directory not found: '{path}'\nCheck the path exists and is readable.")]
    DirectoryNotFound { path: PathBuf },

    /// Input path exists but is a regular file, not a directory.
    #[error("Input path is not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// Could not list the input directory.
    #[error("Failed to read directory '{path}': {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory holds no file with a `.pdf` extension.
    #[error("No PDF files found in '{path}'")]
    NoPdfsFound { path: PathBuf },

    /// Every document failed; there is nothing to write.
    #[error("All {total} documents failed.\nFirst error: {first_error}")]
    AllDocumentsFailed { total: usize, first_error: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create, write or rename the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV serialiser rejected a record.
    #[error("Failed to serialise CSV output: {0}")]
    CsvWriteFailed(#[from] csv::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or containing directory).\n\
  • Pass --pdfium-lib <PATH> on the command line.\n\
  • Place libpdfium next to the executable or in the working directory.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// The batch logs it and moves on to the next file.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// File could not be opened or read.
    #[error("I/O error on '{path}': {detail}")]
    Io { path: PathBuf, detail: String },

    /// The file does not start with the `%PDF` magic bytes.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// pdfium could not parse the document.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium loaded the document but could not rasterise page 1.
    #[error("Rasterisation failed for '{path}': {detail}")]
    RenderFailed { path: PathBuf, detail: String },

    /// The OCR engine could not be run or returned garbage.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    /// Writing the per-document artifact folder failed.
    #[error("Failed to write artifacts to '{path}': {detail}")]
    ArtifactWriteFailed { path: PathBuf, detail: String },

    /// The blocking worker panicked or was cancelled.
    #[error("Document task aborted: {0}")]
    TaskAborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pdfs_display() {
        let e = ExtractError::NoPdfsFound {
            path: PathBuf::from("pdfs_entrada"),
        };
        assert!(e.to_string().contains("pdfs_entrada"), "got: {e}");
    }

    #[test]
    fn all_failed_display() {
        let e = ExtractError::AllDocumentsFailed {
            total: 3,
            first_error: "OCR failed: boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 documents"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn not_a_pdf_display() {
        let e = DocumentError::NotAPdf {
            path: PathBuf::from("a.pdf"),
            magic: *b"PK\x03\x04",
        };
        assert!(e.to_string().contains("a.pdf"));
    }

    #[test]
    fn document_error_serialises() {
        let e = DocumentError::OcrFailed {
            detail: "tesseract exited with 1".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("OcrFailed"));
        let back: DocumentError = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, e);
    }
}
