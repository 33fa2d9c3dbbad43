//! Result types produced by a batch run.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};

/// One row of the output table: the five extracted fields plus the source file.
///
/// Field names serialise to the CSV header
/// `nombre_pdf, path_pdf, folio, fecha, rut, nombre, estado`.
/// Every extracted field is an empty string when it could not be found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// File name of the PDF, e.g. `scan_001.pdf`.
    #[serde(rename = "nombre_pdf")]
    pub source_filename: String,
    /// Input directory joined with the file name, as given on the command line.
    #[serde(rename = "path_pdf")]
    pub source_path: String,
    pub folio: String,
    /// Date normalised to `dd/mm/yyyy`.
    pub fecha: String,
    /// RUT normalised to `12.345.678-K`.
    pub rut: String,
    pub nombre: String,
    pub estado: String,
}

impl ExtractedRecord {
    /// A record with the source columns filled and every extracted field empty.
    pub fn empty(source_filename: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            source_filename: source_filename.into(),
            source_path: source_path.into(),
            ..Self::default()
        }
    }

    /// True when no extracted field carries a value.
    pub fn is_blank(&self) -> bool {
        self.folio.is_empty()
            && self.fecha.is_empty()
            && self.rut.is_empty()
            && self.nombre.is_empty()
            && self.estado.is_empty()
    }
}

/// A document that produced no record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub source_filename: String,
    pub source_path: String,
    pub error: DocumentError,
}

/// Counters for a finished batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// PDF files found in the input directory.
    pub total_documents: usize,
    /// Documents that produced a record.
    pub processed_documents: usize,
    /// Documents that failed and were skipped.
    pub failed_documents: usize,
    /// Records where no folio was located (all fields empty).
    pub records_without_folio: usize,
    pub total_duration_ms: u64,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One record per successfully processed document, in file-name order.
    pub records: Vec<ExtractedRecord>,
    pub failures: Vec<DocumentFailure>,
    pub stats: BatchStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_is_blank() {
        let r = ExtractedRecord::empty("a.pdf", "dir/a.pdf");
        assert!(r.is_blank());
        assert_eq!(r.source_filename, "a.pdf");
        assert_eq!(r.source_path, "dir/a.pdf");
    }

    #[test]
    fn record_serialises_with_csv_column_names() {
        let mut r = ExtractedRecord::empty("a.pdf", "dir/a.pdf");
        r.rut = "12.345.678-5".into();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["nombre_pdf"], "a.pdf");
        assert_eq!(json["path_pdf"], "dir/a.pdf");
        assert_eq!(json["rut"], "12.345.678-5");
        assert!(!r.is_blank());
    }
}
