//! Tabular output: records ⇄ CSV via the `csv` crate.
//!
//! The header is always written, even for an empty slice, so a per-document
//! artifact CSV and the aggregated table share the same shape.

use crate::error::ExtractError;
use crate::output::ExtractedRecord;
use std::io::{Read, Write};
use std::path::Path;

/// Column order of every CSV this crate writes.
pub const CSV_HEADER: [&str; 7] = [
    "nombre_pdf",
    "path_pdf",
    "folio",
    "fecha",
    "rut",
    "nombre",
    "estado",
];

/// Write the header followed by one row per record.
pub fn write_records<W: Write>(writer: W, records: &[ExtractedRecord]) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Serialise records into an in-memory CSV document.
pub fn records_to_csv(records: &[ExtractedRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    write_records(&mut buf, records)?;
    Ok(buf)
}

/// Parse a CSV produced by [`write_records`].
pub fn read_records<R: Read>(reader: R) -> Result<Vec<ExtractedRecord>, csv::Error> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader)
        .deserialize()
        .collect()
}

/// Write records to `path` atomically (temp file + rename).
///
/// The temp file is removed again if either step fails.
pub fn write_csv_file(path: &Path, records: &[ExtractedRecord]) -> Result<(), ExtractError> {
    let bytes = records_to_csv(records)?;
    let io_err = |source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp_path = path.with_extension("csv.tmp");
    if let Err(source) =
        std::fs::write(&tmp_path, &bytes).and_then(|()| std::fs::rename(&tmp_path, path))
    {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExtractedRecord {
        ExtractedRecord {
            source_filename: "scan 01.pdf".into(),
            source_path: "pdfs_entrada/scan 01.pdf".into(),
            folio: "0012345".into(),
            fecha: "05/03/2023".into(),
            rut: "12.345.678-5".into(),
            nombre: "NÚÑEZ, MARÍA".into(),
            estado: "APROBADO".into(),
        }
    }

    #[test]
    fn header_written_for_empty_table() {
        let bytes = records_to_csv(&[]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "nombre_pdf,path_pdf,folio,fecha,rut,nombre,estado\n"
        );
    }

    #[test]
    fn rows_follow_header_and_quote_commas() {
        let bytes = records_to_csv(&[sample()]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("nombre_pdf,path_pdf,folio,fecha,rut,nombre,estado"));
        assert_eq!(
            lines.next(),
            Some("scan 01.pdf,pdfs_entrada/scan 01.pdf,0012345,05/03/2023,12.345.678-5,\"NÚÑEZ, MARÍA\",APROBADO")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn file_written_atomically_and_readable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/out.csv");
        let empty = ExtractedRecord::empty("b.pdf", "in/b.pdf");
        write_csv_file(&path, &[sample(), empty.clone()]).unwrap();

        assert!(!path.with_extension("csv.tmp").exists());
        let back = read_records(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(back, vec![sample(), empty]);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        // A non-empty directory where the CSV should go makes the rename fail.
        let path = tmp.path().join("out.csv");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let err = write_csv_file(&path, &[sample()]).unwrap_err();

        assert!(matches!(err, ExtractError::OutputWriteFailed { .. }));
        assert!(!tmp.path().join("out.csv.tmp").exists());
        assert!(path.join("keep").exists());
    }
}
