//! Input discovery: list the PDFs of a directory and sanity-check each file.
//!
//! pdfium crashes in unhelpful ways on non-PDF input, so every file is
//! checked for the `%PDF` magic bytes before it reaches the renderer.

use crate::error::{DocumentError, ExtractError};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// List the PDF files directly inside `dir`, sorted by file name.
///
/// Only regular files whose extension is `pdf` (any case) are returned;
/// sub-directories are not descended into. Sorting makes repeated runs over
/// an unchanged directory emit rows in the same order.
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    if !dir.exists() {
        return Err(ExtractError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(ExtractError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|source| ExtractError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_pdf_extension(path))
        .collect();

    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} PDF files in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

/// True when the path ends in `.pdf`, ignoring case.
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Verify the file is readable and starts with `%PDF`.
pub fn validate_pdf(path: &Path) -> Result<(), DocumentError> {
    let mut file = std::fs::File::open(path).map_err(|e| DocumentError::Io {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) if &magic == b"%PDF" => Ok(()),
        Ok(()) => Err(DocumentError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
        // Shorter than four bytes: report whatever was there.
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(DocumentError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        }),
        Err(e) => Err(DocumentError::Io {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// File name without its final extension (`scan.01.pdf` → `scan.01`).
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// File name as a lossy UTF-8 string, empty if the path has none.
pub fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
