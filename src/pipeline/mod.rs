//! Pipeline stages for folio extraction.
//!
//! Each submodule implements exactly one step. Rendering and OCR sit behind
//! traits ([`render::PageRasterizer`], [`ocr::OcrEngine`]) so the parsing
//! stages can be tested on plain text.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ ocr ──▶ cleanup ──▶ regions ──▶ ocr ──▶ fields ──▶ table
//! (dir)    (pdfium)  (page)   (text)     (anchor)   (crops)  (regex)    (CSV)
//! ```
//!
//! 1. [`input`]   list the PDFs of a directory and check their magic bytes
//! 2. [`render`]  rasterise page 1; blocking, called from `spawn_blocking`
//! 3. [`ocr`]     run tesseract and keep per-word bounding boxes
//! 4. [`cleanup`] normalise OCR text before any regex sees it
//! 5. [`regions`] find the folio and derive the header and identity crops
//! 6. [`fields`]  parse fecha, RUT, nombre and estado
//! 7. [`table`]   write records as CSV

pub mod cleanup;
pub mod fields;
pub mod input;
pub mod ocr;
pub mod regions;
pub mod render;
pub mod table;
