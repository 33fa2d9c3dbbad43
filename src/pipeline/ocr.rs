//! OCR: turn a page (or a crop of one) into positioned words.
//!
//! The default engine shells out to the `tesseract` binary and asks for its
//! TSV output, which carries a bounding box per word. Boxes are what make the
//! folio usable as a layout anchor; plain-text OCR would only say *that* the
//! folio is on the page, not *where*.
//!
//! The image handed to tesseract is written to a PNG inside a fresh
//! [`TempDir`], which is deleted when the call returns.

use crate::error::DocumentError;
use crate::pipeline::regions::Rect;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Which kind of image is being recognised; selects the page segmentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrMode {
    /// A whole rendered page.
    FullPage,
    /// A crop derived from the folio anchor.
    Region,
}

/// One recognised word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    pub bbox: Rect,
    /// Tesseract confidence, 0–100.
    pub confidence: f32,
}

/// Words sharing a (block, paragraph, line) key, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrLine {
    pub words: Vec<OcrWord>,
}

impl OcrLine {
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything recognised on one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPage {
    pub width: u32,
    pub height: u32,
    pub lines: Vec<OcrLine>,
}

impl OcrPage {
    /// Lines joined with `\n`, words with a single space.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(OcrLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn words(&self) -> impl Iterator<Item = &OcrWord> {
        self.lines.iter().flat_map(|l| l.words.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.words.is_empty())
    }

    /// Build a page from plain text on a synthetic grid.
    ///
    /// Line `i` sits at `y = 40 + 50·i` with height 30; each character is 20 px
    /// wide and words are separated by 20 px. Useful for engines that return
    /// text without geometry.
    pub fn from_text(width: u32, height: u32, text: &str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| {
                let y = 40 + 50 * i as u32;
                let mut x = 50;
                let words = line
                    .split_whitespace()
                    .map(|w| {
                        let w_px = 20 * w.chars().count() as u32;
                        let word = OcrWord {
                            text: w.to_string(),
                            bbox: Rect::new(x, y, w_px, 30),
                            confidence: 100.0,
                        };
                        x += w_px + 20;
                        word
                    })
                    .collect();
                OcrLine { words }
            })
            .collect();

        Self {
            width,
            height,
            lines,
        }
    }
}

/// Recognises text in an image.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage, mode: OcrMode) -> Result<OcrPage, DocumentError>;
}

/// [`OcrEngine`] backed by the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub command: String,
    pub language: String,
    pub dpi: u32,
    pub full_page_psm: u8,
    pub region_psm: u8,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>, language: impl Into<String>, dpi: u32) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            dpi,
            full_page_psm: 3,
            region_psm: 6,
        }
    }

    fn psm(&self, mode: OcrMode) -> u8 {
        match mode {
            OcrMode::FullPage => self.full_page_psm,
            OcrMode::Region => self.region_psm,
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &DynamicImage, mode: OcrMode) -> Result<OcrPage, DocumentError> {
        let temp_dir = TempDir::new().map_err(|e| DocumentError::OcrFailed {
            detail: format!("temp dir: {e}"),
        })?;
        let png = temp_dir.path().join("page.png");
        image
            .save_with_format(&png, ImageFormat::Png)
            .map_err(|e| DocumentError::OcrFailed {
                detail: format!("writing {}: {e}", png.display()),
            })?;

        let output = Command::new(&self.command)
            .arg(&png)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm(mode).to_string())
            .arg("--dpi")
            .arg(self.dpi.to_string())
            .arg("tsv")
            .output()
            .map_err(|e| DocumentError::OcrFailed {
                detail: format!("failed to run '{}': {e}", self.command),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocumentError::OcrFailed {
                detail: format!("'{}' exited with {}: {}", self.command, output.status, stderr.trim()),
            });
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let mut page = parse_tsv(&tsv)?;
        page.width = image.width();
        page.height = image.height();
        debug!(
            "OCR ({:?}) {}x{} → {} lines",
            mode,
            page.width,
            page.height,
            page.lines.len()
        );
        Ok(page)
    }
}

/// Parse tesseract's `tsv` output into lines of words.
///
/// Only level-5 (word) rows with non-blank text are kept. Columns:
/// `level page_num block_num par_num line_num word_num left top width height conf text`.
pub fn parse_tsv(tsv: &str) -> Result<OcrPage, DocumentError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .has_headers(true)
        .from_reader(tsv.as_bytes());

    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_key: Option<(u32, u32, u32, u32)> = None;

    for row in reader.records() {
        let row = row.map_err(|e| DocumentError::OcrFailed {
            detail: format!("malformed TSV: {e}"),
        })?;
        if row.len() < 11 {
            continue;
        }

        let num = |i: usize| row.get(i).and_then(|v| v.trim().parse::<i64>().ok());
        if num(0) != Some(5) {
            continue;
        }
        let text = row.get(11).unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let (Some(page), Some(block), Some(par), Some(line)) = (num(1), num(2), num(3), num(4))
        else {
            warn!("Skipping TSV row with unparsable keys: {:?}", row);
            continue;
        };
        let coord = |i: usize| num(i).unwrap_or(0).max(0) as u32;
        let word = OcrWord {
            text: text.to_string(),
            bbox: Rect::new(coord(6), coord(7), coord(8), coord(9)),
            confidence: row
                .get(10)
                .and_then(|v| v.trim().parse::<f32>().ok())
                .unwrap_or(0.0)
                .max(0.0),
        };

        let key = (page as u32, block as u32, par as u32, line as u32);
        if current_key != Some(key) {
            lines.push(OcrLine::default());
            current_key = Some(key);
        }
        if let Some(last) = lines.last_mut() {
            last.words.push(word);
        }
    }

    Ok(OcrPage {
        width: 0,
        height: 0,
        lines,
    })
}

/// True when `command --version` runs successfully.
pub fn tesseract_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t2480\t3508\t-1\t
2\t1\t1\t0\t0\t0\t200\t150\t900\t60\t-1\t
4\t1\t1\t1\t1\t0\t200\t150\t900\t60\t-1\t
5\t1\t1\t1\t1\t1\t200\t150\t180\t60\t96.5\tFOLIO
5\t1\t1\t1\t1\t2\t400\t150\t60\t60\t91.0\tN°
5\t1\t1\t1\t1\t3\t480\t150\t260\t60\t95.2\t0012345
5\t1\t1\t1\t1\t4\t760\t150\t10\t60\t-1\t
5\t1\t1\t1\t2\t1\t200\t260\t220\t60\t93.0\tNombre:
5\t1\t1\t1\t2\t2\t440\t260\t180\t60\t90.1\t\"JUAN
5\t1\t2\t1\t1\t1\t200\t900\t200\t60\t88.0\tAPROBADO
";

    #[test]
    fn parses_words_into_lines() {
        let page = parse_tsv(SAMPLE_TSV).unwrap();
        assert_eq!(page.lines.len(), 3);
        assert_eq!(page.lines[0].text(), "FOLIO N° 0012345");
        assert_eq!(page.lines[1].text(), "Nombre: \"JUAN");
        assert_eq!(page.lines[2].text(), "APROBADO");
        assert_eq!(page.lines[0].words[2].bbox, Rect::new(480, 150, 260, 60));
        assert!((page.lines[0].words[0].confidence - 96.5).abs() < f32::EPSILON);
        assert_eq!(page.text(), "FOLIO N° 0012345\nNombre: \"JUAN\nAPROBADO");
    }

    #[test]
    fn header_only_tsv_is_empty_page() {
        let page = parse_tsv("level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n").unwrap();
        assert!(page.is_empty());
        assert_eq!(page.text(), "");
    }

    #[test]
    fn from_text_lays_out_grid() {
        let page = OcrPage::from_text(800, 600, "AB CDE\n\nX");
        assert_eq!(page.lines.len(), 3);
        assert_eq!(page.lines[0].words[0].bbox, Rect::new(50, 40, 40, 30));
        assert_eq!(page.lines[0].words[1].bbox, Rect::new(110, 40, 60, 30));
        assert!(page.lines[1].words.is_empty());
        assert_eq!(page.lines[2].words[0].bbox.y, 140);
        assert_eq!(page.text(), "AB CDE\n\nX");
    }

    #[test]
    fn missing_binary_is_ocr_error() {
        let engine = TesseractCli::new("definitely-not-a-tesseract-binary", "spa", 300);
        let img = DynamicImage::new_luma8(10, 10);
        match engine.recognize(&img, OcrMode::FullPage) {
            Err(DocumentError::OcrFailed { detail }) => assert!(detail.contains("failed to run")),
            other => panic!("expected OcrFailed, got {other:?}"),
        }
        assert!(!tesseract_available("definitely-not-a-tesseract-binary"));
    }
}
