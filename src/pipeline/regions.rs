//! Folio anchor discovery and the page regions derived from it.
//!
//! The folio is the one token every scanned form carries in a predictable
//! spot, so it serves as the coordinate origin for the rest of the layout:
//! the date sits in a band around it, the holder's name and RUT in the block
//! just below it. Both regions are expressed as fractions of the page height
//! (see [`RegionLayout`]) so they scale with DPI.

use crate::config::RegionLayout;
use crate::pipeline::cleanup::normalise_digits;
use crate::pipeline::ocr::{OcrLine, OcrPage};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }

    /// Intersect with a `width × height` page anchored at the origin.
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Rect::new(x, y, self.right().min(width) - x, self.bottom().min(height) - y)
    }
}

/// The folio value and where it sits on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolioAnchor {
    /// Digits only, e.g. `0012345`.
    pub folio: String,
    /// Union of the label and value word boxes.
    pub bbox: Rect,
}

/// The two rectangles that receive a targeted OCR pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRegions {
    /// Band around the anchor; searched for the date.
    pub header: Rect,
    /// Block below the anchor; searched for name and RUT.
    pub identity: Rect,
}

static RE_FOLIO_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^F[O0][L1I][I1L][O0]\W*(.*)$").unwrap());

static RE_NUMBER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:N|No|Nro|Num)?[°º.#:]*$").unwrap());

static RE_MARKED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^N(?:[°º]|o\.)[:#]?(\d[\d.]{3,})$").unwrap());

static RE_MARKER_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^N(?:[°º]|o\.)[:#]?$").unwrap());

static RE_PLAIN_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d[\d.]{3,})$").unwrap());

/// Locate the folio on the page.
///
/// Tried in order:
/// 1. a `FOLIO` label (OCR-tolerant) followed on the same line by a number,
///    optionally after a `N°` / `#` / `:` marker, or with the digits glued to
///    the label (`Folio:123456`);
/// 2. a `N°` / `Nº` marker with at least four digits anywhere on the page,
///    glued (`N°4521`) or as the next word (`N° 4521`).
pub fn locate_folio(page: &OcrPage) -> Option<FolioAnchor> {
    for line in &page.lines {
        let words = &line.words;
        for (i, word) in words.iter().enumerate() {
            let Some(caps) = RE_FOLIO_LABEL.captures(word.text.trim()) else {
                continue;
            };

            let glued = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if let Some(folio) = folio_digits(glued) {
                return Some(FolioAnchor {
                    folio,
                    bbox: word.bbox,
                });
            }

            for next in &words[i + 1..] {
                let text = next.text.trim();
                if let Some(folio) = folio_digits(text) {
                    return Some(FolioAnchor {
                        folio,
                        bbox: word.bbox.union(&next.bbox),
                    });
                }
                if !RE_NUMBER_MARKER.is_match(text) {
                    break;
                }
            }
        }
    }

    page.lines.iter().find_map(marked_number)
}

fn marked_number(line: &OcrLine) -> Option<FolioAnchor> {
    let words = &line.words;
    for (i, word) in words.iter().enumerate() {
        let text = word.text.trim();
        if let Some(folio) = RE_MARKED_NUMBER
            .captures(text)
            .and_then(|caps| marked_digits(&caps[1]))
        {
            return Some(FolioAnchor {
                folio,
                bbox: word.bbox,
            });
        }

        if !RE_MARKER_ONLY.is_match(text) {
            continue;
        }
        let Some(next) = words.get(i + 1) else {
            continue;
        };
        if let Some(folio) = RE_PLAIN_NUMBER
            .captures(next.text.trim())
            .and_then(|caps| marked_digits(&caps[1]))
        {
            return Some(FolioAnchor {
                folio,
                bbox: word.bbox.union(&next.bbox),
            });
        }
    }
    None
}

/// At least four digits, separators dropped.
fn marked_digits(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    (digits.len() >= 4).then_some(digits)
}

/// Digits of a folio token, after fixing OCR letter/digit confusions.
///
/// The token must be mostly numeric to begin with; a word like `SOLO` would
/// otherwise normalise to `5010`.
fn folio_digits(token: &str) -> Option<String> {
    let token = token.trim_matches(|c: char| !c.is_alphanumeric());
    let raw_digits = token.chars().filter(char::is_ascii_digit).count();
    if raw_digits == 0 || raw_digits * 2 < token.chars().filter(|c| c.is_alphanumeric()).count() {
        return None;
    }
    let digits: String = normalise_digits(token)
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    (digits.len() >= 3).then_some(digits)
}

/// Derive the header and identity rectangles from the anchor.
pub fn derive_regions(
    anchor: &FolioAnchor,
    page_width: u32,
    page_height: u32,
    layout: &RegionLayout,
) -> DocumentRegions {
    let frac = |f: f32| (f * page_height as f32).round() as u32;

    let header_top = anchor.bbox.y.saturating_sub(frac(layout.header_above));
    let header_bottom = anchor.bbox.bottom().saturating_add(frac(layout.header_below));
    let header = Rect::new(0, header_top, page_width, header_bottom.saturating_sub(header_top))
        .clamp_to(page_width, page_height);

    let identity_top = anchor.bbox.bottom();
    let identity = Rect::new(0, identity_top, page_width, frac(layout.identity_height))
        .clamp_to(page_width, page_height);

    DocumentRegions { header, identity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::OcrPage;

    #[test]
    fn rect_union_and_clamp() {
        let a = Rect::new(10, 10, 20, 10);
        let b = Rect::new(40, 5, 10, 30);
        assert_eq!(a.union(&b), Rect::new(10, 5, 40, 30));

        let r = Rect::new(90, 90, 50, 50).clamp_to(100, 120);
        assert_eq!(r, Rect::new(90, 90, 10, 30));
        assert!(Rect::new(200, 0, 10, 10).clamp_to(100, 100).is_empty());
    }

    #[test]
    fn labelled_folio_on_same_line() {
        let page = OcrPage::from_text(1000, 1400, "CERTIFICADO\nFOLIO N° 0012345\nNombre: JUAN PEREZ");
        let anchor = locate_folio(&page).expect("anchor");
        assert_eq!(anchor.folio, "0012345");
        // Label and value both sit on line 2.
        let line = &page.lines[1];
        assert_eq!(anchor.bbox, line.words[0].bbox.union(&line.words[2].bbox));
    }

    #[test]
    fn glued_folio_and_ocr_confusions() {
        let page = OcrPage::from_text(1000, 1400, "F0LIO:98765");
        assert_eq!(locate_folio(&page).unwrap().folio, "98765");

        let page = OcrPage::from_text(1000, 1400, "Folio 12O45");
        assert_eq!(locate_folio(&page).unwrap().folio, "12045");
    }

    #[test]
    fn label_followed_by_words_is_not_a_folio() {
        let page = OcrPage::from_text(1000, 1400, "Folio del documento SOLO\nsin numero");
        assert_eq!(locate_folio(&page), None);
    }

    #[test]
    fn number_marker_fallback() {
        let page = OcrPage::from_text(1000, 1400, "RESOLUCION EXENTA\nN°4521 del registro");
        let anchor = locate_folio(&page).expect("fallback anchor");
        assert_eq!(anchor.folio, "4521");
    }

    #[test]
    fn number_marker_fallback_spaced() {
        let page = OcrPage::from_text(1000, 1400, "RESOLUCION EXENTA\nN° 4521 del registro");
        let anchor = locate_folio(&page).expect("spaced fallback anchor");
        assert_eq!(anchor.folio, "4521");
        let line = &page.lines[1];
        assert_eq!(anchor.bbox, line.words[0].bbox.union(&line.words[1].bbox));

        let page = OcrPage::from_text(1000, 1400, "Registro Nº: 12.345");
        assert_eq!(locate_folio(&page).map(|a| a.folio).as_deref(), Some("12345"));
    }

    #[test]
    fn no_folio_anywhere() {
        let page = OcrPage::from_text(1000, 1400, "Nada que ver aqui\nN° 12");
        assert_eq!(locate_folio(&page), None);
    }

    #[test]
    fn regions_follow_anchor_and_clamp() {
        let anchor = FolioAnchor {
            folio: "1".into(),
            bbox: Rect::new(600, 100, 200, 40),
        };
        let layout = RegionLayout::default();
        let regions = derive_regions(&anchor, 1000, 1000, &layout);

        // 0.06 * 1000 above, 0.08 * 1000 below.
        assert_eq!(regions.header, Rect::new(0, 40, 1000, 180));
        // 0.30 * 1000 from the anchor's bottom edge.
        assert_eq!(regions.identity, Rect::new(0, 140, 1000, 300));

        let low = FolioAnchor {
            folio: "1".into(),
            bbox: Rect::new(0, 950, 100, 30),
        };
        let regions = derive_regions(&low, 1000, 1000, &layout);
        assert_eq!(regions.identity, Rect::new(0, 980, 1000, 20));
        assert_eq!(regions.header.bottom(), 1000);
    }
}
