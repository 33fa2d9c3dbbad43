//! Cleanup: deterministic normalisation of raw OCR text.
//!
//! Tesseract output carries artefacts that trip the field regexes: CRLF
//! line endings from some builds, zero-width characters from the PDF's
//! text layer bleeding through, runs of spaces where the scan had tab stops,
//! and letters in place of digits inside numbers. Each rule below is a pure
//! `&str → String` pass and is tested on its own.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the per-line rules see `\n` only;
//! invisible characters go before whitespace collapsing so a zero-width
//! space between two blanks does not keep them apart.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all text cleanup rules to raw OCR output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Collapse runs of horizontal whitespace to one space
/// 4. Trim whitespace at both ends of each line
/// 5. Collapse 2+ consecutive blank lines down to 1
/// 6. Trim leading and trailing blank lines
pub fn clean_ocr_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = collapse_spaces(&s);
    let s = trim_lines(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{000C}',
        ],
        "",
    )
}

// ── Rule 3: Collapse horizontal whitespace ───────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

fn collapse_spaces(input: &str) -> String {
    RE_SPACES.replace_all(input, " ").to_string()
}

// ── Rule 4: Trim each line ───────────────────────────────────────────────────

fn trim_lines(input: &str) -> String {
    input.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

// ── Rule 5: Collapse blank lines ─────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Numeric tokens ───────────────────────────────────────────────────────────

/// Replace letters Tesseract commonly confuses with digits.
///
/// Only call this on tokens already known to be numeric (folio values, RUT
/// bodies); applied to words it would turn `SOLO` into `5010`.
pub fn normalise_digits(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            'O' | 'o' | 'Q' | 'D' => '0',
            'I' | 'l' | '|' | 'i' | '!' => '1',
            'Z' | 'z' => '2',
            'S' | 's' => '5',
            'G' => '6',
            'B' => '8',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cleanup_pipeline() {
        let raw = "\u{FEFF}FOLIO   N°\t123\r\n\r\n\r\n\r\n  Nombre:  JUAN\u{200B} PEREZ  \r\n";
        assert_eq!(clean_ocr_text(raw), "FOLIO N° 123\n\nNombre: JUAN PEREZ");
    }

    #[test]
    fn crlf_normalised() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(remove_invisible_chars("RU\u{00AD}T\u{200D}"), "RUT");
    }

    #[test]
    fn blank_lines_collapsed() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(clean_ocr_text(""), "");
        assert_eq!(clean_ocr_text(" \r\n \n"), "");
    }

    #[test]
    fn digit_confusions() {
        assert_eq!(normalise_digits("12O45"), "12045");
        assert_eq!(normalise_digits("l2.345.678"), "12.345.678");
        assert_eq!(normalise_digits("S5B"), "558");
        assert_eq!(normalise_digits("2024"), "2024");
    }
}
