//! Configuration types for batch field extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct holds every knob so a run
//! can be logged and two runs can be diffed.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default name of the aggregated CSV written by the CLI.
pub const DEFAULT_OUTPUT_FILE: &str = "resultados_pdfs.csv";

/// Configuration for a batch extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_folio_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .language("spa")
///     .build()
///     .unwrap();
/// assert_eq!(config.language, "spa");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI for page 1. Range: 72–600. Default: 300.
    ///
    /// Tesseract is tuned for ~300 DPI input; below 200 small print such as
    /// the check digit of a RUT starts to drop out.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 6000.
    ///
    /// Caps memory for oversized pages independently of DPI.
    pub max_rendered_pixels: u32,

    /// Tesseract language code(s), e.g. `spa` or `spa+eng`. Default: `spa`.
    pub language: String,

    /// Tesseract executable name or path. Default: `tesseract`.
    pub tesseract_cmd: String,

    /// Page segmentation mode for the full-page pass. Default: 3 (automatic).
    pub full_page_psm: u8,

    /// Page segmentation mode for the region passes. Default: 6 (single block).
    pub region_psm: u8,

    /// Geometry of the sub-regions derived from the folio anchor.
    pub layout: RegionLayout,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Explicit pdfium library file or directory. Falls back to `PDFIUM_LIB_PATH`.
    pub pdfium_lib_path: Option<PathBuf>,

    /// When set, keep `<dir>/<stem>/<stem>.png` and `<stem>.csv` per document.
    pub artifacts_dir: Option<PathBuf>,

    /// Receives per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 6000,
            language: "spa".to_string(),
            tesseract_cmd: "tesseract".to_string(),
            full_page_psm: 3,
            region_psm: 6,
            layout: RegionLayout::default(),
            password: None,
            pdfium_lib_path: None,
            artifacts_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("language", &self.language)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("full_page_psm", &self.full_page_psm)
            .field("region_psm", &self.region_psm)
            .field("layout", &self.layout)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("artifacts_dir", &self.artifacts_dir)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn full_page_psm(mut self, psm: u8) -> Self {
        self.config.full_page_psm = psm.min(13);
        self
    }

    pub fn region_psm(mut self, psm: u8) -> Self {
        self.config.region_psm = psm.min(13);
        self
    }

    pub fn layout(mut self, layout: RegionLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifacts_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.language.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.tesseract_cmd.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "Tesseract command must not be empty".into(),
            ));
        }
        c.layout.validate()?;
        Ok(self.config)
    }
}

/// Proportions of the two sub-regions derived from the folio anchor.
///
/// Every value is a fraction of the rendered page height, so the layout
/// holds at any DPI.
///
/// ```text
///            ┌──────────────────────────────┐
///            │   header_above               │ ┐
///            │   ┌──────────┐               │ │ header region (fecha)
///            │   │ FOLIO 123│ ← anchor      │ │
///            │   └──────────┘               │ │
///            │   header_below               │ ┘
///            │   identity_height            │ ┐ identity region
///            │                              │ ┘ (nombre, rut)
///            └──────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionLayout {
    /// Extent of the header region above the anchor. Default: 0.06.
    pub header_above: f32,
    /// Extent of the header region below the anchor. Default: 0.08.
    pub header_below: f32,
    /// Height of the identity region starting at the anchor's bottom edge. Default: 0.30.
    pub identity_height: f32,
}

impl Default for RegionLayout {
    fn default() -> Self {
        Self {
            header_above: 0.06,
            header_below: 0.08,
            identity_height: 0.30,
        }
    }
}

impl RegionLayout {
    fn validate(&self) -> Result<(), ExtractError> {
        for (name, v) in [
            ("header_above", self.header_above),
            ("header_below", self.header_below),
            ("identity_height", self.identity_height),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ExtractError::InvalidConfig(format!(
                    "{name} must be a page fraction in 0.0–1.0, got {v}"
                )));
            }
        }
        if self.identity_height == 0.0 {
            return Err(ExtractError::InvalidConfig(
                "identity_height must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_dpi() {
        let c = ExtractionConfig::builder().dpi(10_000).build().unwrap();
        assert_eq!(c.dpi, 600);
        let c = ExtractionConfig::builder().dpi(1).build().unwrap();
        assert_eq!(c.dpi, 72);
    }

    #[test]
    fn empty_language_rejected() {
        let err = ExtractionConfig::builder().language("  ").build().unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)));
    }

    #[test]
    fn layout_out_of_range_rejected() {
        let layout = RegionLayout {
            identity_height: 1.5,
            ..RegionLayout::default()
        };
        let err = ExtractionConfig::builder().layout(layout).build().unwrap_err();
        assert!(err.to_string().contains("identity_height"), "got: {err}");
    }

    #[test]
    fn debug_redacts_password() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }
}
