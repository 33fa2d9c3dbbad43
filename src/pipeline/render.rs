//! PDF rasterisation: render page 1 to a `DynamicImage` via pdfium.
//!
//! Only the first page of each document carries the fields we extract, so
//! the renderer never touches the rest of the file.
//!
//! Rendering goes through the [`PageRasterizer`] trait so the extraction
//! pipeline can be driven by a fake in tests without a pdfium library.
//!
//! pdfium is bound afresh on every render. The caller runs each document
//! inside `spawn_blocking`, and a per-call binding keeps the rasterizer free
//! of any handle that would have to cross threads.

use crate::error::{DocumentError, ExtractError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Renders the first page of a PDF.
pub trait PageRasterizer: Send + Sync {
    fn render_first_page(
        &self,
        pdf_path: &Path,
        dpi: u32,
        password: Option<&str>,
    ) -> Result<DynamicImage, DocumentError>;
}

/// pdfium-backed [`PageRasterizer`].
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    lib_path: Option<PathBuf>,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    /// Check that pdfium can be bound (see [`bind_pdfium`]) and build a rasterizer.
    ///
    /// Failing here lets a batch abort before it touches any document.
    pub fn new(lib_path: Option<&Path>, max_pixels: u32) -> Result<Self, ExtractError> {
        bind_pdfium(lib_path)?;
        Ok(Self {
            lib_path: lib_path.map(Path::to_path_buf),
            max_pixels,
        })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render_first_page(
        &self,
        pdf_path: &Path,
        dpi: u32,
        password: Option<&str>,
    ) -> Result<DynamicImage, DocumentError> {
        let pdfium = bind_pdfium(self.lib_path.as_deref()).map_err(|e| {
            DocumentError::RenderFailed {
                path: pdf_path.to_path_buf(),
                detail: e.to_string(),
            }
        })?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, password)
            .map_err(|e| classify_load_error(pdf_path, password, e))?;

        let pages = document.pages();
        if pages.len() == 0 {
            return Err(DocumentError::RenderFailed {
                path: pdf_path.to_path_buf(),
                detail: "document has no pages".into(),
            });
        }

        let page = pages.get(0).map_err(|e| DocumentError::RenderFailed {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| DocumentError::RenderFailed {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page 1 of {} → {}x{} px",
            pdf_path.display(),
            image.width(),
            image.height()
        );

        Ok(image)
    }
}

fn classify_load_error(pdf_path: &Path, password: Option<&str>, e: PdfiumError) -> DocumentError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            DocumentError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            DocumentError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        DocumentError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}

/// Bind to a pdfium shared library.
///
/// Lookup order, first hit wins:
/// 1. `lib_path` argument (file, or directory containing the platform library)
/// 2. `PDFIUM_LIB_PATH` environment variable (same rules)
/// 3. the directory of the running executable
/// 4. the current working directory
/// 5. the system library search path
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, ExtractError> {
    let env_path = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    let explicit = lib_path.map(Path::to_path_buf).or(env_path);

    if let Some(path) = explicit {
        let file = library_file(&path);
        debug!("Binding pdfium from {}", file.display());
        return Pdfium::bind_to_library(&file)
            .map(Pdfium::new)
            .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{}: {:?}", file.display(), e)));
    }

    let mut candidates = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir);
    }
    candidates.push(PathBuf::from("./"));

    for dir in candidates {
        let file = Pdfium::pdfium_platform_library_name_at_path(&dir);
        if file.exists() {
            if let Ok(bindings) = Pdfium::bind_to_library(&file) {
                debug!("Bound pdfium from {}", file.display());
                return Ok(Pdfium::new(bindings));
            }
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))
}

/// Resolve a user-supplied pdfium location to the library file itself.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_file_keeps_explicit_file() {
        let p = Path::new("/opt/pdfium/lib/libpdfium.so");
        assert_eq!(library_file(p), p.to_path_buf());
    }

    #[test]
    fn library_file_resolves_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let resolved = library_file(tmp.path());
        assert_eq!(resolved.parent(), Some(tmp.path()));
        assert!(resolved
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("pdfium"));
    }
}
