//! PDF rasterisation: render every page of an in-memory PDF via pdfium.
//!
//! pdfium keeps thread-local state and is CPU-bound, so all work happens
//! inside `spawn_blocking`. Pages are scaled by `dpi / 72` and then capped
//! at `max_rendered_pixels` on both edges, which keeps a scanned A3 exam
//! sheet from turning into a 6000 px bitmap.

use crate::error::SheetError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rasterise all pages of a PDF held in memory.
pub async fn render_pdf(
    name: &str,
    bytes: Vec<u8>,
    dpi: u32,
    max_pixels: u32,
    password: Option<String>,
) -> Result<Vec<DynamicImage>, SheetError> {
    let name = name.to_string();
    tokio::task::spawn_blocking(move || {
        render_pdf_blocking(&name, &bytes, dpi, max_pixels, password.as_deref())
    })
    .await
    .map_err(|e| SheetError::Internal(format!("Render task panicked: {}", e)))?
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` (file or directory), then the working
/// directory, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, SheetError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let path = PathBuf::from(p);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path(
            Path::new("./"),
        ))
        .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| SheetError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn render_pdf_blocking(
    name: &str,
    bytes: &[u8],
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
) -> Result<Vec<DynamicImage>, SheetError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| map_load_error(name, password.is_some(), e))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("{}: {} pages", name, total);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            SheetError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    if images.is_empty() {
        return Err(SheetError::CorruptPdf {
            name: name.to_string(),
            detail: "document has no pages".into(),
        });
    }

    Ok(images)
}

fn map_load_error(name: &str, had_password: bool, e: PdfiumError) -> SheetError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            SheetError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            SheetError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        SheetError::CorruptPdf {
            name: name.to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_classified() {
        let e = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError);
        assert!(matches!(
            map_load_error("a.pdf", false, e),
            SheetError::PasswordRequired { .. }
        ));

        let e = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError);
        assert!(matches!(
            map_load_error("a.pdf", true, e),
            SheetError::WrongPassword { .. }
        ));
    }

    #[test]
    fn other_load_errors_are_corrupt() {
        let e = PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError);
        match map_load_error("broken.pdf", false, e) {
            SheetError::CorruptPdf { name, .. } => assert_eq!(name, "broken.pdf"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
