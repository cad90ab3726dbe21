//! Image encoding: inputs become base64 `ImageData` attachments for the
//! vision model, and the footer logo becomes PNG bytes for the typesetter.
//!
//! Rasterised PDF pages are re-encoded as PNG: lossless output keeps small
//! print legible. Image uploads are passed through untouched with their
//! sniffed MIME type; re-encoding a phone-camera JPEG would only grow it.

use super::input::{FileKind, InputFile};
use super::render::render_pdf;
use crate::config::SheetConfig;
use crate::error::SheetError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as a base64 PNG.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded page → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Wrap an uploaded image as-is.
pub fn encode_raw(bytes: &[u8], kind: FileKind) -> ImageData {
    ImageData::new(STANDARD.encode(bytes), kind.mime()).with_detail("high")
}

/// Turn a validated input file into model attachments: one per PDF page,
/// or a single attachment for an image.
pub async fn encode_input(
    input: &InputFile,
    config: &SheetConfig,
) -> Result<Vec<ImageData>, SheetError> {
    if input.kind.is_image() {
        return Ok(vec![encode_raw(&input.bytes, input.kind)]);
    }

    let pages = render_pdf(
        &input.name,
        input.bytes.clone(),
        config.dpi,
        config.max_rendered_pixels,
        config.password.clone(),
    )
    .await?;

    pages
        .iter()
        .enumerate()
        .map(|(idx, page)| {
            encode_page(page).map_err(|e| SheetError::RasterisationFailed {
                page: idx + 1,
                detail: e.to_string(),
            })
        })
        .collect()
}

/// Decode any supported logo image and re-encode it as PNG.
pub fn normalize_logo(bytes: &[u8]) -> Result<Vec<u8>, SheetError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| SheetError::InvalidConfig(format!("Logo image could not be decoded: {e}")))?;
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| SheetError::Internal(format!("Logo re-encoding failed: {e}")))?;
    Ok(buf)
}
