//! PDF rasterisation: render every page of an upload to a `DynamicImage`.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto a thread
//! designed for blocking operations so the web handlers' executor threads
//! never stall during CPU-heavy rendering.
//!
//! ## Why render the whole document eagerly?
//!
//! Rasterisation happens exactly once per upload and the images are
//! memoized for the session; paging through the document afterwards is
//! pure index mutation. Documents in interactive use are small enough that
//! eager conversion beats the complexity of per-page lazy rendering.

use crate::config::StudioConfig;
use crate::error::RasterizeError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Rasterise every page of the PDF bytes into images.
///
/// Runs inside `spawn_blocking` since pdfium operations are CPU-bound.
/// The `%PDF` magic is checked before pdfium ever sees the bytes so a
/// mis-uploaded file produces a meaningful error rather than a parser
/// crash deep inside the C++ library.
pub async fn rasterize_pages(
    bytes: Vec<u8>,
    config: &StudioConfig,
) -> Result<Vec<DynamicImage>, RasterizeError> {
    check_magic(&bytes)?;

    let dpi = config.dpi;
    let max_pixels = config.max_rendered_pixels;

    tokio::task::spawn_blocking(move || rasterize_blocking(&bytes, dpi, max_pixels))
        .await
        .map_err(|e| RasterizeError::Internal(format!("render task panicked: {e}")))?
}

/// Reject anything that does not start with `%PDF`.
fn check_magic(bytes: &[u8]) -> Result<(), RasterizeError> {
    if bytes.len() < 8 {
        return Err(RasterizeError::TooShort { len: bytes.len() });
    }
    if &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(RasterizeError::NotAPdf { magic });
    }
    Ok(())
}

/// Blocking implementation of whole-document rendering.
fn rasterize_blocking(
    bytes: &[u8],
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, RasterizeError> {
    let pdfium = Pdfium::default();

    let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
        let err_str = format!("{e:?}");
        if err_str.contains("Password") || err_str.contains("password") {
            RasterizeError::Encrypted
        } else {
            RasterizeError::Corrupt { detail: err_str }
        }
    })?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    if page_count == 0 {
        return Err(RasterizeError::EmptyDocument);
    }
    info!("PDF loaded: {} pages", page_count);

    let scale = dpi as f32 / 72.0;
    let mut images = Vec::with_capacity(page_count);

    for idx in 0..page_count {
        let page = pages
            .get(idx as u16)
            .map_err(|e| RasterizeError::PageFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        // Scale by DPI, then cap the longest edge so an oversized page can
        // never exhaust memory.
        let target_width = ((page.width().value * scale).round() as i32).min(max_pixels as i32);
        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width.max(1))
            .set_maximum_height(max_pixels as i32);

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| RasterizeError::PageFailed {
                    page: idx + 1,
                    detail: format!("{e:?}"),
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

    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_check_rejects_non_pdf() {
        let err = check_magic(b"PK\x03\x04 not a pdf").unwrap_err();
        assert!(matches!(err, RasterizeError::NotAPdf { .. }));
    }

    #[test]
    fn magic_check_rejects_short_input() {
        let err = check_magic(b"%PD").unwrap_err();
        assert!(matches!(err, RasterizeError::TooShort { len: 3 }));
    }

    #[test]
    fn magic_check_accepts_pdf_header() {
        assert!(check_magic(b"%PDF-1.7\n").is_ok());
    }
}
