//! The document store: one uploaded PDF, its rendered pages, and the
//! navigation cursor over them.
//!
//! A [`Document`] is immutable once built — rasterisation happens exactly
//! once at upload time and the page images are held for the rest of the
//! session. All movement through the document goes through [`Navigator`],
//! which owns nothing but a clamped index.

use crate::config::StudioConfig;
use crate::error::RasterizeError;
use crate::render;
use image::DynamicImage;

/// An uploaded PDF with its eagerly rendered page images.
#[derive(Debug)]
pub struct Document {
    file_name: String,
    raw_bytes: Vec<u8>,
    pages: Vec<DynamicImage>,
}

impl Document {
    /// Rasterise uploaded bytes into a document.
    ///
    /// Fails with [`RasterizeError`] on corrupt, encrypted, or empty input;
    /// on failure nothing is retained from the upload.
    pub async fn rasterize(
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        config: &StudioConfig,
    ) -> Result<Self, RasterizeError> {
        let pages = render::rasterize_pages(bytes.clone(), config).await?;
        Ok(Self {
            file_name: file_name.into(),
            raw_bytes: bytes,
            pages,
        })
    }

    /// Build a document from already-rendered page images.
    ///
    /// Useful for callers that rasterise elsewhere (and for tests, which
    /// should not depend on a pdfium library being installed).
    pub fn from_pages(file_name: impl Into<String>, pages: Vec<DynamicImage>) -> Self {
        Self {
            file_name: file_name.into(),
            raw_bytes: Vec::new(),
            pages,
        }
    }

    /// Original file name of the upload.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Raw bytes of the upload (empty for [`Document::from_pages`]).
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// Number of rendered pages. Always ≥ 1 for a rasterised document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The rendered image for a page, if the index is in range.
    pub fn page(&self, index: usize) -> Option<&DynamicImage> {
        self.pages.get(index)
    }
}

/// Cursor over a document's pages.
///
/// The index is always valid for the page count it was created with:
/// movement is clamped to `[0, page_count - 1]`, boundary moves are
/// silent no-ops — no wraparound, no error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    index: usize,
    page_count: usize,
}

impl Navigator {
    /// Cursor for a document with `page_count` pages, starting at page 0.
    pub fn new(page_count: usize) -> Self {
        Self {
            index: 0,
            page_count,
        }
    }

    /// Current zero-based page index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total pages this cursor ranges over.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Advance one page; no-op on the last page.
    pub fn next(&mut self) {
        if self.index + 1 < self.page_count {
            self.index += 1;
        }
    }

    /// Go back one page; no-op on the first page.
    pub fn previous(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Jump directly to `index`, clamped into range.
    pub fn select(&mut self, index: usize) {
        self.index = index.min(self.page_count.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn blank_page() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255])))
    }

    fn three_page_doc() -> Document {
        Document::from_pages("three.pdf", vec![blank_page(), blank_page(), blank_page()])
    }

    #[test]
    fn navigator_starts_at_zero() {
        let doc = three_page_doc();
        let nav = Navigator::new(doc.page_count());
        assert_eq!(nav.index(), 0);
        assert_eq!(nav.page_count(), 3);
    }

    #[test]
    fn next_clamps_at_last_page() {
        let mut nav = Navigator::new(3);
        nav.next();
        nav.next();
        assert_eq!(nav.index(), 2);
        nav.next();
        assert_eq!(nav.index(), 2, "next() on the last page is a no-op");
    }

    #[test]
    fn previous_clamps_at_first_page() {
        let mut nav = Navigator::new(3);
        nav.previous();
        assert_eq!(nav.index(), 0, "previous() on page 0 is a no-op");
        nav.next();
        nav.previous();
        assert_eq!(nav.index(), 0);
    }

    #[test]
    fn select_clamps_out_of_range() {
        let mut nav = Navigator::new(3);
        nav.select(17);
        assert_eq!(nav.index(), 2);
        nav.select(1);
        assert_eq!(nav.index(), 1);
    }

    #[test]
    fn single_page_document_never_moves() {
        let mut nav = Navigator::new(1);
        nav.next();
        nav.previous();
        nav.select(5);
        assert_eq!(nav.index(), 0);
    }

    #[test]
    fn page_lookup_respects_bounds() {
        let doc = three_page_doc();
        assert!(doc.page(2).is_some());
        assert!(doc.page(3).is_none());
    }
}
