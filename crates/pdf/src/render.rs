//! Page rendering through libpdfium.

use image::DynamicImage;
use pdf2ppt_core::{Error, PageRaster, PageRasterizer, Result};
use pdfium_render::prelude::*;
use std::path::Path;

/// Create a Pdfium instance (dynamically linked).
///
/// Searches for libpdfium in:
/// 1. Current directory
/// 2. vendor/pdfium/lib/
/// 3. System library paths
pub fn create_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::RendererUnavailable(format!("failed to load PDFium library: {:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Renders pages of one PDF file with pdfium.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
    bytes: Vec<u8>,
}

impl PdfiumRasterizer {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        Ok(Self {
            pdfium: create_pdfium()?,
            bytes,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(std::fs::read(path.as_ref())?)
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render_page(&self, index: usize, scale: f64) -> Result<PageRaster> {
        let render_error = |what: &str, e: PdfiumError| {
            Error::RenderError(format!("page {}: {}: {:?}", index + 1, what, e))
        };

        // Loading per call keeps the rasterizer free of document lifetimes.
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(&self.bytes, None)
            .map_err(|e| render_error("failed to open document", e))?;
        let page_index = u16::try_from(index)
            .map_err(|_| Error::RenderError(format!("page index {} out of range", index)))?;
        let page = document
            .pages()
            .get(page_index)
            .map_err(|e| render_error("failed to load page", e))?;

        let page_width = page.width().value as f64;
        let width = (page_width * scale).round().max(1.0) as i32;
        let height = (page.height().value as f64 * scale).round().max(1.0) as i32;
        let config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_error("failed to render page", e))?;
        let full_image: DynamicImage = bitmap.as_image();
        let pixels = full_image.to_rgba8();

        // Pixel dimensions are rounded; crops use the scale actually achieved.
        let achieved = pixels.width() as f64 / page_width;
        let scale = if achieved.is_finite() && achieved > 0.0 {
            achieved
        } else {
            scale
        };
        log::debug!(
            "Rendered page {} at {}x{} px ({:.3} px/pt)",
            index + 1,
            pixels.width(),
            pixels.height(),
            scale
        );

        Ok(PageRaster::new(pixels, scale))
    }
}
