//! PDF input for pdf2ppt.
//!
//! [`PdfDocument`] parses a file with lopdf and exposes each page's
//! operators, text layer and fonts as a `DocumentSource`. With the `pdfium`
//! feature, [`PdfiumRasterizer`] renders pages to pixels.

pub mod cmap;
pub mod content;
pub mod document;
pub mod fonts;
mod objects;
#[cfg(feature = "pdfium")]
pub mod render;

pub use content::{interpret, PageContent};
pub use document::PdfDocument;
pub use fonts::PdfFont;
#[cfg(feature = "pdfium")]
pub use render::{create_pdfium, PdfiumRasterizer};
