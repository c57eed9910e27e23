//! Collaborator traits: where pages come from and how they are rendered.

use crate::error::Result;
use crate::fonts::FontInfo;
use crate::images::PageRaster;
use crate::operators::OperatorList;
use crate::text::TextItem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Page dimensions in points at scale 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A paginated document that exposes the low-level content of each page.
///
/// Page indices are zero-based.
pub trait DocumentSource {
    fn page_count(&self) -> usize;

    fn page_size(&self, index: usize) -> Result<PageSize>;

    /// The page's drawing operations in paint order.
    fn operator_list(&self, index: usize) -> Result<OperatorList>;

    /// The page's text layer in document order.
    fn text_content(&self, index: usize) -> Result<Vec<TextItem>>;

    /// Font resources of the page, keyed by the names used in its content.
    fn page_fonts(&self, index: usize) -> Result<HashMap<String, FontInfo>>;
}

/// Renders pages to pixels.
pub trait PageRasterizer {
    /// Render a page at `scale` pixels per point.
    fn render_page(&self, index: usize, scale: f64) -> Result<PageRaster>;
}
