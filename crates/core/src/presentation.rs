//! The assembled presentation and the trait that serializes it.

use crate::error::Result;
use crate::slide::{Slide, POINTS_PER_INCH};

/// An ordered list of same-sized slides.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationDocument {
    /// Slide width in inches.
    pub width_in: f64,

    /// Slide height in inches.
    pub height_in: f64,

    pub slides: Vec<Slide>,
}

impl PresentationDocument {
    /// Create an empty presentation sized to a page given in points.
    ///
    /// Every slide shares this size, so it is taken from the first page.
    pub fn new(page_width_pt: f64, page_height_pt: f64) -> Self {
        Self {
            width_in: page_width_pt / POINTS_PER_INCH,
            height_in: page_height_pt / POINTS_PER_INCH,
            slides: Vec::new(),
        }
    }

    /// Append a slide after the existing ones.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

/// Serializes a presentation into a file format.
pub trait PresentationWriter {
    /// Encode the whole presentation as file bytes.
    fn write(&self, presentation: &PresentationDocument) -> Result<Vec<u8>>;
}
