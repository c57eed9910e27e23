//! The conversion job: runs every page of a document through the pipeline
//! and assembles the slides.

use crate::error::{Error, Result};
use crate::graphics::walk_operators;
use crate::images::{crop_images, locate_images, PageRaster};
use crate::lines::build_text_lines;
use crate::presentation::{PresentationDocument, PresentationWriter};
use crate::slide::{OutputMode, SlideBuilder};
use crate::source::{DocumentSource, PageRasterizer};
use crate::text::extract_runs;
use crate::types::{PageExtraction, RgbColor};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Share of the progress bar covered by page processing; the rest is
/// left for serialization.
const PAGE_PROGRESS_SPAN: f64 = 90.0;

/// Settings for one conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    pub mode: OutputMode,

    /// Pixels per point for full-page rasters.
    pub render_scale: f64,

    /// Pixels per point for the raster that image regions are cropped from.
    pub image_scale: f64,

    /// JPEG quality (1-100) for full-page rasters.
    pub jpeg_quality: u8,

    /// Slide background in clean and image-only modes.
    pub background_color: RgbColor,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::Hybrid,
            render_scale: 3.0,
            image_scale: 2.5,
            jpeg_quality: 97,
            background_color: RgbColor::WHITE,
        }
    }
}

impl ConversionOptions {
    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_render_scale(mut self, scale: f64) -> Self {
        self.render_scale = scale;
        self
    }

    pub fn with_image_scale(mut self, scale: f64) -> Self {
        self.image_scale = scale;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_background_color(mut self, color: RgbColor) -> Self {
        self.background_color = color;
        self
    }

    /// Check that scales are positive and finite and quality is 1-100.
    pub fn validate(&self) -> Result<()> {
        for (name, scale) in [
            ("render_scale", self.render_scale),
            ("image_scale", self.image_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(Error::InvalidOptions(format!(
                    "{} must be a positive number, got {}",
                    name, scale
                )));
            }
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::InvalidOptions(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// A thread-safe flag that asks a running conversion to stop.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What a page is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Rendering,
    Extracting,
    Building,
}

/// Progress events emitted during a conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Progress {
    Started {
        pages: usize,
    },
    Page {
        /// 1-based page number.
        number: usize,
        total: usize,
        stage: Stage,
        percent: u8,
    },
    Finished {
        slides: usize,
    },
}

impl Progress {
    fn page(number: usize, total: usize, stage: Stage) -> Self {
        let percent = ((number - 1) as f64 / total as f64 * PAGE_PROGRESS_SPAN).round() as u8;
        Progress::Page {
            number,
            total,
            stage,
            percent,
        }
    }
}

/// Converts documents into presentations.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConversionOptions,
}

impl Converter {
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert every page of `source` into a slide.
    ///
    /// Cancellation is checked before each page; a cancelled job returns
    /// [`Error::Cancelled`] and drops everything built so far.
    pub fn convert(
        &self,
        source: &dyn DocumentSource,
        rasterizer: Option<&dyn PageRasterizer>,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<PresentationDocument> {
        self.options.validate()?;

        let total = source.page_count();
        if total == 0 {
            return Err(Error::EmptyDocument);
        }

        let mode = self.options.mode;
        if mode.needs_raster() && rasterizer.is_none() {
            return Err(Error::RendererUnavailable(mode.to_string()));
        }
        if rasterizer.is_none() {
            log::warn!("No page rasterizer available; image regions will be skipped");
        }

        let first = source.page_size(0)?;
        let mut document = PresentationDocument::new(first.width, first.height);
        let builder = SlideBuilder::new(mode, document.width_in, document.height_in)
            .with_background_color(self.options.background_color)
            .with_jpeg_quality(self.options.jpeg_quality);

        progress(Progress::Started { pages: total });
        log::debug!(
            "Converting {} pages in {} mode to {:.2}x{:.2}in slides",
            total,
            mode,
            document.width_in,
            document.height_in
        );

        for index in 0..total {
            if cancel.is_cancelled() {
                log::debug!("Conversion cancelled before page {}", index + 1);
                return Err(Error::Cancelled);
            }
            let number = index + 1;

            let raster_scale = match mode {
                OutputMode::Clean => self.options.image_scale,
                OutputMode::ImageOnly | OutputMode::Hybrid => self.options.render_scale,
            };
            let raster = match rasterizer {
                Some(r) => {
                    progress(Progress::page(number, total, Stage::Rendering));
                    Some(r.render_page(index, raster_scale)?)
                }
                None => None,
            };

            let page = if mode.extracts_content() {
                progress(Progress::page(number, total, Stage::Extracting));
                // Hybrid slides show images through the background raster.
                let crop_from = raster.as_ref().filter(|_| mode == OutputMode::Clean);
                self.extract_page(source, index, crop_from)?
            } else {
                let size = source.page_size(index)?;
                PageExtraction::empty(size.width, size.height)
            };

            progress(Progress::page(number, total, Stage::Building));
            let slide = builder.build(&page, raster.as_ref())?;
            log::debug!(
                "Page {}: {} lines, {} images, {} shapes",
                number,
                page.lines.len(),
                page.images.len(),
                slide.shapes.len()
            );
            document.add_slide(slide);
        }

        progress(Progress::Finished {
            slides: document.slide_count(),
        });
        Ok(document)
    }

    /// Convert a document and serialize it. Nothing is written when the job
    /// fails or is cancelled.
    pub fn convert_to_bytes(
        &self,
        source: &dyn DocumentSource,
        rasterizer: Option<&dyn PageRasterizer>,
        writer: &dyn PresentationWriter,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<Vec<u8>> {
        let document = self.convert(source, rasterizer, cancel, progress)?;
        writer.write(&document)
    }

    /// Extract the text lines and (given a raster) image regions of one page.
    pub fn extract_page(
        &self,
        source: &dyn DocumentSource,
        index: usize,
        raster: Option<&PageRaster>,
    ) -> Result<PageExtraction> {
        let size = source.page_size(index)?;
        let operators = source.operator_list(index)?;
        let items = source.text_content(index)?;
        let fonts = source.page_fonts(index)?;

        let walk = walk_operators(&operators);
        let runs = extract_runs(&items, &walk.text_colors, &fonts);
        let lines = build_text_lines(runs);

        let images = match raster {
            Some(raster) => crop_images(&locate_images(&walk.image_rects, size.height), raster),
            None => Vec::new(),
        };

        Ok(PageExtraction::new(size.width, size.height, lines, images))
    }
}

/// Output file name for an input document: `"deck.PDF"` → `"deck.pptx"`.
pub fn output_file_name(input: impl AsRef<Path>) -> String {
    let name = input
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stem = match name.len().checked_sub(4) {
        Some(split) if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(".pdf") => {
            &name[..split]
        }
        _ => name.as_str(),
    };
    let stem = if stem.is_empty() { "presentation" } else { stem };
    format!("{}.pptx", stem)
}
