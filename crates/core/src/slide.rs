//! Slide construction.
//!
//! Turns one page's extraction and raster into a slide in presentation units
//! (inches). All three output modes share one builder.

use crate::error::{Error, Result};
use crate::fonts::sanitize_font_family;
use crate::images::PageRaster;
use crate::types::{ImageRegion, PageExtraction, RgbColor, StyledRun, TextLine};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

pub const POINTS_PER_INCH: f64 = 72.0;

/// Smallest font size written to a slide, in points.
const MIN_FONT_SIZE: u32 = 6;

/// Shapes thinner than this (inches) are not worth emitting.
const MIN_SHAPE_EXTENT: f64 = 0.05;

/// Room added around a line so glyph overhangs are not clipped (inches).
const TEXT_BOX_PAD_WIDTH: f64 = 0.08;
const TEXT_BOX_PAD_HEIGHT: f64 = 0.04;
const TEXT_BOX_MIN_WIDTH: f64 = 0.1;
const TEXT_BOX_MIN_HEIGHT: f64 = 0.08;

/// How each page becomes a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// The page raster as a single picture. Nothing is editable.
    #[serde(rename = "image")]
    ImageOnly,

    /// The page raster as background with editable text on top.
    #[default]
    Hybrid,

    /// A plain background with separate picture objects and editable text.
    Clean,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::ImageOnly => "image",
            OutputMode::Hybrid => "hybrid",
            OutputMode::Clean => "clean",
        }
    }

    /// Whether the mode cannot work without a page raster.
    pub fn needs_raster(&self) -> bool {
        matches!(self, OutputMode::ImageOnly | OutputMode::Hybrid)
    }

    /// Whether the mode extracts text and images from page content.
    pub fn extracts_content(&self) -> bool {
        matches!(self, OutputMode::Hybrid | OutputMode::Clean)
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" | "image-only" | "imageonly" => Ok(OutputMode::ImageOnly),
            "hybrid" => Ok(OutputMode::Hybrid),
            "clean" => Ok(OutputMode::Clean),
            other => Err(format!(
                "unknown output mode '{}' (expected image, hybrid or clean)",
                other
            )),
        }
    }
}

/// Encoding of a picture's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PictureFormat {
    Png,
    Jpeg,
}

impl PictureFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            PictureFormat::Png => "image/png",
            PictureFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            PictureFormat::Png => "png",
            PictureFormat::Jpeg => "jpeg",
        }
    }
}

/// Encoded image bytes ready to embed.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub data: Vec<u8>,
    pub format: PictureFormat,
    pub width_px: u32,
    pub height_px: u32,
}

impl Picture {
    /// Encode pixels losslessly.
    pub fn encode_png(pixels: &RgbaImage) -> Result<Self> {
        let mut data = Vec::new();
        pixels
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
            .map_err(|e| Error::ImageEncodeError(format!("PNG: {}", e)))?;

        Ok(Self {
            data,
            format: PictureFormat::Png,
            width_px: pixels.width(),
            height_px: pixels.height(),
        })
    }

    /// Encode pixels as JPEG at `quality` (1-100). Alpha is dropped.
    pub fn encode_jpeg(pixels: &RgbaImage, quality: u8) -> Result<Self> {
        let rgb = DynamicImage::ImageRgba8(pixels.clone()).into_rgb8();
        let mut data = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut data, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|e| Error::ImageEncodeError(format!("JPEG: {}", e)))?;

        Ok(Self {
            data,
            format: PictureFormat::Jpeg,
            width_px: pixels.width(),
            height_px: pixels.height(),
        })
    }
}

/// A position and size in inches, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Background {
    Solid(RgbColor),
    Raster(Picture),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBox {
    pub frame: Frame,
    pub picture: Picture,
}

/// One formatted run inside a text box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRunSpec {
    pub text: String,

    /// Whole points, never below 6.
    pub size_pt: u32,

    pub bold: bool,
    pub italic: bool,
    pub font_face: String,
    pub color: RgbColor,
}

/// A single-line editable text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub frame: Frame,
    pub runs: Vec<TextRunSpec>,

    /// Box fill; `None` leaves it transparent.
    pub fill: Option<RgbColor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Image(ImageBox),
    Text(TextBox),
}

/// One output slide: a background and shapes in z-order.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub background: Background,
    pub shapes: Vec<Shape>,
}

impl Slide {
    pub fn text_boxes(&self) -> impl Iterator<Item = &TextBox> {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Text(t) => Some(t),
            Shape::Image(_) => None,
        })
    }

    pub fn image_boxes(&self) -> impl Iterator<Item = &ImageBox> {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Image(i) => Some(i),
            Shape::Text(_) => None,
        })
    }
}

fn inches(points: f64) -> f64 {
    points / POINTS_PER_INCH
}

/// Builds slides of a fixed size for one output mode.
#[derive(Debug, Clone)]
pub struct SlideBuilder {
    mode: OutputMode,
    slide_width: f64,
    slide_height: f64,
    background_color: RgbColor,
    jpeg_quality: u8,
}

impl SlideBuilder {
    /// Create a builder for slides of the given size in inches.
    pub fn new(mode: OutputMode, slide_width: f64, slide_height: f64) -> Self {
        Self {
            mode,
            slide_width,
            slide_height,
            background_color: RgbColor::WHITE,
            jpeg_quality: 97,
        }
    }

    /// Set the solid background (and opaque text box fill).
    pub fn with_background_color(mut self, color: RgbColor) -> Self {
        self.background_color = color;
        self
    }

    /// Set the JPEG quality for page rasters.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Build the slide for one page.
    ///
    /// Image-only and hybrid slides need the page raster. Clean slides use
    /// the extraction alone.
    pub fn build(&self, page: &PageExtraction, raster: Option<&PageRaster>) -> Result<Slide> {
        match self.mode {
            OutputMode::ImageOnly => {
                let picture = Picture::encode_jpeg(&self.require_raster(raster)?.image, self.jpeg_quality)?;
                Ok(Slide {
                    background: Background::Solid(self.background_color),
                    shapes: vec![Shape::Image(ImageBox {
                        frame: Frame::new(0.0, 0.0, self.slide_width, self.slide_height),
                        picture,
                    })],
                })
            }
            OutputMode::Hybrid => {
                let picture = Picture::encode_jpeg(&self.require_raster(raster)?.image, self.jpeg_quality)?;
                Ok(Slide {
                    background: Background::Raster(picture),
                    shapes: self.text_shapes(page, None),
                })
            }
            OutputMode::Clean => {
                let mut shapes = self.image_shapes(&page.images)?;
                shapes.extend(self.text_shapes(page, Some(self.background_color)));
                Ok(Slide {
                    background: Background::Solid(self.background_color),
                    shapes,
                })
            }
        }
    }

    fn require_raster<'a>(&self, raster: Option<&'a PageRaster>) -> Result<&'a PageRaster> {
        raster.ok_or_else(|| Error::RendererUnavailable(self.mode.to_string()))
    }

    fn image_shapes(&self, images: &[ImageRegion]) -> Result<Vec<Shape>> {
        let mut shapes = Vec::with_capacity(images.len());
        for region in images {
            let Some(frame) = self.image_frame(region) else {
                continue;
            };
            shapes.push(Shape::Image(ImageBox {
                frame,
                picture: Picture::encode_png(&region.pixels)?,
            }));
        }
        Ok(shapes)
    }

    fn text_shapes(&self, page: &PageExtraction, fill: Option<RgbColor>) -> Vec<Shape> {
        page.lines
            .iter()
            .filter_map(|line| {
                let frame = self.text_frame(line, page.page_height)?;
                Some(Shape::Text(TextBox {
                    frame,
                    runs: line.runs.iter().map(run_spec).collect(),
                    fill,
                }))
            })
            .collect()
    }

    /// Place an image region, clipped to the slide.
    pub fn image_frame(&self, region: &ImageRegion) -> Option<Frame> {
        let x = inches(region.x).max(0.0);
        let y = inches(region.y).max(0.0);
        let width = inches(region.width).min(self.slide_width - x);
        let height = inches(region.height).min(self.slide_height - y);

        (width >= MIN_SHAPE_EXTENT && height >= MIN_SHAPE_EXTENT)
            .then(|| Frame::new(x, y, width, height))
    }

    /// Place a text line, padded and clipped to the slide.
    pub fn text_frame(&self, line: &TextLine, page_height: f64) -> Option<Frame> {
        let x = inches(line.left()).max(0.0);
        let y = inches(line.top(page_height)).max(0.0);
        if x >= self.slide_width || y >= self.slide_height {
            return None;
        }

        let room_x = self.slide_width - x;
        let room_y = self.slide_height - y;
        let width = (inches(line.right() - line.left()) + TEXT_BOX_PAD_WIDTH)
            .min(room_x)
            .max(TEXT_BOX_MIN_WIDTH)
            .min(room_x);
        if width < MIN_SHAPE_EXTENT {
            return None;
        }
        let height = (inches(line.height()) + TEXT_BOX_PAD_HEIGHT)
            .max(TEXT_BOX_MIN_HEIGHT)
            .min(room_y);

        Some(Frame::new(x, y, width, height))
    }
}

fn run_spec(run: &StyledRun) -> TextRunSpec {
    TextRunSpec {
        text: run.text.clone(),
        size_pt: (run.font_size.round() as u32).max(MIN_FONT_SIZE),
        bold: run.bold,
        italic: run.italic,
        font_face: sanitize_font_family(&run.font_face),
        color: run.color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GlyphRun;
    use image::Rgba;

    fn run(text: &str, x: f64, y: f64, size: f64, width: f64) -> GlyphRun {
        GlyphRun {
            text: text.to_string(),
            font_size: size,
            bold: true,
            italic: false,
            font_face: "TimesNewRomanPS".to_string(),
            color: RgbColor::new(255, 0, 0),
            x,
            y,
            width,
        }
    }

    fn line(runs: Vec<GlyphRun>) -> TextLine {
        TextLine {
            baseline_y: runs[0].y,
            runs,
        }
    }

    fn raster() -> PageRaster {
        PageRaster::new(RgbaImage::from_pixel(30, 40, Rgba([10, 20, 30, 255])), 0.05)
    }

    fn letter_builder(mode: OutputMode) -> SlideBuilder {
        SlideBuilder::new(mode, 8.5, 11.0)
    }

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!("image".parse::<OutputMode>(), Ok(OutputMode::ImageOnly));
        assert_eq!("Hybrid".parse::<OutputMode>(), Ok(OutputMode::Hybrid));
        assert_eq!("clean".parse::<OutputMode>(), Ok(OutputMode::Clean));
        assert!("vector".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::default(), OutputMode::Hybrid);
    }

    #[test]
    fn test_text_frame_geometry() {
        let builder = letter_builder(OutputMode::Clean);
        let l = line(vec![run("Hello", 72.0, 700.0, 12.0, 144.0)]);
        let frame = builder.text_frame(&l, 792.0).unwrap();

        assert!((frame.x - 1.0).abs() < 1e-9);
        assert!((frame.y - 89.6 / 72.0).abs() < 1e-9);
        assert!((frame.width - 2.08).abs() < 1e-9);
        assert!((frame.height - (16.2 / 72.0 + 0.04)).abs() < 1e-9);
    }

    #[test]
    fn test_text_frame_is_clipped_to_the_slide() {
        let builder = letter_builder(OutputMode::Clean);

        // Starts left of the page and runs past the right edge.
        let l = line(vec![run("wide", -36.0, 700.0, 12.0, 800.0)]);
        let frame = builder.text_frame(&l, 792.0).unwrap();
        assert_eq!(frame.x, 0.0);
        assert!((frame.width - 8.5).abs() < 1e-9);

        // Starts right at the slide edge.
        let l = line(vec![run("off", 612.0, 700.0, 12.0, 20.0)]);
        assert!(builder.text_frame(&l, 792.0).is_none());

        // Starts 0.03in before the edge: too thin to keep.
        let l = line(vec![run("edge", 609.84, 700.0, 12.0, 20.0)]);
        assert!(builder.text_frame(&l, 792.0).is_none());

        // Tiny runs still get a minimum width.
        let l = line(vec![run(".", 100.0, 700.0, 2.0, 1.0)]);
        let frame = builder.text_frame(&l, 792.0).unwrap();
        assert!((frame.width - 0.1).abs() < 1e-9);
        assert!((frame.height - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_run_spec_formatting() {
        let spec = run_spec(&run("Hi", 0.0, 0.0, 11.6, 10.0));
        assert_eq!(spec.size_pt, 12);
        assert!(spec.bold);
        assert_eq!(spec.font_face, "TimesNewRoman");
        assert_eq!(spec.color.to_hex(), "FF0000");

        assert_eq!(run_spec(&run("tiny", 0.0, 0.0, 3.2, 10.0)).size_pt, 6);
    }

    #[test]
    fn test_image_frame_clipping() {
        let builder = letter_builder(OutputMode::Clean);
        let region = |x: f64, y: f64, w: f64, h: f64| ImageRegion {
            x,
            y,
            width: w,
            height: h,
            pixels: RgbaImage::new(1, 1),
        };

        let frame = builder.image_frame(&region(72.0, -36.0, 720.0, 144.0)).unwrap();
        assert_eq!((frame.x, frame.y), (1.0, 0.0));
        assert!((frame.width - 7.5).abs() < 1e-9);
        assert!((frame.height - 2.0).abs() < 1e-9);

        assert!(builder.image_frame(&region(610.0, 0.0, 100.0, 100.0)).is_none());
    }

    #[test]
    fn test_hybrid_slide_has_raster_background_and_transparent_text() {
        let page = PageExtraction::new(
            612.0,
            792.0,
            vec![line(vec![run("Hello", 72.0, 700.0, 12.0, 30.0)])],
            Vec::new(),
        );
        let slide = letter_builder(OutputMode::Hybrid)
            .build(&page, Some(&raster()))
            .unwrap();

        match &slide.background {
            Background::Raster(picture) => {
                assert_eq!(picture.format, PictureFormat::Jpeg);
                assert_eq!((picture.width_px, picture.height_px), (30, 40));
                assert_eq!(&picture.data[..2], &[0xFFu8, 0xD8]);
            }
            other => panic!("expected raster background, got {:?}", other),
        }
        let boxes: Vec<&TextBox> = slide.text_boxes().collect();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].fill, None);
        assert_eq!(boxes[0].runs[0].color, RgbColor::new(255, 0, 0));
        assert_eq!(slide.image_boxes().count(), 0);
    }

    #[test]
    fn test_image_only_slide_is_one_full_bleed_picture() {
        let page = PageExtraction::empty(612.0, 792.0);
        let slide = letter_builder(OutputMode::ImageOnly)
            .with_background_color(RgbColor::BLACK)
            .build(&page, Some(&raster()))
            .unwrap();

        assert_eq!(slide.background, Background::Solid(RgbColor::BLACK));
        assert_eq!(slide.shapes.len(), 1);
        let image = slide.image_boxes().next().unwrap();
        assert_eq!(image.frame, Frame::new(0.0, 0.0, 8.5, 11.0));
        assert_eq!(image.picture.format, PictureFormat::Jpeg);
    }

    #[test]
    fn test_clean_slide_puts_images_under_opaque_text() {
        let page = PageExtraction::new(
            612.0,
            792.0,
            vec![line(vec![run("Caption", 72.0, 100.0, 12.0, 50.0)])],
            vec![ImageRegion {
                x: 72.0,
                y: 72.0,
                width: 144.0,
                height: 144.0,
                pixels: RgbaImage::from_pixel(16, 16, Rgba([0, 128, 0, 255])),
            }],
        );
        let slide = letter_builder(OutputMode::Clean).build(&page, None).unwrap();

        assert_eq!(slide.background, Background::Solid(RgbColor::WHITE));
        assert!(matches!(slide.shapes[0], Shape::Image(_)));
        assert!(matches!(slide.shapes[1], Shape::Text(_)));
        let image = slide.image_boxes().next().unwrap();
        assert_eq!(image.picture.format, PictureFormat::Png);
        assert_eq!(&image.picture.data[1..4], b"PNG");
        assert_eq!(slide.text_boxes().next().unwrap().fill, Some(RgbColor::WHITE));
    }

    #[test]
    fn test_raster_modes_need_a_raster() {
        let page = PageExtraction::empty(612.0, 792.0);
        for mode in [OutputMode::ImageOnly, OutputMode::Hybrid] {
            let err = letter_builder(mode).build(&page, None).unwrap_err();
            assert!(matches!(err, Error::RendererUnavailable(_)));
        }
    }
}
