//! Domain types for representing extracted page content.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque 8-bit RGB color, serialized as `"RRGGBB"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0, 0, 0);
    pub const WHITE: RgbColor = RgbColor::new(255, 255, 255);

    /// Create a color from 8-bit channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create a color from unit-range components (0.0 = none, 1.0 = full).
    pub fn from_unit(r: f64, g: f64, b: f64) -> Self {
        Self::new(unit_to_byte(r), unit_to_byte(g), unit_to_byte(b))
    }

    /// Create a gray color from a unit-range level.
    pub fn from_gray(level: f64) -> Self {
        let v = unit_to_byte(level);
        Self::new(v, v, v)
    }

    /// Convert unit-range CMYK components with the naive complement formula.
    pub fn from_cmyk(c: f64, m: f64, y: f64, k: f64) -> Self {
        let k = k.clamp(0.0, 1.0);
        Self::from_unit(
            (1.0 - c.clamp(0.0, 1.0)) * (1.0 - k),
            (1.0 - m.clamp(0.0, 1.0)) * (1.0 - k),
            (1.0 - y.clamp(0.0, 1.0)) * (1.0 - k),
        )
    }

    /// Parse a `"RRGGBB"` hex string (an optional leading `#` is accepted).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// The uppercase `"RRGGBB"` form.
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

fn unit_to_byte(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_hex()
    }
}

impl TryFrom<String> for RgbColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RgbColor::from_hex(&value).ok_or_else(|| format!("invalid RGB hex color: {:?}", value))
    }
}

/// A positioned, styled piece of text on a source page.
///
/// Coordinates are PDF points with a bottom-left origin; `y` is the baseline.
/// After merging, a run may cover several source items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphRun {
    /// The text content. Never empty.
    pub text: String,

    /// Font size in points.
    pub font_size: f64,

    pub bold: bool,
    pub italic: bool,

    /// Font family name.
    pub font_face: String,

    /// Fill color.
    pub color: RgbColor,

    /// Left edge.
    pub x: f64,

    /// Baseline, measured from the page bottom.
    pub y: f64,

    /// Advance width.
    pub width: f64,
}

impl GlyphRun {
    /// Right edge of the run.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Whether two runs share bold, italic, face, color and (nearly) size.
    pub fn same_style(&self, other: &GlyphRun) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.font_face == other.font_face
            && self.color == other.color
            && (self.font_size - other.font_size).abs() < 0.5
    }
}

/// A merged run, as it appears in an output line.
pub type StyledRun = GlyphRun;

/// Runs sharing one visual baseline, ordered left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Baseline of the first run that opened the line, bottom-origin.
    pub baseline_y: f64,

    /// Runs in reading order.
    pub runs: Vec<StyledRun>,
}

impl TextLine {
    /// Leftmost run start.
    pub fn left(&self) -> f64 {
        self.runs.iter().map(|r| r.x).fold(f64::INFINITY, f64::min)
    }

    /// Rightmost run end.
    pub fn right(&self) -> f64 {
        self.runs
            .iter()
            .map(GlyphRun::right)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Largest font size in the line.
    pub fn max_font_size(&self) -> f64 {
        self.runs.iter().map(|r| r.font_size).fold(0.0, f64::max)
    }

    /// Top edge of the line's box, measured from the page top.
    ///
    /// Glyphs rise roughly 0.8 of the font size above the baseline, so the box
    /// starts a fifth of the size above it when paired with [`TextLine::height`].
    pub fn top(&self, page_height: f64) -> f64 {
        page_height - self.baseline_y - self.max_font_size() * 0.2
    }

    /// Height of the line's box.
    pub fn height(&self) -> f64 {
        self.max_font_size() * 1.35
    }

    /// The line's text with runs joined as-is.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A raster crop of an image placed on the page.
///
/// Coordinates are page points with a top-left origin.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    /// Cropped pixels from the page raster.
    #[serde(skip)]
    pub pixels: RgbaImage,
}

/// Everything extracted from one source page.
#[derive(Debug, Clone, Serialize)]
pub struct PageExtraction {
    /// Text lines, top to bottom.
    pub lines: Vec<TextLine>,

    /// Image regions in paint order.
    pub images: Vec<ImageRegion>,

    pub page_width: f64,
    pub page_height: f64,
}

/// Lines and images whose top edge lies further than this outside the page
/// are extraction noise.
pub const PAGE_BLEED: f64 = 5.0;

impl PageExtraction {
    /// Assemble a page extraction, dropping off-page lines and images.
    pub fn new(
        page_width: f64,
        page_height: f64,
        lines: Vec<TextLine>,
        images: Vec<ImageRegion>,
    ) -> Self {
        let on_page = |top: f64| (-PAGE_BLEED..=page_height + PAGE_BLEED).contains(&top);

        let line_count = lines.len();
        let lines: Vec<TextLine> = lines
            .into_iter()
            .filter(|line| !line.runs.is_empty() && on_page(line.top(page_height)))
            .collect();

        let image_count = images.len();
        let images: Vec<ImageRegion> = images.into_iter().filter(|img| on_page(img.y)).collect();

        if lines.len() != line_count || images.len() != image_count {
            log::debug!(
                "Dropped {} off-page lines and {} off-page images",
                line_count - lines.len(),
                image_count - images.len()
            );
        }

        Self {
            lines,
            images,
            page_width,
            page_height,
        }
    }

    /// An extraction with no content, used when only the page size matters.
    pub fn empty(page_width: f64, page_height: f64) -> Self {
        Self::new(page_width, page_height, Vec::new(), Vec::new())
    }

    /// Whether the page is wider than it is tall.
    pub fn is_landscape(&self) -> bool {
        self.page_width > self.page_height
    }
}
