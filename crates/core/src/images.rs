//! Image region location and cropping.

use crate::matrix::Rect;
use crate::types::ImageRegion;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Placements whose coordinates agree after dividing by this many page
/// points are treated as the same image.
const DEDUP_GRID: f64 = 4.0;

/// Crops narrower or shorter than this many pixels are dropped.
const MIN_CROP_PIXELS: u32 = 8;

/// A page rendered to pixels.
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub image: RgbaImage,

    /// Pixels per page point.
    pub scale: f64,
}

impl PageRaster {
    pub fn new(image: RgbaImage, scale: f64) -> Self {
        Self { image, scale }
    }
}

/// An image placement in top-origin page points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedImage {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PlacedImage {
    fn dedup_key(&self) -> [i64; 4] {
        [self.x, self.y, self.width, self.height].map(|v| (v / DEDUP_GRID).round() as i64)
    }
}

/// Convert bottom-origin placement rectangles to top-origin boxes.
///
/// Near-identical placements (the same image painted twice, or a mask and
/// its image) collapse into the first one.
pub fn locate_images(rects: &[Rect], page_height: f64) -> Vec<PlacedImage> {
    let mut seen = HashSet::new();
    let placed: Vec<PlacedImage> = rects
        .iter()
        .map(|r| PlacedImage {
            x: r.x,
            y: page_height - (r.y + r.height),
            width: r.width,
            height: r.height,
        })
        .filter(|p| seen.insert(p.dedup_key()))
        .collect();

    if placed.len() < rects.len() {
        log::debug!(
            "Collapsed {} duplicate image placements",
            rects.len() - placed.len()
        );
    }
    placed
}

/// Crop each placed image out of the page raster.
pub fn crop_images(placed: &[PlacedImage], raster: &PageRaster) -> Vec<ImageRegion> {
    placed
        .iter()
        .filter_map(|p| {
            let Some(pixels) = crop(p, raster) else {
                log::debug!(
                    "Skipping image at ({:.1}, {:.1}): crop is too small",
                    p.x,
                    p.y
                );
                return None;
            };
            Some(ImageRegion {
                x: p.x,
                y: p.y,
                width: p.width,
                height: p.height,
                pixels,
            })
        })
        .collect()
}

fn crop(p: &PlacedImage, raster: &PageRaster) -> Option<RgbaImage> {
    let (raster_w, raster_h) = raster.image.dimensions();
    let px = |v: f64| (v * raster.scale).round();

    let left = px(p.x).max(0.0);
    let top = px(p.y).max(0.0);
    let right = (px(p.x) + px(p.width)).min(raster_w as f64);
    let bottom = (px(p.y) + px(p.height)).min(raster_h as f64);

    let width = (right - left).max(0.0) as u32;
    let height = (bottom - top).max(0.0) as u32;
    if width < MIN_CROP_PIXELS || height < MIN_CROP_PIXELS {
        return None;
    }

    Some(
        image::imageops::crop_imm(&raster.image, left as u32, top as u32, width, height)
            .to_image(),
    )
}
