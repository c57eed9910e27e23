//! Text run extraction.
//!
//! Joins the text layer of a page (strings with transforms and widths) with
//! the fill colors found by the graphics walk and the style of each font.

use crate::fonts::{resolve_font_style, FontResolver, FontStyle};
use crate::graphics::has_ink;
use crate::matrix::Matrix;
use crate::normalize::normalize_glyph_text;
use crate::types::{GlyphRun, RgbColor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Average glyph advance as a fraction of the font size, used when a text
/// item does not declare its width.
const FALLBACK_ADVANCE_EM: f64 = 0.55;

/// One item of a page's text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    /// Decoded text.
    pub text: String,

    /// Text rendering matrix at the start of the string.
    pub transform: Matrix,

    /// Advance width in page points (0 if unknown).
    pub width: f64,

    /// Font resource name used in the page's content.
    pub font_name: String,
}

/// Rendered font size of a text transform.
///
/// The length of the vertical basis vector stays correct under rotation,
/// where `d` alone drops to zero. Never less than 1.
pub fn font_size_from_transform(transform: &Matrix) -> f64 {
    transform.y_scale().max(1.0)
}

/// Build positioned, styled glyph runs from a page's text layer.
///
/// Visible items take the next entry of `colors`; whitespace-only items keep
/// the last assigned color. When colors run out, text is black.
pub fn extract_runs(
    items: &[TextItem],
    colors: &[RgbColor],
    fonts: &dyn FontResolver,
) -> Vec<GlyphRun> {
    let mut next_color = colors.iter().copied();
    let mut last_color = RgbColor::BLACK;
    let mut exhausted = false;
    let mut styles: HashMap<&str, FontStyle> = HashMap::new();
    let mut runs = Vec::with_capacity(items.len());

    for item in items {
        let text = normalize_glyph_text(&item.text);
        if text.is_empty() {
            continue;
        }

        if has_ink(&text) {
            last_color = match next_color.next() {
                Some(color) => color,
                None => {
                    exhausted = true;
                    RgbColor::BLACK
                }
            };
        }

        let style = styles
            .entry(item.font_name.as_str())
            .or_insert_with(|| resolve_font_style(fonts, &item.font_name));

        let font_size = font_size_from_transform(&item.transform);
        let width = if item.width > 0.0 {
            item.width
        } else {
            font_size * text.chars().count() as f64 * FALLBACK_ADVANCE_EM
        };

        runs.push(GlyphRun {
            text,
            font_size,
            bold: style.bold,
            italic: style.italic,
            font_face: style.family.clone(),
            color: last_color,
            x: item.transform.e,
            y: item.transform.f,
            width: width.max(1.0),
        });
    }

    if exhausted {
        log::warn!("Text colors ran out before text items; remaining text is black");
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontInfo;

    fn item(text: &str, transform: [f64; 6], width: f64, font: &str) -> TextItem {
        TextItem {
            text: text.to_string(),
            transform: Matrix::from_slice(&transform).unwrap(),
            width,
            font_name: font.to_string(),
        }
    }

    #[test]
    fn test_font_size_formula() {
        let size = |c: f64, d: f64| font_size_from_transform(&Matrix::new(1.0, 0.0, c, d, 0.0, 0.0));
        assert_eq!(size(0.0, 24.0), 24.0);
        assert_eq!(size(24.0, 0.0), 24.0);
        assert!((size(16.97, 16.97) - 24.0).abs() < 0.01);
        assert_eq!(size(0.0, -12.0), 12.0);
        assert_eq!(size(0.0, 0.2), 1.0);
    }

    #[test]
    fn test_runs_take_position_style_and_color() {
        let mut fonts = HashMap::new();
        fonts.insert("F1".to_string(), FontInfo::named("ABCDEF+Georgia-Bold"));
        let items = vec![item("Hello", [12.0, 0.0, 0.0, 12.0, 10.0, 700.0], 30.0, "F1")];
        let colors = vec![RgbColor::new(255, 0, 0)];

        let runs = extract_runs(&items, &colors, &fonts);
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.text, "Hello");
        assert_eq!(run.font_size, 12.0);
        assert!(run.bold);
        assert!(!run.italic);
        assert_eq!(run.font_face, "Georgia");
        assert_eq!(run.color, RgbColor::new(255, 0, 0));
        assert_eq!((run.x, run.y, run.width), (10.0, 700.0, 30.0));
    }

    #[test]
    fn test_whitespace_items_do_not_consume_colors() {
        let fonts = HashMap::new();
        let t = [10.0, 0.0, 0.0, 10.0, 0.0, 100.0];
        let items = vec![
            item("red", t, 10.0, "F1"),
            item(" ", t, 3.0, "F1"),
            item("", t, 0.0, "F1"),
            item("blue", t, 10.0, "F1"),
            item("default", t, 10.0, "F1"),
        ];
        let colors = vec![RgbColor::new(255, 0, 0), RgbColor::new(0, 0, 255)];

        let runs = extract_runs(&items, &colors, &fonts);
        let summary: Vec<(&str, RgbColor)> =
            runs.iter().map(|r| (r.text.as_str(), r.color)).collect();
        assert_eq!(
            summary,
            vec![
                ("red", RgbColor::new(255, 0, 0)),
                (" ", RgbColor::new(255, 0, 0)),
                ("blue", RgbColor::new(0, 0, 255)),
                ("default", RgbColor::BLACK),
            ]
        );
    }

    #[test]
    fn test_missing_width_is_estimated() {
        let fonts = HashMap::new();
        let items = vec![
            item("abcd", [10.0, 0.0, 0.0, 10.0, 0.0, 0.0], 0.0, "F1"),
            item("i", [1.0, 0.0, 0.0, 1.0, 0.0, 0.0], 0.0, "F1"),
        ];
        let runs = extract_runs(&items, &[], &fonts);
        assert!((runs[0].width - 22.0).abs() < 1e-9);
        assert_eq!(runs[1].width, 1.0);
    }

    #[test]
    fn test_rotated_text_keeps_its_size() {
        let fonts = HashMap::new();
        let items = vec![item("Up", [0.0, 18.0, -18.0, 0.0, 50.0, 60.0], 20.0, "F1")];
        let runs = extract_runs(&items, &[RgbColor::BLACK], &fonts);
        assert_eq!(runs[0].font_size, 18.0);
    }
}
