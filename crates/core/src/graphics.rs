//! Graphics state walk over a page's operator list.
//!
//! Replays save/restore, transform and fill-color operations to learn two
//! things about a page: the fill color of every visible text item, and where
//! each image lands in page space.

use crate::matrix::{Matrix, Rect};
use crate::normalize::normalize_glyph_text;
use crate::operators::{OpCode, Operand, Operator, OperatorList};
use crate::types::RgbColor;

/// Images smaller than this (in page points) in either dimension are
/// decorative artifacts such as rules, bullets or icons.
pub const MIN_IMAGE_EXTENT: f64 = 20.0;

/// The parts of the PDF graphics state the pipeline tracks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GraphicsState {
    pub ctm: Matrix,
    pub fill_color: RgbColor,
}

/// Result of walking one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkOutput {
    /// One fill color per visible text item, in text-layer order.
    pub text_colors: Vec<RgbColor>,

    /// Image placements in bottom-origin page space.
    pub image_rects: Vec<Rect>,
}

/// Accumulator threaded through the fold.
#[derive(Debug, Default)]
struct Walk {
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    output: WalkOutput,
    unbalanced_restores: usize,
}

/// Walk an operator list and collect text colors and image rectangles.
pub fn walk_operators(ops: &OperatorList) -> WalkOutput {
    let walk = ops.iter().fold(Walk::default(), step);

    if walk.unbalanced_restores > 0 {
        log::warn!(
            "Ignored {} restore operations without a matching save",
            walk.unbalanced_restores
        );
    }
    if !walk.stack.is_empty() {
        log::debug!("{} saved states were never restored", walk.stack.len());
    }

    walk.output
}

fn step(mut walk: Walk, op: &Operator) -> Walk {
    match op.code {
        OpCode::Save => walk.stack.push(walk.state),
        OpCode::Restore => match walk.stack.pop() {
            Some(saved) => walk.state = saved,
            None => walk.unbalanced_restores += 1,
        },
        OpCode::Transform => {
            match op.numeric_args().as_deref().and_then(Matrix::from_slice) {
                Some(given) => walk.state.ctm = given.concat(&walk.state.ctm),
                None => log::debug!("Skipping malformed transform: {:?}", op.args),
            }
        }
        OpCode::SetFillGray | OpCode::SetFillRgb | OpCode::SetFillColor | OpCode::SetFillColorN => {
            if let Some(color) = fill_color(op) {
                walk.state.fill_color = color;
            }
        }
        code if code.is_single_text_show() => {
            // `"` carries spacing numbers before its string.
            let visible = op.args.last().and_then(Operand::as_text).is_some_and(shows_ink);
            if visible {
                walk.output.text_colors.push(walk.state.fill_color);
            }
        }
        OpCode::ShowSpacedText => {
            let segments = visible_segments(op);
            walk.output
                .text_colors
                .extend(std::iter::repeat(walk.state.fill_color).take(segments));
        }
        code if code.is_image_paint() => {
            let bounds = walk.state.ctm.unit_square_bounds();
            if bounds.width >= MIN_IMAGE_EXTENT && bounds.height >= MIN_IMAGE_EXTENT {
                walk.output.image_rects.push(bounds);
            } else {
                log::debug!(
                    "Skipping {:.1}x{:.1} image placement below the visibility threshold",
                    bounds.width,
                    bounds.height
                );
            }
        }
        _ => {}
    }
    walk
}

/// Decode a fill-color operation, or `None` to keep the current color.
fn fill_color(op: &Operator) -> Option<RgbColor> {
    let components = op.numeric_args()?;
    match (op.code, components.as_slice()) {
        (OpCode::SetFillGray, [gray, ..]) => Some(RgbColor::from_gray(*gray)),
        (OpCode::SetFillRgb, [r, g, b, ..]) => Some(RgbColor::from_unit(*r, *g, *b)),
        (OpCode::SetFillColor | OpCode::SetFillColorN, [gray]) => Some(RgbColor::from_gray(*gray)),
        (OpCode::SetFillColor | OpCode::SetFillColorN, [r, g, b, ..]) if [r, g, b].iter().all(|v| **v <= 1.0) => {
            Some(RgbColor::from_unit(*r, *g, *b))
        }
        _ => None,
    }
}

/// Number of string segments of a kerned show that become visible text items.
fn visible_segments(op: &Operator) -> usize {
    match op.args.first() {
        Some(Operand::Array(parts)) => parts
            .iter()
            .filter_map(Operand::as_text)
            .filter(|s| shows_ink(s))
            .count(),
        _ => 0,
    }
}

/// Whether a string draws anything besides whitespace.
pub(crate) fn has_ink(text: &str) -> bool {
    !text.trim().is_empty()
}

/// [`has_ink`] on the text as the run extractor will see it.
fn shows_ink(text: &str) -> bool {
    has_ink(&normalize_glyph_text(text))
}
