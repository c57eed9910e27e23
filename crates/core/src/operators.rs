//! Page operator lists as delivered by a document source.

use serde::{Deserialize, Serialize};

/// The drawing operations the extraction pipeline cares about.
///
/// Everything else a page does (paths, shading, clipping, ...) arrives as
/// [`OpCode::Other`] and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpCode {
    /// `q`
    Save,
    /// `Q`
    Restore,
    /// `cm` with six numeric arguments.
    Transform,
    /// `g` with one gray component.
    SetFillGray,
    /// `rg` with three RGB components.
    SetFillRgb,
    /// `sc` in the current fill color space.
    SetFillColor,
    /// `scn` in the current fill color space (may carry a pattern name).
    SetFillColorN,
    /// `Tj` with one string argument.
    ShowText,
    /// `'` with one string argument.
    NextLineShowText,
    /// `"` whose string is the last argument.
    NextLineSetSpacingShowText,
    /// `TJ` with one array of strings and kerning numbers.
    ShowSpacedText,
    /// `Do` on an image XObject.
    PaintImageXObject,
    /// `BI … ID … EI`.
    PaintInlineImage,
    /// An image mask painted in the fill color.
    PaintImageMask,
    /// Anything else.
    Other,
}

impl OpCode {
    /// Whether this operation paints an image into the unit square.
    pub fn is_image_paint(&self) -> bool {
        matches!(
            self,
            OpCode::PaintImageXObject | OpCode::PaintInlineImage | OpCode::PaintImageMask
        )
    }

    /// Whether this operation shows a single string.
    pub fn is_single_text_show(&self) -> bool {
        matches!(
            self,
            OpCode::ShowText | OpCode::NextLineShowText | OpCode::NextLineSetSpacingShowText
        )
    }
}

/// An operator argument.
///
/// Strings are already decoded to Unicode by the source, using the font that
/// was active when the operator ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Number(f64),
    Text(String),
    Name(String),
    Array(Vec<Operand>),
}

impl Operand {
    /// The numeric value, if this operand is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The decoded text, if this operand is a string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Operand::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A single operation with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub code: OpCode,
    pub args: Vec<Operand>,
}

impl Operator {
    /// Create a new operator.
    pub fn new(code: OpCode, args: Vec<Operand>) -> Self {
        Self { code, args }
    }

    /// Every argument as a number, or `None` if any argument is not numeric.
    pub fn numeric_args(&self) -> Option<Vec<f64>> {
        self.args.iter().map(Operand::as_number).collect()
    }
}

/// The ordered operations of one page, in original stream order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorList {
    ops: Vec<Operator>,
}

impl OperatorList {
    /// Create an empty operator list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation.
    pub fn push(&mut self, code: OpCode, args: Vec<Operand>) {
        self.ops.push(Operator::new(code, args));
    }

    /// Iterate over the operations in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Operator> {
        self.ops.iter()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<Vec<Operator>> for OperatorList {
    fn from(ops: Vec<Operator>) -> Self {
        Self { ops }
    }
}

impl<'a> IntoIterator for &'a OperatorList {
    type Item = &'a Operator;
    type IntoIter = std::slice::Iter<'a, Operator>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}
