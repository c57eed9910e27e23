//! Affine transformation matrices and page-space rectangles.

use serde::{Deserialize, Serialize};

/// A 2D affine transform `[a b c d e f]`, mapping `(x, y)` to
/// `(a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix {
    /// Create a matrix from its six components.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// The identity transform.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// A pure translation.
    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Build a matrix from the first six values of a slice.
    ///
    /// Returns `None` if fewer than six values are present or any is not finite.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        if values.len() < 6 || values[..6].iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        ))
    }

    /// Components as `[a, b, c, d, e, f]`.
    pub fn to_array(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Compose two transforms: the result applies `self` first, then `other`.
    ///
    /// With the page's current transform as `other`, `given.concat(&ctm)` is
    /// the new CTM after a `cm` operator.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Map a point through this transform.
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed x basis vector.
    pub fn x_scale(&self) -> f64 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Length of the transformed y basis vector.
    pub fn y_scale(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// Axis-aligned bounds of the unit square `[0,1]×[0,1]` after transformation.
    ///
    /// Images are painted into the unit square of the current user space, so
    /// this is where an image lands on the page.
    pub fn unit_square_bounds(&self) -> Rect {
        let corners = [
            self.transform_point(0.0, 0.0),
            self.transform_point(1.0, 0.0),
            self.transform_point(0.0, 1.0),
            self.transform_point(1.0, 1.0),
        ];

        let (mut x0, mut y0) = corners[0];
        let (mut x1, mut y1) = corners[0];
        for &(x, y) in &corners[1..] {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }

        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// An axis-aligned rectangle in page points.
///
/// Whether `y` is measured from the bottom or the top edge depends on where the
/// rectangle comes from; walker output is bottom-origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Far vertical edge (`y + height`).
    pub fn far_y(&self) -> f64 {
        self.y + self.height
    }
}
