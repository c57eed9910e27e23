//! Core pipeline for turning PDF pages into editable presentation slides.
//!
//! A page's drawing operations are walked for fill colors and image
//! placements, its text layer becomes styled runs grouped into lines, and
//! each page is rebuilt as a slide of text boxes and pictures. Document
//! parsing, rendering and file output sit behind the traits in [`source`]
//! and [`presentation`].

pub mod convert;
pub mod error;
pub mod fonts;
pub mod graphics;
pub mod images;
pub mod lines;
pub mod matrix;
pub mod normalize;
pub mod operators;
pub mod presentation;
pub mod slide;
pub mod source;
pub mod text;
pub mod types;

pub use convert::{output_file_name, CancellationToken, ConversionOptions, Converter, Progress, Stage};
pub use error::{Error, Result};
pub use fonts::{FontInfo, FontResolver};
pub use graphics::{walk_operators, GraphicsState, WalkOutput};
pub use images::{PageRaster, PlacedImage};
pub use lines::build_text_lines;
pub use matrix::{Matrix, Rect};
pub use operators::{OpCode, Operand, Operator, OperatorList};
pub use presentation::{PresentationDocument, PresentationWriter};
pub use slide::{
    Background, Frame, ImageBox, OutputMode, Picture, PictureFormat, Shape, Slide, SlideBuilder,
    TextBox, TextRunSpec,
};
pub use source::{DocumentSource, PageRasterizer, PageSize};
pub use text::{extract_runs, TextItem};
pub use types::{GlyphRun, ImageRegion, PageExtraction, RgbColor, StyledRun, TextLine};
