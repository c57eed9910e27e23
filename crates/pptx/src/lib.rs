//! PowerPoint (.pptx) output for pdf2ppt.
//!
//! Writes a presentation as an Office Open XML package: a ZIP archive of
//! XML parts plus the embedded pictures.

pub mod slide;
mod templates;
pub mod writer;
mod xml;

pub use slide::EMU_PER_INCH;
pub use writer::{slide_extent_emu, PptxWriter, MAX_SLIDE_EMU, MIN_SLIDE_EMU};
