//! Error types for PDF to presentation conversion.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a PDF into a presentation.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The conversion job was cancelled before it finished.
    ///
    /// This is not a failure: callers should not report it as one and must
    /// not write any output.
    #[error("Conversion cancelled")]
    Cancelled,

    /// Conversion options are out of range.
    #[error("Invalid conversion options: {0}")]
    InvalidOptions(String),

    /// The source document has no pages.
    #[error("Document has no pages")]
    EmptyDocument,

    /// Failed to parse the PDF file structure.
    #[error("PDF parsing error: {0}")]
    PdfParseError(String),

    /// The PDF is encrypted and cannot be read.
    #[error("Encrypted PDF documents are not supported")]
    EncryptedDocument,

    /// The document source failed to deliver page content
    /// (operator list, text content, fonts or page geometry).
    #[error("Failed to read page {page}: {message}")]
    SourceError { page: usize, message: String },

    /// The page rasterizer failed.
    #[error("Rendering error: {0}")]
    RenderError(String),

    /// The selected output mode needs page rasters but no rasterizer is available.
    #[error("Output mode '{0}' needs a page rasterizer, but none is available")]
    RendererUnavailable(String),

    /// Failed to encode a raster as PNG or JPEG.
    #[error("Image encoding error: {0}")]
    ImageEncodeError(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML writing error (for PPTX).
    #[error("XML error: {0}")]
    XmlError(String),
}

impl Error {
    /// Whether this error is the cancellation outcome rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Build a [`Error::SourceError`] for a 0-based page index.
    pub fn source(page: usize, message: impl Into<String>) -> Self {
        Error::SourceError {
            page: page + 1,
            message: message.into(),
        }
    }
}
