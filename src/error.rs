//! Error types for slidescan.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for slidescan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting slides.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading files or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The document could not be opened or parsed.
    #[error("Cannot open {}: {}", .path.display(), .source)]
    Open {
        /// Path that was requested
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The file format is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// Error extracting text content.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// Error walking the page's image resources.
    #[error("Image lookup error: {0}")]
    ImageLocate(String),

    /// Rasterizing the document failed.
    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    /// The OCR engine failed on a page.
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// A required external program is not installed.
    #[error("{0} not found; is it installed and on PATH?")]
    ToolNotFound(String),
}

impl Error {
    /// Wrap an error as a failure to open `path`.
    pub fn open(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::Open {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error means the document itself could not be opened.
    pub fn is_open_error(&self) -> bool {
        matches!(self, Error::Open { .. })
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
