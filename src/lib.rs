//! # slidescan
//!
//! Page-by-page extraction from PDF slide decks.
//!
//! A document is read one page ("slide") at a time, each page is run
//! through one or more extractors, and the result is printed before the
//! next page is touched. Three pipelines are provided:
//!
//! - **text**: the page's text layer
//! - **inspect**: text layer, number of images and detected tables
//! - **ocr**: every page rendered with `pdftoppm` and read with `tesseract`
//!
//! ## Quick Start
//!
//! ```no_run
//! use slidescan::{pipeline, ExtractOptions};
//!
//! fn main() -> slidescan::Result<()> {
//!     let options = ExtractOptions::new().lenient();
//!     let stdout = std::io::stdout();
//!     pipeline::run_inspect("deck.pdf", &options, stdout.lock())?;
//!     Ok(())
//! }
//! ```
//!
//! Pages can also be read directly:
//!
//! ```no_run
//! use slidescan::PdfDocument;
//!
//! let doc = PdfDocument::open("deck.pdf")?;
//! for page in doc.pages() {
//!     println!("{}: {:?}", page.number(), page.extract_text()?);
//! }
//! # Ok::<(), slidescan::Error>(())
//! ```

pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod options;
pub mod pipeline;
pub mod present;
pub mod source;

mod tool;

pub use detect::{is_pdf, PdfHeader};
pub use error::{Error, Result};
pub use extract::{OcrEngine, TableDetectorConfig, TableStrategy, TesseractEngine, TextSpan};
pub use model::{ExtractionResult, OcrOutcome, PageRef, Table, TableRow};
pub use options::{ErrorMode, ExtractOptions, DEFAULT_DPI, DEFAULT_OCR_LANGUAGE};
pub use pipeline::{run_inspect, run_ocr, run_text, Variant};
pub use present::Presenter;
pub use source::{
    with_document, Page, PdfDocument, PdftoppmRasterizer, RasterPage, RasterizedDocument,
    Rasterizer,
};
