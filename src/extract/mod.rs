//! Per-page extractors.
//!
//! The structured extractors (text, tables, images) all start from one
//! interpretation of the page's content stream; see [`content`]. OCR works
//! on rasterized pages instead.

pub mod content;
pub mod ocr;
pub mod ruling;
pub mod table;
pub mod text;

pub use content::{PageContent, TextSpan};
pub use ocr::{OcrEngine, TesseractEngine};
pub use ruling::{Edge, Orientation};
pub use table::{TableDetectorConfig, TableStrategy, Tables};
pub use text::spans_to_text;
