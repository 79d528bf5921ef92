//! Page sources.
//!
//! A document is read either structurally, page by page through lopdf, or
//! as a sequence of rendered page images.

mod document;
mod raster;

pub use document::{with_document, Page, PdfDocument};
pub use raster::{PdftoppmRasterizer, RasterPage, RasterizedDocument, Rasterizer};
