//! Per-page extraction model.
//!
//! These types only live long enough to be printed: a page is extracted
//! into an [`ExtractionResult`], handed to the presenter, and dropped.

mod page;
mod table;

pub use page::{ExtractionResult, OcrOutcome, PageRef};
pub use table::{Table, TableRow};
