//! Page-level types.

use super::Table;

/// Position of a page in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRef {
    /// 0-based position in the document
    pub index: usize,
}

impl PageRef {
    /// Create a reference from a 0-based index.
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// 1-based page number, as shown to users.
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// Outcome of running OCR on one rasterized page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    /// Recognized text (never whitespace-only)
    Text(String),
    /// The engine ran but found nothing
    NoText,
    /// The engine failed on this page
    Failed(String),
}

impl OcrOutcome {
    /// Classify the raw result of an OCR call.
    pub fn from_result(result: crate::Result<String>) -> Self {
        match result {
            Ok(text) if text.trim().is_empty() => OcrOutcome::NoText,
            Ok(text) => OcrOutcome::Text(text),
            Err(e) => OcrOutcome::Failed(e.to_string()),
        }
    }
}

/// Everything extracted from a single page.
///
/// Built once, printed once, dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Which page this is
    pub page: PageRef,

    /// Text layer content, `None` when the page has none
    pub text: Option<String>,

    /// Tables in top-to-bottom order
    pub tables: Vec<Table>,

    /// Number of image placements on the page
    pub image_count: usize,

    /// OCR result, only set on the raster path
    pub ocr: Option<OcrOutcome>,
}

impl ExtractionResult {
    /// Create an empty result for a page.
    pub fn new(page: PageRef) -> Self {
        Self {
            page,
            text: None,
            tables: Vec::new(),
            image_count: 0,
            ocr: None,
        }
    }

    /// Set the text layer content.
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.text = text;
        self
    }

    /// Set the tables.
    pub fn with_tables(mut self, tables: Vec<Table>) -> Self {
        self.tables = tables;
        self
    }

    /// Set the image count.
    pub fn with_image_count(mut self, count: usize) -> Self {
        self.image_count = count;
        self
    }

    /// Set the OCR outcome.
    pub fn with_ocr(mut self, outcome: OcrOutcome) -> Self {
        self.ocr = Some(outcome);
        self
    }

    /// 1-based page number.
    pub fn number(&self) -> usize {
        self.page.number()
    }

    /// Text layer content, treating empty text as absent.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}
