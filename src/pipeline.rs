//! The three extraction pipelines.
//!
//! Each one opens a source, walks its pages in order, extracts what the
//! variant asks for and prints it immediately. Nothing is retained between
//! pages.

use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::extract::{spans_to_text, OcrEngine, PageContent, Tables};
use crate::model::{ExtractionResult, OcrOutcome, PageRef};
use crate::options::{ErrorMode, ExtractOptions};
use crate::present::Presenter;
use crate::source::{with_document, Page, Rasterizer};

/// Which pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Text layer only
    Text,
    /// Text, image count and tables
    Inspect,
    /// Rasterize and OCR every page
    Ocr,
}

impl Variant {
    /// Extra line printed after a fatal error, if any.
    pub fn failure_hint(&self) -> Option<&'static str> {
        match self {
            Variant::Ocr => Some("Make sure Tesseract OCR is installed on your system."),
            Variant::Text | Variant::Inspect => None,
        }
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Variant::Text => "text",
            Variant::Inspect => "inspect",
            Variant::Ocr => "ocr",
        };
        f.write_str(name)
    }
}

/// Print the text layer of every page. Returns the number of pages.
pub fn run_text<P, W>(path: P, options: &ExtractOptions, out: W) -> Result<usize>
where
    P: AsRef<Path>,
    W: Write,
{
    with_document(path, |doc| {
        let mut presenter = Presenter::new(out, Variant::Text);
        presenter.document_header(doc.page_count())?;

        for page in doc.pages() {
            let text = recover(options.error_mode, &page, page.extract_text())?.flatten();
            presenter.page(&ExtractionResult::new(page.page_ref()).with_text(text))?;
        }

        presenter.into_inner()?;
        Ok(doc.page_count())
    })
}

/// Print text, image count and tables of every page. Returns the number
/// of pages.
pub fn run_inspect<P, W>(path: P, options: &ExtractOptions, out: W) -> Result<usize>
where
    P: AsRef<Path>,
    W: Write,
{
    with_document(path, |doc| {
        let mut presenter = Presenter::new(out, Variant::Inspect);
        presenter.document_header(doc.page_count())?;

        for page in doc.pages() {
            let content =
                recover(options.error_mode, &page, page.content())?.unwrap_or_default();
            presenter.page(&inspect_page(&page, &content, options))?;
        }

        presenter.into_inner()?;
        Ok(doc.page_count())
    })
}

fn inspect_page(
    page: &Page<'_>,
    content: &PageContent,
    options: &ExtractOptions,
) -> ExtractionResult {
    let tables: Vec<_> = Tables::detect(content, &options.table_config).collect();

    log::debug!(
        "Page {}: {} spans, {} images, {} tables",
        page.number(),
        content.spans.len(),
        content.image_count,
        tables.len()
    );

    ExtractionResult::new(page.page_ref())
        .with_text(spans_to_text(&content.spans))
        .with_image_count(content.image_count)
        .with_tables(tables)
}

/// Rasterize every page and print its OCR text. Returns the number of
/// pages.
///
/// Failing to rasterize is fatal; a page the engine fails on is reported
/// in place and the remaining pages still run.
pub fn run_ocr<P, R, E, W>(
    path: P,
    rasterizer: &R,
    engine: &E,
    options: &ExtractOptions,
    out: W,
) -> Result<usize>
where
    P: AsRef<Path>,
    R: Rasterizer + ?Sized,
    E: OcrEngine + ?Sized,
    W: Write,
{
    let mut presenter = Presenter::new(out, Variant::Ocr);
    presenter.rasterizing()?;

    let raster = rasterizer.rasterize(path.as_ref(), options.dpi)?;
    presenter.document_header(raster.page_count())?;

    for page in raster.pages() {
        let outcome = OcrOutcome::from_result(engine.recognize(page));
        if let OcrOutcome::Failed(message) = &outcome {
            log::warn!("OCR failed on page {}: {}", page.number(), message);
        }

        presenter.page(&ExtractionResult::new(PageRef::new(page.index)).with_ocr(outcome))?;
    }

    presenter.into_inner()?;
    Ok(raster.page_count())
}

/// Apply the error mode to a per-page extraction result. In lenient mode
/// a failure becomes `None`.
fn recover<T>(mode: ErrorMode, page: &Page<'_>, result: Result<T>) -> Result<Option<T>> {
    match (result, mode) {
        (Ok(value), _) => Ok(Some(value)),
        (Err(e), ErrorMode::Lenient) => {
            log::warn!("Skipping content of page {}: {}", page.number(), e);
            Ok(None)
        }
        (Err(e), ErrorMode::Strict) => Err(Error::TextExtract(format!(
            "page {}: {}",
            page.number(),
            e
        ))),
    }
}
