//! Structured page source backed by lopdf.

use std::path::Path;

use lopdf::{Document as LopdfDocument, ObjectId};

use crate::detect::{self, PdfHeader};
use crate::error::{Error, Result};
use crate::extract::content::ContentWalker;
use crate::extract::{spans_to_text, PageContent, TableDetectorConfig, Tables};
use crate::model::PageRef;

/// An opened PDF document.
pub struct PdfDocument {
    doc: LopdfDocument,
    header: PdfHeader,
    page_ids: Vec<ObjectId>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("version", &self.header.version)
            .field("pages", &self.page_ids.len())
            .finish()
    }
}

impl PdfDocument {
    /// Open a PDF from a file path.
    ///
    /// Every failure, from a missing file to an encrypted document, is
    /// reported as [`Error::Open`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::open_inner(path).map_err(|e| Error::open(path, e))
    }

    fn open_inner(path: &Path) -> Result<Self> {
        let header = detect::sniff_path(path)?;
        let doc = LopdfDocument::load(path)?;
        let document = Self::from_lopdf(doc, header)?;
        log::info!(
            "Opened {} ({}, {} pages)",
            path.display(),
            document.header,
            document.page_count()
        );
        Ok(document)
    }

    /// Open a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = detect::sniff_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Self::from_lopdf(doc, header)
    }

    fn from_lopdf(doc: LopdfDocument, header: PdfHeader) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        // get_pages is keyed by page number, so values come out in order.
        let page_ids = doc.get_pages().into_values().collect();
        Ok(Self {
            doc,
            header,
            page_ids,
        })
    }

    /// PDF version from the header, e.g. "1.7".
    pub fn version(&self) -> &str {
        &self.header.version
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Get a page by 0-based index.
    pub fn page(&self, index: usize) -> Result<Page<'_>> {
        let id = *self
            .page_ids
            .get(index)
            .ok_or(Error::PageOutOfRange(index, self.page_ids.len()))?;
        Ok(Page {
            doc: &self.doc,
            id,
            page: PageRef::new(index),
        })
    }

    /// Pages in document order.
    pub fn pages(&self) -> impl ExactSizeIterator<Item = Page<'_>> + '_ {
        self.page_ids.iter().enumerate().map(|(index, &id)| Page {
            doc: &self.doc,
            id,
            page: PageRef::new(index),
        })
    }
}

/// Open `path`, hand the document to `f`, and release it when `f` returns.
pub fn with_document<P, T, F>(path: P, f: F) -> Result<T>
where
    P: AsRef<Path>,
    F: FnOnce(&PdfDocument) -> Result<T>,
{
    let doc = PdfDocument::open(path)?;
    f(&doc)
}

/// One page of an opened document.
#[derive(Clone, Copy)]
pub struct Page<'doc> {
    doc: &'doc LopdfDocument,
    id: ObjectId,
    page: PageRef,
}

impl std::fmt::Debug for Page<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("index", &self.page.index)
            .field("id", &self.id)
            .finish()
    }
}

impl<'doc> Page<'doc> {
    /// Position of this page in the document.
    pub fn page_ref(&self) -> PageRef {
        self.page
    }

    /// 0-based index.
    pub fn index(&self) -> usize {
        self.page.index
    }

    /// 1-based page number.
    pub fn number(&self) -> usize {
        self.page.number()
    }

    /// Interpret the page's content stream.
    ///
    /// The text, table and image extractors all derive from this; call it
    /// once and reuse the result when more than one is needed.
    pub fn content(&self) -> Result<PageContent> {
        ContentWalker::new(self.doc).walk_page(self.id)
    }

    /// Text layer content, `None` when the page has no text.
    pub fn extract_text(&self) -> Result<Option<String>> {
        Ok(spans_to_text(&self.content()?.spans))
    }

    /// Tables on the page, top to bottom.
    pub fn tables(&self, config: &TableDetectorConfig) -> Result<Tables> {
        Ok(Tables::detect(&self.content()?, config))
    }

    /// Number of image placements on the page.
    pub fn image_count(&self) -> Result<usize> {
        Ok(self.content()?.image_count)
    }
}
