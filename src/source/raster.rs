//! Rasterized page source.
//!
//! Every page is rendered to a PNG at a fixed DPI. The text layer is
//! discarded; whatever the page shows is all that is left for OCR.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::detect;
use crate::error::{Error, Result};
use crate::tool;

/// One rasterized page on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterPage {
    /// 0-based page index
    pub index: usize,
    /// PNG file holding the page image
    pub path: PathBuf,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Resolution the page was rendered at
    pub dpi: u32,
}

impl RasterPage {
    /// 1-based page number.
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// All pages of a document as images.
///
/// Owns the temporary directory the images live in, if any; dropping the
/// document deletes them.
#[derive(Debug)]
pub struct RasterizedDocument {
    pages: Vec<RasterPage>,
    _dir: Option<TempDir>,
}

impl RasterizedDocument {
    /// Wrap rendered pages, taking ownership of their directory.
    pub fn new(dir: Option<TempDir>, pages: Vec<RasterPage>) -> Self {
        Self { pages, _dir: dir }
    }

    /// Number of rendered pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages in document order.
    pub fn pages(&self) -> impl ExactSizeIterator<Item = &RasterPage> {
        self.pages.iter()
    }
}

/// Renders a PDF to page images.
pub trait Rasterizer {
    /// Render every page of `path` at `dpi`.
    fn rasterize(&self, path: &Path, dpi: u32) -> Result<RasterizedDocument>;
}

impl<R: Rasterizer + ?Sized> Rasterizer for &R {
    fn rasterize(&self, path: &Path, dpi: u32) -> Result<RasterizedDocument> {
        (**self).rasterize(path, dpi)
    }
}

/// Rasterizer backed by poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    command: PathBuf,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            command: PathBuf::from("pdftoppm"),
        }
    }
}

impl PdftoppmRasterizer {
    /// Use `pdftoppm` from PATH.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `pdftoppm` binary.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, path: &Path, dpi: u32) -> Result<RasterizedDocument> {
        // pdftoppm's own errors for a bad input are terse; check first so a
        // missing or non-PDF file reads the same as on the structured path.
        detect::sniff_path(path).map_err(|e| Error::open(path, e))?;

        let dir = tempfile::Builder::new().prefix("slidescan-").tempdir()?;
        let prefix = dir.path().join("page");

        let output = tool::run(
            Command::new(&self.command)
                .arg("-png")
                .arg("-r")
                .arg(dpi.to_string())
                .arg(path)
                .arg(&prefix),
        )?;

        if !output.status.success() {
            return Err(Error::Rasterize(tool::failure_message(&output)));
        }

        let files = collect_pages(dir.path())?;
        if files.is_empty() {
            return Err(Error::Rasterize("no pages were rendered".to_string()));
        }

        let mut pages = Vec::with_capacity(files.len());
        for (index, file) in files.into_iter().enumerate() {
            let (width, height) = image::image_dimensions(&file)
                .map_err(|e| Error::Rasterize(format!("{}: {}", file.display(), e)))?;
            pages.push(RasterPage {
                index,
                path: file,
                width,
                height,
                dpi,
            });
        }

        log::info!("Rasterized {} pages at {} DPI", pages.len(), dpi);
        Ok(RasterizedDocument::new(Some(dir), pages))
    }
}

/// PNG files in `dir`, ordered by the page number pdftoppm appends.
///
/// pdftoppm zero-pads to the width of the largest page number, so a
/// lexical sort would usually work; sorting numerically does not depend
/// on it.
fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut numbered = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        match page_suffix(&path) {
            Some(n) => numbered.push((n, path)),
            None => log::debug!("Ignoring unexpected file {}", path.display()),
        }
    }

    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}

/// `page-07.png` -> 7
fn page_suffix(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let (_, digits) = stem.rsplit_once('-')?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_suffix() {
        assert_eq!(page_suffix(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_suffix(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(page_suffix(Path::new("/tmp/x/cover.png")), None);
    }

    #[test]
    fn test_collect_pages_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let pages = collect_pages(dir.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
    }

    #[test]
    fn test_missing_input_is_open_error() {
        let rasterizer = PdftoppmRasterizer::with_command("slidescan-no-such-pdftoppm");
        let err = rasterizer
            .rasterize(Path::new("/nonexistent/deck.pdf"), 150)
            .unwrap_err();
        assert!(err.is_open_error());
    }

    #[test]
    fn test_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("deck.pdf");
        fs::write(&pdf, b"%PDF-1.4\n%%EOF\n").unwrap();

        let rasterizer = PdftoppmRasterizer::with_command("slidescan-no-such-pdftoppm");
        let err = rasterizer.rasterize(&pdf, 150).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }

    #[test]
    fn test_rasterized_document_drop_removes_images() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let doc = RasterizedDocument::new(Some(dir), Vec::new());
        assert_eq!(doc.page_count(), 0);
        drop(doc);
        assert!(!root.exists());
    }
}
