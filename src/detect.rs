//! PDF header sniffing.
//!
//! Runs before lopdf gets the file so that "not a PDF at all" is reported
//! as such instead of as a parse error deep inside the xref table.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Header information from the start of a PDF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfHeader {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
    /// Byte offset of `%PDF-` (non-zero when the file has leading junk)
    pub offset: usize,
}

impl std::fmt::Display for PdfHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Readers accept the header anywhere in the first kilobyte.
const HEADER_WINDOW: usize = 1024;

/// Sniff the PDF header of a file.
///
/// # Example
/// ```no_run
/// use slidescan::detect::sniff_path;
///
/// let header = sniff_path("deck.pdf").unwrap();
/// println!("PDF version: {}", header.version);
/// ```
pub fn sniff_path<P: AsRef<Path>>(path: P) -> Result<PdfHeader> {
    let file = File::open(path)?;
    let mut window = Vec::with_capacity(HEADER_WINDOW);
    file.take(HEADER_WINDOW as u64).read_to_end(&mut window)?;
    sniff_bytes(&window)
}

/// Sniff the PDF header from the leading bytes of a document.
pub fn sniff_bytes(data: &[u8]) -> Result<PdfHeader> {
    let window = &data[..data.len().min(HEADER_WINDOW)];

    let offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let start = offset + PDF_MAGIC.len();
    let version_bytes = data
        .get(start..start + VERSION_LEN)
        .ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(PdfHeader { version, offset })
}

fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Check if a file looks like a PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    sniff_path(path).is_ok()
}
