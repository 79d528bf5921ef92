//! Plain-text presentation of extraction results.
//!
//! The output is meant for a human reading a terminal, or for piping into
//! another tool that expects exactly this layout, so every byte here is
//! deliberate.

use std::io::Write;

use crate::error::Result;
use crate::model::{ExtractionResult, OcrOutcome, TableRow};
use crate::pipeline::Variant;

/// Writes page results for one variant.
pub struct Presenter<W: Write> {
    out: W,
    variant: Variant,
}

impl<W: Write> Presenter<W> {
    /// Create a presenter writing to `out`.
    pub fn new(out: W, variant: Variant) -> Self {
        Self { out, variant }
    }

    /// Announce that rasterization is starting (OCR only).
    pub fn rasterizing(&mut self) -> Result<()> {
        writeln!(self.out, "Converting PDF to images...")?;
        Ok(())
    }

    /// Write the page count line that precedes all pages.
    pub fn document_header(&mut self, page_count: usize) -> Result<()> {
        match self.variant {
            Variant::Text | Variant::Inspect => {
                write!(self.out, "Total pages: {}\n\n", page_count)?
            }
            Variant::Ocr => write!(self.out, "Total pages converted: {}\n\n", page_count)?,
        }
        Ok(())
    }

    /// Write one page.
    pub fn page(&mut self, result: &ExtractionResult) -> Result<()> {
        match self.variant {
            Variant::Text => self.text_page(result),
            Variant::Inspect => self.inspect_page(result),
            Variant::Ocr => self.ocr_page(result),
        }
    }

    /// Flush and return the writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }

    fn text_page(&mut self, result: &ExtractionResult) -> Result<()> {
        writeln!(self.out, "=== SLIDE {} ===", result.number())?;
        write!(self.out, "{}\n\n\n", result.text().unwrap_or(""))?;
        Ok(())
    }

    fn inspect_page(&mut self, result: &ExtractionResult) -> Result<()> {
        write!(self.out, "\n=== SLIDE {} ===\n", result.number())?;

        if let Some(text) = result.text() {
            write!(self.out, "TEXT:\n{}\n", text)?;
        }

        if result.image_count > 0 {
            writeln!(self.out, "Images found: {}", result.image_count)?;
        }

        if !result.tables.is_empty() {
            writeln!(self.out, "Tables found: {}", result.tables.len())?;
            for (j, table) in result.tables.iter().enumerate() {
                writeln!(self.out, "Table {}:", j + 1)?;
                for row in &table.rows {
                    writeln!(self.out, "{}", row_literal(row))?;
                }
            }
        }

        Ok(())
    }

    fn ocr_page(&mut self, result: &ExtractionResult) -> Result<()> {
        write!(self.out, "\n=== SLIDE {} ===\n", result.number())?;

        match &result.ocr {
            Some(OcrOutcome::Text(text)) => writeln!(self.out, "{}", text)?,
            Some(OcrOutcome::Failed(message)) => writeln!(self.out, "OCR Error: {}", message)?,
            Some(OcrOutcome::NoText) | None => writeln!(self.out, "[No text detected]")?,
        }

        Ok(())
    }
}

/// Render a row as a bracketed list literal: `['Quartz', None, '7']`.
pub fn row_literal(row: &TableRow) -> String {
    let cells: Vec<String> = row
        .cells
        .iter()
        .map(|cell| match cell {
            Some(text) => quote(text),
            None => "None".to_string(),
        })
        .collect();
    format!("[{}]", cells.join(", "))
}

/// Quote a string, preferring single quotes unless the text contains one
/// and no double quote.
fn quote(text: &str) -> String {
    let delim = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(delim);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if is_printable(c) => out.push(c),
            c => {
                let code = c as u32;
                let escaped = if code < 0x100 {
                    format!("\\x{:02x}", code)
                } else if code < 0x10000 {
                    format!("\\u{:04x}", code)
                } else {
                    format!("\\U{:08x}", code)
                };
                out.push_str(&escaped);
            }
        }
    }
    out.push(delim);
    out
}

/// Printable in the Python `str.isprintable` sense: not a control, format,
/// private-use or separator character, except the ASCII space.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() {
        return false;
    }
    !matches!(
        c as u32,
        // Space and line/paragraph separators
        0x00A0 | 0x1680 | 0x2000..=0x200A | 0x2028 | 0x2029 | 0x202F | 0x205F | 0x3000
        // Format characters
        | 0x00AD | 0x0600..=0x0605 | 0x061C | 0x06DD | 0x070F | 0x0890 | 0x0891 | 0x08E2
        | 0x180E | 0x200B..=0x200F | 0x202A..=0x202E | 0x2060..=0x2064 | 0x2066..=0x206F
        | 0xFEFF | 0xFFF9..=0xFFFB | 0x110BD | 0x110CD | 0x13430..=0x1343F
        | 0x1BCA0..=0x1BCA3 | 0x1D173..=0x1D17A | 0xE0001 | 0xE0020..=0xE007F
        // Surrogates cannot occur in a char; private use and noncharacters
        | 0xE000..=0xF8FF | 0xF0000..=0x10FFFF | 0xFDD0..=0xFDEF | 0xFFFE | 0xFFFF
    )
}
