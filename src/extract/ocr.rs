//! OCR over rasterized pages.

use std::path::PathBuf;
use std::process::Command;

use crate::error::{Error, Result};
use crate::options::{ExtractOptions, DEFAULT_OCR_LANGUAGE};
use crate::source::RasterPage;
use crate::tool;

/// Recognizes text in a page image.
pub trait OcrEngine {
    /// Run OCR on one page and return the raw recognized text.
    fn recognize(&self, page: &RasterPage) -> Result<String>;
}

impl<E: OcrEngine + ?Sized> OcrEngine for &E {
    fn recognize(&self, page: &RasterPage) -> Result<String> {
        (**self).recognize(page)
    }
}

/// OCR engine that shells out to the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: PathBuf,
    language: String,
    psm: Option<u8>,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self {
            command: PathBuf::from("tesseract"),
            language: DEFAULT_OCR_LANGUAGE.to_string(),
            psm: None,
        }
    }
}

impl TesseractEngine {
    /// Use `tesseract` from PATH with English.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `tesseract` from PATH with the language from `options`.
    pub fn from_options(options: &ExtractOptions) -> Self {
        Self::new().with_language(options.ocr_language.clone())
    }

    /// Use a specific `tesseract` binary.
    pub fn with_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.command = command.into();
        self
    }

    /// Set the language(s), e.g. "eng+deu".
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the page segmentation mode.
    pub fn with_psm(mut self, psm: Option<u8>) -> Self {
        self.psm = psm;
        self
    }

    fn command_for(&self, page: &RasterPage) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg(&page.path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language);
        if let Some(psm) = self.psm {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, page: &RasterPage) -> Result<String> {
        let output = tool::run(&mut self.command_for(page))?;

        if !output.status.success() {
            return Err(Error::Ocr(tool::failure_message(&output)));
        }

        // Tesseract reports things like "Estimating resolution" on stderr
        // even when it succeeds.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log::debug!("tesseract on page {}: {}", page.number(), stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> RasterPage {
        RasterPage {
            index: 0,
            path: PathBuf::from("/tmp/page-1.png"),
            width: 1275,
            height: 1650,
            dpi: 150,
        }
    }

    #[test]
    fn test_command_line() {
        let engine = TesseractEngine::new().with_language("eng+deu").with_psm(Some(6));
        let cmd = engine.command_for(&page());

        assert_eq!(cmd.get_program(), "tesseract");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["/tmp/page-1.png", "stdout", "-l", "eng+deu", "--psm", "6"]
        );
    }

    #[test]
    fn test_language_from_options() {
        let options = ExtractOptions::new().with_ocr_language("fra");
        let cmd = TesseractEngine::from_options(&options).command_for(&page());
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["/tmp/page-1.png", "stdout", "-l", "fra"]);

        let cmd = TesseractEngine::from_options(&ExtractOptions::default()).command_for(&page());
        assert!(cmd.get_args().any(|a| a == DEFAULT_OCR_LANGUAGE));
    }

    #[test]
    fn test_missing_binary() {
        let engine = TesseractEngine::new().with_command("slidescan-no-such-tesseract");
        let err = engine.recognize(&page()).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }
}
