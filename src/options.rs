//! Extraction options and configuration.

use crate::extract::TableDetectorConfig;

/// Default rasterization resolution for the OCR path.
pub const DEFAULT_DPI: u32 = 150;

/// Default Tesseract language.
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Options for running a slide extraction pipeline.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// How per-page structured extraction failures are handled
    pub error_mode: ErrorMode,

    /// Raster resolution in dots per inch (OCR path)
    pub dpi: u32,

    /// Tesseract language code(s), e.g. "eng" or "eng+deu"
    pub ocr_language: String,

    /// Table detector thresholds
    pub table_config: TableDetectorConfig,
}

impl ExtractOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (log and skip broken page content).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set raster resolution. Zero falls back to the default.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = if dpi == 0 { DEFAULT_DPI } else { dpi };
        self
    }

    /// Set the OCR language.
    pub fn with_ocr_language(mut self, language: impl Into<String>) -> Self {
        self.ocr_language = language.into();
        self
    }

    /// Set table detector thresholds.
    pub fn with_table_config(mut self, config: TableDetectorConfig) -> Self {
        self.table_config = config;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            dpi: DEFAULT_DPI,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            table_config: TableDetectorConfig::default(),
        }
    }
}

/// Error handling mode for per-page text, table and image extraction.
///
/// OCR failures are always reported inline regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail the run on the first broken page
    #[default]
    Strict,
    /// Log a warning and treat the page's content as absent
    Lenient,
}
