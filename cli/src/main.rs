//! slidescan CLI - dump a PDF slide deck page by page

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use slidescan::{
    ExtractOptions, PdftoppmRasterizer, RasterizedDocument, Rasterizer, TableDetectorConfig,
    TableStrategy, TesseractEngine, Variant, DEFAULT_DPI, DEFAULT_OCR_LANGUAGE,
};

#[derive(Parser, Debug)]
#[command(name = "slidescan")]
#[command(version)]
#[command(about = "Print the text, tables and images of a PDF slide deck, one slide at a time", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the text layer of every slide
    Text(StructuredArgs),

    /// Print text, image count and tables of every slide
    Inspect(StructuredArgs),

    /// Render every slide to an image and OCR it
    Ocr(OcrArgs),
}

#[derive(Args, Debug)]
struct StructuredArgs {
    /// Input PDF file
    #[arg(value_name = "FILE", env = "SLIDESCAN_INPUT")]
    input: PathBuf,

    /// Skip slides whose content cannot be read instead of failing
    #[arg(long)]
    lenient: bool,

    /// Find tables by text alignment instead of ruling lines
    #[arg(long)]
    text_tables: bool,
}

#[derive(Args, Debug)]
struct OcrArgs {
    /// Input PDF file
    #[arg(value_name = "FILE", env = "SLIDESCAN_INPUT")]
    input: PathBuf,

    /// Rendering resolution
    #[arg(long, env = "SLIDESCAN_DPI", default_value_t = DEFAULT_DPI)]
    dpi: u32,

    /// Tesseract language(s), e.g. "eng+deu"
    #[arg(long, env = "SLIDESCAN_OCR_LANG", default_value = DEFAULT_OCR_LANGUAGE)]
    lang: String,

    /// Tesseract page segmentation mode
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=13))]
    psm: Option<u8>,

    /// tesseract binary
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract: PathBuf,

    /// pdftoppm binary
    #[arg(long, env = "PDFTOPPM_CMD", default_value = "pdftoppm")]
    pdftoppm: PathBuf,
}

impl Commands {
    fn variant(&self) -> Variant {
        match self {
            Commands::Text(_) => Variant::Text,
            Commands::Inspect(_) => Variant::Inspect,
            Commands::Ocr(_) => Variant::Ocr,
        }
    }
}

impl StructuredArgs {
    fn options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::new();
        if self.text_tables {
            options =
                options.with_table_config(TableDetectorConfig::with_strategy(TableStrategy::Text));
        }
        if self.lenient {
            options.lenient()
        } else {
            options
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let variant = cli.command.variant();

    let result = match cli.command {
        Commands::Text(args) => cmd_text(&args),
        Commands::Inspect(args) => cmd_inspect(&args),
        Commands::Ocr(args) => cmd_ocr(&args),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        if let Some(hint) = variant.failure_hint() {
            eprintln!("{}", hint.yellow());
        }
        std::process::exit(1);
    }
}

fn cmd_text(args: &StructuredArgs) -> slidescan::Result<()> {
    let stdout = io::stdout();
    let pages = slidescan::run_text(&args.input, &args.options(), stdout.lock())?;
    log::info!("Printed {} slides", pages);
    Ok(())
}

fn cmd_inspect(args: &StructuredArgs) -> slidescan::Result<()> {
    let stdout = io::stdout();
    let pages = slidescan::run_inspect(&args.input, &args.options(), stdout.lock())?;
    log::info!("Inspected {} slides", pages);
    Ok(())
}

fn cmd_ocr(args: &OcrArgs) -> slidescan::Result<()> {
    let options = ExtractOptions::new()
        .with_dpi(args.dpi)
        .with_ocr_language(&args.lang);

    let rasterizer = SpinnerRasterizer(PdftoppmRasterizer::with_command(&args.pdftoppm));
    let engine = TesseractEngine::from_options(&options)
        .with_command(&args.tesseract)
        .with_psm(args.psm);

    let stdout = io::stdout();
    let pages = slidescan::run_ocr(&args.input, &rasterizer, &engine, &options, stdout.lock())?;
    log::info!("OCR'd {} slides", pages);
    Ok(())
}

/// Shows a spinner on stderr while pages are being rendered.
struct SpinnerRasterizer<R>(R);

impl<R: Rasterizer> Rasterizer for SpinnerRasterizer<R> {
    fn rasterize(&self, path: &Path, dpi: u32) -> slidescan::Result<RasterizedDocument> {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Rendering pages at {} DPI...", dpi));
        pb.enable_steady_tick(Duration::from_millis(100));

        let result = self.0.rasterize(path, dpi);
        pb.finish_and_clear();
        result
    }
}
