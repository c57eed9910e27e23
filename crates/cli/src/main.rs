//! CLI tool for converting PDF files into editable PowerPoint presentations.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2ppt_core::{
    output_file_name, CancellationToken, ConversionOptions, Converter, DocumentSource,
    PageExtraction, PageRasterizer, Progress, RgbColor,
};
use pdf2ppt_core::{Error as ConvertError, OutputMode};
use pdf2ppt_pdf::PdfDocument;
use pdf2ppt_pptx::PptxWriter;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Convert PDF pages into PowerPoint slides with editable text.
#[derive(Parser, Debug)]
#[command(name = "pdf2ppt")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF file(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Output directory (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Slide mode: hybrid, image or clean
    #[arg(short, long)]
    mode: Option<OutputMode>,

    /// Pixels per point for full-page renders
    #[arg(long)]
    scale: Option<f64>,

    /// Pixels per point for cropped images (clean mode)
    #[arg(long)]
    image_scale: Option<f64>,

    /// JPEG quality for page renders (1-100)
    #[arg(long)]
    quality: Option<u8>,

    /// Slide background color as RRGGBB
    #[arg(long, value_parser = parse_color)]
    background: Option<RgbColor>,

    /// JSON file with conversion options; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print each page's extracted lines and images as JSON instead of writing a presentation
    #[arg(long)]
    dump_json: bool,

    /// Cancel a file's conversion after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_color(value: &str) -> std::result::Result<RgbColor, String> {
    RgbColor::from_hex(value).ok_or_else(|| format!("'{}' is not an RRGGBB color", value))
}

/// What happened to one input file.
#[derive(Debug, PartialEq)]
enum Outcome {
    Written(PathBuf),
    Dumped,
    Cancelled,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let options = load_options(&args)?;
    options.validate()?;
    let converter = Converter::new(options);

    let mut failures = 0;
    for input_path in &args.input {
        if args.verbose {
            eprintln!("Processing: {}", input_path.display());
        }

        match process_file(input_path, &args, &converter) {
            Ok(Outcome::Written(path)) => eprintln!("Written to: {}", path.display()),
            Ok(Outcome::Dumped) => {}
            Ok(Outcome::Cancelled) => {
                eprintln!("Cancelled: {} (nothing written)", input_path.display());
            }
            Err(e) => {
                failures += 1;
                eprintln!("Error processing {}: {:#}", input_path.display(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files failed", failures, args.input.len());
    }
    Ok(())
}

/// Options from `--config` (or defaults) with command-line flags applied on top.
fn load_options(args: &Args) -> Result<ConversionOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ConversionOptions::default(),
    };

    if let Some(mode) = args.mode {
        options = options.with_mode(mode);
    }
    if let Some(scale) = args.scale {
        options = options.with_render_scale(scale);
    }
    if let Some(scale) = args.image_scale {
        options = options.with_image_scale(scale);
    }
    if let Some(quality) = args.quality {
        options = options.with_jpeg_quality(quality);
    }
    if let Some(color) = args.background {
        options = options.with_background_color(color);
    }
    Ok(options)
}

/// Convert a single PDF file.
fn process_file(input_path: &Path, args: &Args, converter: &Converter) -> Result<Outcome> {
    let bytes = std::fs::read(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;
    let source = PdfDocument::from_bytes(&bytes)
        .with_context(|| format!("Failed to parse {}", input_path.display()))?;
    let rasterizer = create_rasterizer(bytes);
    let rasterizer = rasterizer.as_ref().map(|r| r as &dyn PageRasterizer);

    let cancel = CancellationToken::new();
    if let Some(seconds) = args.timeout {
        start_watchdog(cancel.clone(), Duration::from_secs(seconds));
    }

    if args.dump_json {
        return match dump_json(&source, rasterizer, converter, &cancel) {
            Ok(()) => Ok(Outcome::Dumped),
            Err(e) if e.is_cancelled() => Ok(Outcome::Cancelled),
            Err(e) => Err(e.into()),
        };
    }

    let writer = match input_path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => PptxWriter::new().with_title(stem),
        None => PptxWriter::new(),
    };
    let verbose = args.verbose;
    let mut report = |event: Progress| report_progress(event, verbose);

    let pptx = match converter.convert_to_bytes(&source, rasterizer, &writer, &cancel, &mut report) {
        Ok(pptx) => pptx,
        Err(e) if e.is_cancelled() => return Ok(Outcome::Cancelled),
        Err(e) => return Err(e.into()),
    };

    let output_path = get_output_path(input_path, args.output.as_ref())?;
    write_output(&output_path, &pptx)?;
    Ok(Outcome::Written(output_path))
}

#[cfg(feature = "pdfium")]
fn create_rasterizer(bytes: Vec<u8>) -> Option<pdf2ppt_pdf::PdfiumRasterizer> {
    match pdf2ppt_pdf::PdfiumRasterizer::new(bytes) {
        Ok(rasterizer) => Some(rasterizer),
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    }
}

#[cfg(not(feature = "pdfium"))]
fn create_rasterizer(_bytes: Vec<u8>) -> Option<NoRasterizer> {
    log::debug!("Built without pdfium; pages cannot be rendered");
    None
}

/// Stand-in type so both builds share one code path.
#[cfg(not(feature = "pdfium"))]
enum NoRasterizer {}

#[cfg(not(feature = "pdfium"))]
impl PageRasterizer for NoRasterizer {
    fn render_page(&self, _index: usize, _scale: f64) -> pdf2ppt_core::Result<pdf2ppt_core::PageRaster> {
        match *self {}
    }
}

/// Cancel `token` once `budget` has elapsed.
fn start_watchdog(token: CancellationToken, budget: Duration) {
    std::thread::spawn(move || {
        std::thread::sleep(budget);
        if !token.is_cancelled() {
            log::warn!("Timed out after {}s; cancelling", budget.as_secs());
            token.cancel();
        }
    });
}

fn report_progress(event: Progress, verbose: bool) {
    if !verbose {
        return;
    }
    match event {
        Progress::Started { pages } => eprintln!("  {} pages", pages),
        Progress::Page {
            number,
            total,
            stage,
            percent,
        } => eprintln!("  [{:>3}%] page {}/{}: {:?}", percent, number, total, stage),
        Progress::Finished { slides } => eprintln!("  Built {} slides", slides),
    }
}

/// Print the extraction of every page as a JSON array.
fn dump_json(
    source: &dyn DocumentSource,
    rasterizer: Option<&dyn PageRasterizer>,
    converter: &Converter,
    cancel: &CancellationToken,
) -> pdf2ppt_core::Result<()> {
    let scale = converter.options().image_scale;
    let mut pages: Vec<PageExtraction> = Vec::with_capacity(source.page_count());
    for index in 0..source.page_count() {
        if cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        let raster = match rasterizer {
            Some(r) => Some(r.render_page(index, scale)?),
            None => None,
        };
        pages.push(converter.extract_page(source, index, raster.as_ref())?);
    }

    let json = serde_json::to_string_pretty(&pages)
        .map_err(|e| ConvertError::IoError(std::io::Error::other(e)))?;
    println!("{}", json);
    Ok(())
}

/// Determine the output path for a processed file.
fn get_output_path(input_path: &Path, output_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let output_filename = output_file_name(input_path);

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => {
            if let Some(parent) = input_path.parent() {
                parent.join(output_filename)
            } else {
                PathBuf::from(output_filename)
            }
        }
    };

    Ok(output_path)
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let dir = std::env::temp_dir().join(format!("pdf2ppt-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = dir.join("options.json");
        std::fs::write(&config, r#"{"mode": "clean", "jpeg_quality": 80, "render_scale": 2.0}"#)
            .unwrap();

        let args = Args::try_parse_from([
            "pdf2ppt",
            "in.pdf",
            "--config",
            config.to_str().unwrap(),
            "--quality",
            "60",
            "--background",
            "#102030",
        ])
        .unwrap();
        let options = load_options(&args).unwrap();

        assert_eq!(options.mode, OutputMode::Clean);
        assert_eq!(options.jpeg_quality, 60);
        assert_eq!(options.render_scale, 2.0);
        assert_eq!(options.image_scale, 2.5);
        assert_eq!(options.background_color, RgbColor::new(0x10, 0x20, 0x30));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_mode_and_color_parsing() {
        let args = Args::try_parse_from(["pdf2ppt", "-m", "image", "a.pdf", "b.pdf"]).unwrap();
        assert_eq!(args.mode, Some(OutputMode::ImageOnly));
        assert_eq!(args.input.len(), 2);

        assert!(Args::try_parse_from(["pdf2ppt", "-m", "slides", "a.pdf"]).is_err());
        assert!(Args::try_parse_from(["pdf2ppt", "--background", "red", "a.pdf"]).is_err());
        assert!(Args::try_parse_from(["pdf2ppt"]).is_err());
    }

    #[test]
    fn test_output_path() {
        let dir = std::env::temp_dir().join(format!("pdf2ppt-out-{}", std::process::id()));
        let path = get_output_path(Path::new("/docs/Deck.PDF"), Some(&dir)).unwrap();
        assert_eq!(path, dir.join("Deck.pptx"));
        assert_eq!(
            get_output_path(Path::new("/docs/report.pdf"), None).unwrap(),
            PathBuf::from("/docs/report.pptx")
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
