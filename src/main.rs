use clap::{Parser, ValueEnum};
use img2arc::output::{gcode, svg};
use img2arc::{FitterKind, ThresholdMethod, TracingConfig};
use std::path::PathBuf;

#[derive(Clone, Copy, ValueEnum)]
enum Fitter {
    /// Greedy split, breakpoint refinement, merge
    CutPoint,
    /// Node/sagitta gradient descent
    Gradient,
}

#[derive(Parser)]
#[command(name = "img2arc", about = "Thin line-art bitmaps to lines and circular arcs")]
struct Cli {
    /// Input image path (PNG, JPEG, BMP), already thinned to one-pixel strokes
    input: PathBuf,

    /// Raw (pre-thinning) stroke image; fits are also scored against it
    #[arg(long)]
    raw: Option<PathBuf>,

    /// Write an SVG document
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write a G-code program
    #[arg(long)]
    gcode: Option<PathBuf>,

    /// Write the full trace result as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write a PNG preview of the fit over the mask
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Tracing preset (JSON); command-line flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum residual in pixels before a span is split
    #[arg(long)]
    max_error: Option<f64>,

    /// Minimum span length in points
    #[arg(long)]
    min_length: Option<usize>,

    /// Per-primitive merge penalty (squared pixels)
    #[arg(long)]
    penalty: Option<f64>,

    /// Curvature threshold for corners (radians per pixel)
    #[arg(long)]
    corner_threshold: Option<f64>,

    /// Chain optimizer
    #[arg(long, value_enum)]
    fitter: Option<Fitter>,

    /// Fixed brightness threshold (0-255). Overrides Otsu auto-detection.
    #[arg(long)]
    threshold: Option<u8>,

    /// Invert the image before tracing
    #[arg(long)]
    invert: bool,

    /// G-code units per pixel
    #[arg(long, default_value = "1.0")]
    scale: f64,

    /// G-code feed rate
    #[arg(long)]
    feed: Option<f64>,

    /// SVG stroke width in pixels
    #[arg(long, default_value = "0.5")]
    stroke_width: f64,

    /// Preview pixels per mask pixel
    #[arg(long, default_value = "8")]
    cell: u32,
}

impl Cli {
    fn tracing_config(&self) -> Result<TracingConfig, img2arc::TraceError> {
        let mut config = match &self.config {
            Some(path) => TracingConfig::from_json_file(path)?,
            None => TracingConfig::default(),
        };
        if let Some(v) = self.max_error {
            config.max_segment_error = v;
        }
        if let Some(v) = self.min_length {
            config.min_segment_length = v;
        }
        if let Some(v) = self.penalty {
            config.segment_penalty = v;
        }
        if let Some(v) = self.corner_threshold {
            config.curvature_threshold = v;
        }
        if let Some(f) = self.fitter {
            config.fitter = match f {
                Fitter::CutPoint => FitterKind::CutPoint,
                Fitter::Gradient => FitterKind::Gradient,
            };
        }
        if let Some(t) = self.threshold {
            config.threshold = ThresholdMethod::Fixed(t);
        }
        config.invert |= self.invert;
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.tracing_config()?;

    let mask = img2arc::load_mask(&cli.input, &config)?;
    let raw = cli
        .raw
        .as_deref()
        .map(|path| img2arc::load_mask(path, &config))
        .transpose()?;
    let result = img2arc::trace_mask_with_raw(&mask, raw.as_ref(), &config)?;
    if result.paths.is_empty() {
        return Err(img2arc::TraceError::NoPaths.into());
    }

    let (lines, arcs, corners) = result.counts();
    eprintln!(
        "  img2arc \u{00b7} {} paths, {} lines, {} arcs, {} corners",
        result.paths.len(),
        lines,
        arcs,
        corners
    );

    if let Some(path) = &cli.svg {
        std::fs::write(path, svg::document(&result, cli.stroke_width))?;
        eprintln!("  \u{2713} {}", path.display());
    }
    if let Some(path) = &cli.gcode {
        let options = gcode::GcodeOptions {
            scale: cli.scale,
            feed_rate: cli.feed,
        };
        std::fs::write(path, gcode::program(&result, &options))?;
        eprintln!("  \u{2713} {}", path.display());
    }
    if let Some(path) = &cli.json {
        std::fs::write(path, serde_json::to_string_pretty(&result)?)?;
        eprintln!("  \u{2713} {}", path.display());
    }
    if let Some(path) = &cli.preview {
        write_preview(&mask, &result, cli.cell, path)?;
    }

    Ok(())
}

#[cfg(feature = "render")]
fn write_preview(
    mask: &img2arc::PixelMask,
    result: &img2arc::TraceResult,
    cell: u32,
    path: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    img2arc::render::write_preview(mask, result, cell, path)?;
    eprintln!("  \u{2713} {}", path.display());
    Ok(())
}

#[cfg(not(feature = "render"))]
fn write_preview(
    _mask: &img2arc::PixelMask,
    _result: &img2arc::TraceResult,
    _cell: u32,
    _path: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("preview output needs the `render` feature".into())
}
