//! Raster preview of a trace for visual inspection.
//!
//! Mask pixels are drawn as grey cells, fitted primitives are stroked on
//! top via tiny-skia (lines and arcs in red, corner polylines in blue) and
//! corners are marked with dots. The result is written as a PNG.

use std::path::Path;

use kurbo::{BezPath, PathEl, Point};

use crate::corners::CornerKind;
use crate::error::TraceError;
use crate::mask::PixelMask;
use crate::output::to_bezpath;
use crate::segment::Segment;
use crate::{TraceResult, TracedPath};

/// Largest preview edge in pixels; the cell size shrinks to stay under it.
const MAX_PREVIEW_SIZE: u32 = 4096;

/// Convert a kurbo `BezPath` in mask coordinates to a `tiny_skia::Path`
/// in preview coordinates.
fn to_skia_path(bezpath: &BezPath, cell: f32) -> Option<tiny_skia::Path> {
    let map = |p: Point| ((p.x as f32 + 0.5) * cell, (p.y as f32 + 0.5) * cell);
    let mut pb = tiny_skia::PathBuilder::new();
    for el in bezpath.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                let (x, y) = map(p);
                pb.move_to(x, y);
            }
            PathEl::LineTo(p) => {
                let (x, y) = map(p);
                pb.line_to(x, y);
            }
            PathEl::QuadTo(c, p) => {
                let (cx, cy) = map(c);
                let (px, py) = map(p);
                pb.quad_to(cx, cy, px, py);
            }
            PathEl::CurveTo(c1, c2, p) => {
                let (c1x, c1y) = map(c1);
                let (c2x, c2y) = map(c2);
                let (px, py) = map(p);
                pb.cubic_to(c1x, c1y, c2x, c2y, px, py);
            }
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

/// Encode a pixmap to PNG bytes.
fn encode_png(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, TraceError> {
    let to_io = |e: png::EncodingError| std::io::Error::new(std::io::ErrorKind::Other, e);
    let mut buf = Vec::new();
    let mut encoder = png::Encoder::new(&mut buf, pixmap.width(), pixmap.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(to_io)?;
    writer.write_image_data(pixmap.data()).map_err(to_io)?;
    writer.finish().map_err(to_io)?;
    Ok(buf)
}

fn paint(r: u8, g: u8, b: u8) -> tiny_skia::Paint<'static> {
    let mut paint = tiny_skia::Paint::default();
    paint.set_color(tiny_skia::Color::from_rgba8(r, g, b, 255));
    paint.anti_alias = true;
    paint
}

/// Render `result` over `mask` with `cell` preview pixels per mask pixel.
pub fn render_preview(
    mask: &PixelMask,
    result: &TraceResult,
    cell: u32,
) -> Result<tiny_skia::Pixmap, TraceError> {
    let longest = mask.width().max(mask.height()).max(1);
    let cell = cell.clamp(1, (MAX_PREVIEW_SIZE / longest).max(1));
    let (w, h) = (mask.width() * cell, mask.height() * cell);
    let mut pixmap = tiny_skia::Pixmap::new(w.max(1), h.max(1))
        .ok_or_else(|| TraceError::InvalidMask(format!("cannot render a {w}x{h} preview")))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let grey = paint(215, 215, 215);
    for (x, y) in mask.iter_foreground() {
        if let Some(rect) = tiny_skia::Rect::from_xywh(
            (x * cell) as f32,
            (y * cell) as f32,
            cell as f32,
            cell as f32,
        ) {
            pixmap.fill_rect(rect, &grey, tiny_skia::Transform::identity(), None);
        }
    }

    let cell_f = cell as f32;
    let stroke = tiny_skia::Stroke {
        width: (cell_f * 0.25).max(1.0),
        ..tiny_skia::Stroke::default()
    };
    for path in &result.paths {
        stroke_path(&mut pixmap, path, cell_f, &stroke);
    }
    Ok(pixmap)
}

fn stroke_path(pixmap: &mut tiny_skia::Pixmap, path: &TracedPath, cell: f32, stroke: &tiny_skia::Stroke) {
    let fitted = paint(220, 30, 30);
    let polyline = paint(30, 60, 220);
    let identity = tiny_skia::Transform::identity();

    // Stroke primitives one at a time so corners get their own colour.
    for seg in &path.segments {
        let single = TracedPath {
            points: Vec::new(),
            closed: false,
            segments: vec![seg.clone()],
            corners: Vec::new(),
            start_node: None,
            end_node: None,
        };
        let Some(sk) = to_skia_path(&to_bezpath(&single), cell) else {
            continue;
        };
        let paint = match seg {
            Segment::Corner(_) => &polyline,
            _ => &fitted,
        };
        pixmap.stroke_path(&sk, paint, stroke, identity, None);
    }

    let dot = cell * 0.4;
    for corner in &path.corners {
        let colour = match corner.kind {
            CornerKind::Endpoint => paint(40, 40, 40),
            CornerKind::Junction => paint(20, 150, 60),
            CornerKind::Trimmed => paint(30, 60, 220),
        };
        let cx = (corner.position.x as f32 + 0.5) * cell;
        let cy = (corner.position.y as f32 + 0.5) * cell;
        if let Some(circle) = tiny_skia::PathBuilder::from_circle(cx, cy, dot.max(1.5)) {
            pixmap.fill_path(&circle, &colour, tiny_skia::FillRule::Winding, identity, None);
        }
    }
}

/// Render and write the preview PNG.
pub fn write_preview(
    mask: &PixelMask,
    result: &TraceResult,
    cell: u32,
    output_path: &Path,
) -> Result<(), TraceError> {
    let pixmap = render_preview(mask, result, cell)?;
    std::fs::write(output_path, encode_png(&pixmap)?)?;
    Ok(())
}
