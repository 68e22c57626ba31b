//! SVG path data built from `M`, `L` and `A` commands only.
//!
//! Pixel space and SVG user space are both y-down, so a positive sweep maps
//! straight onto sweep-flag 1.

use std::fmt::Write;

use super::{arc_pieces, num};
use crate::segment::Segment;
use crate::{TraceResult, TracedPath};

/// Path data for one traced path.
pub fn path_data(path: &TracedPath) -> String {
    let mut d = String::new();
    let Some(first) = path.segments.first() else {
        return d;
    };
    let start = first.start();
    let _ = write!(d, "M{} {}", num(start.x), num(start.y));
    let mut current = start;

    for seg in &path.segments {
        if seg.start().distance(current) > 1e-6 {
            let _ = write!(d, " L{} {}", num(seg.start().x), num(seg.start().y));
        }
        match seg {
            Segment::Line(line) => {
                let _ = write!(d, " L{} {}", num(line.end.x), num(line.end.y));
            }
            Segment::Arc(_) => {
                for (from, to, arc) in arc_pieces(seg) {
                    let sweep = arc.sweep();
                    let piece = if from == arc.start && to == arc.end {
                        sweep
                    } else {
                        sweep / 2.0
                    };
                    let large = u8::from(piece.abs() > std::f64::consts::PI);
                    let flag = u8::from(piece > 0.0);
                    let r = num(arc.radius);
                    let _ = write!(d, " A{r} {r} 0 {large} {flag} {} {}", num(to.x), num(to.y));
                }
            }
            Segment::Corner(corner) => {
                for p in &corner.points[1..] {
                    let _ = write!(d, " L{} {}", num(p.x), num(p.y));
                }
            }
        }
        current = seg.end();
    }
    if path.closed {
        d.push_str(" Z");
    }
    d
}

/// A standalone SVG document with one `<path>` per traced path. The view
/// box puts pixel centers at half-integer offsets from the image border.
pub fn document(result: &TraceResult, stroke_width: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="-0.5 -0.5 {w} {h}">"#,
        w = result.width,
        h = result.height,
    );
    for (i, path) in result.paths.iter().enumerate() {
        let d = path_data(path);
        if d.is_empty() {
            continue;
        }
        let _ = writeln!(
            out,
            r#"  <path id="path-{i}" fill="none" stroke="black" stroke-width="{}" d="{d}"/>"#,
            num(stroke_width),
        );
    }
    out.push_str("</svg>\n");
    out
}
