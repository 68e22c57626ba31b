//! G-code for a pen or drag-knife style machine.
//!
//! `G0` travels to each path start, `G1` follows lines and corner
//! polylines, `G2`/`G3` follow arcs with `I`/`J` given relative to the arc
//! start. Machine y grows upward, so pixel y is flipped against the image
//! height; a clockwise arc on screen stays clockwise on the machine.

use std::fmt::Write;

use kurbo::Point;

use super::{arc_pieces, num};
use crate::segment::{Segment, Winding};
use crate::{TraceResult, TracedPath};

#[derive(Debug, Clone, PartialEq)]
pub struct GcodeOptions {
    /// Machine units per pixel.
    pub scale: f64,
    /// Feed rate added to the first cutting move of each path.
    pub feed_rate: Option<f64>,
}

impl Default for GcodeOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            feed_rate: None,
        }
    }
}

struct Machine<'a> {
    height: f64,
    options: &'a GcodeOptions,
}

impl Machine<'_> {
    fn xy(&self, p: Point) -> (f64, f64) {
        (p.x * self.options.scale, (self.height - p.y) * self.options.scale)
    }
}

/// A complete program: absolute coordinates, every path in order.
pub fn program(result: &TraceResult, options: &GcodeOptions) -> String {
    let machine = Machine {
        height: result.height as f64,
        options,
    };
    let mut out = String::new();
    out.push_str("G90\nG21\n");
    for path in &result.paths {
        write_path(&mut out, path, &machine);
    }
    out.push_str("M2\n");
    out
}

fn write_path(out: &mut String, path: &TracedPath, m: &Machine<'_>) {
    let Some(first) = path.segments.first() else {
        return;
    };
    let (x, y) = m.xy(first.start());
    let _ = writeln!(out, "G0 X{} Y{}", num(x), num(y));
    let mut feed = m.options.feed_rate.map(|f| format!(" F{}", num(f)));
    let mut current = first.start();

    for seg in &path.segments {
        if seg.start().distance(current) > 1e-6 {
            line_to(out, m, &mut feed, seg.start());
        }
        match seg {
            Segment::Line(line) => line_to(out, m, &mut feed, line.end),
            Segment::Arc(arc) => {
                let code = match arc.winding() {
                    Winding::Clockwise => "G2",
                    Winding::CounterClockwise => "G3",
                };
                for (from, to, arc) in arc_pieces(seg) {
                    let (x, y) = m.xy(to);
                    let i = (arc.center.x - from.x) * m.options.scale;
                    let j = (from.y - arc.center.y) * m.options.scale;
                    let f = feed.take().unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "{code} X{} Y{} I{} J{}{f}",
                        num(x),
                        num(y),
                        num(i),
                        num(j)
                    );
                }
            }
            Segment::Corner(corner) => {
                for &p in &corner.points[1..] {
                    line_to(out, m, &mut feed, p);
                }
            }
        }
        current = seg.end();
    }
}

/// `G1` to `p`; the pending feed word, if any, goes on this move.
fn line_to(out: &mut String, m: &Machine<'_>, feed: &mut Option<String>, p: Point) {
    let (x, y) = m.xy(p);
    let f = feed.take().unwrap_or_default();
    let _ = writeln!(out, "G1 X{} Y{}{f}", num(x), num(y));
}
