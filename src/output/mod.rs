//! Writers for traced paths: SVG, G-code and kurbo `BezPath`.

pub mod gcode;
pub mod svg;

use kurbo::{Arc, BezPath, Point, Vec2};

use crate::segment::{ArcSegment, Segment};
use crate::TracedPath;

/// Gaps smaller than this between consecutive segments are not bridged.
const JOIN_TOLERANCE: f64 = 1e-6;

/// Flattening tolerance for arc → cubic conversion.
const ARC_TOLERANCE: f64 = 0.05;

/// One traced path as a `BezPath` in pixel coordinates. Arcs become cubics;
/// gaps left by unresolved junctions are bridged with straight lines.
pub fn to_bezpath(path: &TracedPath) -> BezPath {
    let mut bez = BezPath::new();
    let Some(first) = path.segments.first() else {
        return bez;
    };
    bez.move_to(first.start());
    let mut current = first.start();

    for seg in &path.segments {
        if seg.start().distance(current) > JOIN_TOLERANCE {
            bez.line_to(seg.start());
        }
        match seg {
            Segment::Line(line) => bez.line_to(line.end),
            Segment::Arc(arc) => {
                let kurbo_arc = Arc {
                    center: arc.center,
                    radii: Vec2::new(arc.radius, arc.radius),
                    start_angle: arc.start_angle,
                    sweep_angle: arc.sweep(),
                    x_rotation: 0.0,
                };
                for el in kurbo_arc.append_iter(ARC_TOLERANCE) {
                    bez.push(el);
                }
            }
            Segment::Corner(corner) => {
                for &p in &corner.points[1..] {
                    bez.line_to(p);
                }
            }
        }
        current = seg.end();
    }
    if path.closed {
        bez.close_path();
    }
    bez
}

/// Arcs split so that none sweeps a full turn or more, as needed by
/// writers whose arc commands cannot express a complete circle.
pub(crate) fn arc_pieces(seg: &Segment) -> Vec<(Point, Point, &ArcSegment)> {
    let Segment::Arc(arc) = seg else {
        return Vec::new();
    };
    if arc.sweep().abs() < std::f64::consts::PI * 1.999 {
        return vec![(arc.start, arc.end, arc)];
    }
    let mid = arc.point_at(0.5);
    vec![(arc.start, mid, arc), (mid, arc.end, arc)]
}

/// Decimal with at most three fractional digits, trailing zeros trimmed.
pub(crate) fn num(v: f64) -> String {
    let s = format!("{:.3}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}
