//! Exact junctions between adjacent primitives.
//!
//! Two fitted primitives that meet at a breakpoint each end close to, but not
//! on, the other. The shared endpoint is snapped to their analytic
//! intersection when that point is within reach of both fitted endpoints.
//! A line running tangentially into an arc usually misses the fitted circle
//! by a fraction of a pixel; carriers that miss by at most the tangency
//! tolerance meet at their point of closest approach.

use log::debug;

use crate::geom::{
    circle_circle_intersection, line_circle_intersection, line_line_intersection, Intersections,
    EPSILON,
};
use crate::segment::Segment;

/// Snap every shared endpoint to its exact intersection.
///
/// Pairs are consecutive segments plus, for a closed path with at least two
/// segments, the last and first. Pairs involving a corner polyline are left
/// alone. Running this twice moves nothing the second time.
pub fn resolve_junctions(
    segments: &[Segment],
    closed: bool,
    max_extension: f64,
    tangency_tolerance: f64,
) -> Vec<Segment> {
    let mut out = segments.to_vec();
    let count = out.len();
    if count < 2 {
        return out;
    }

    let pairs = if closed { count } else { count - 1 };
    for i in 0..pairs {
        let j = (i + 1) % count;
        let (a, b) = (&out[i], &out[j]);
        if a.is_corner() || b.is_corner() {
            continue;
        }
        let (a_end, b_start) = (a.end(), b.start());
        let current = a_end.midpoint(b_start);
        let Some(p) = intersect(a, b, tangency_tolerance).nearest_to(current) else {
            debug!(
                "no intersection between segments {i} and {j} near ({:.2}, {:.2})",
                current.x, current.y
            );
            continue;
        };
        if p.distance(a_end) > max_extension || p.distance(b_start) > max_extension {
            debug!(
                "junction {i}/{j} at ({:.2}, {:.2}) is out of reach, keeping fitted endpoints",
                p.x, p.y
            );
            continue;
        }
        out[i] = out[i].with_end(p);
        out[j] = out[j].with_start(p);
    }
    out
}

/// Intersections of the carriers of two fitted primitives. Circles missed
/// by at most `tolerance` count as touched.
pub fn intersect(a: &Segment, b: &Segment, tolerance: f64) -> Intersections {
    match (a, b) {
        (Segment::Line(l1), Segment::Line(l2)) => {
            line_line_intersection(l1.origin, l1.direction, l2.origin, l2.direction, EPSILON)
                .map_or(Intersections::None, Intersections::One)
        }
        (Segment::Line(l), Segment::Arc(c)) | (Segment::Arc(c), Segment::Line(l)) => {
            line_circle_intersection(l.origin, l.direction, c.center, c.radius, tolerance)
        }
        (Segment::Arc(c1), Segment::Arc(c2)) => {
            circle_circle_intersection(c1.center, c1.radius, c2.center, c2.radius, tolerance)
        }
        _ => Intersections::None,
    }
}

/// Largest gap between consecutive segments' endpoints.
pub fn max_gap(segments: &[Segment], closed: bool) -> f64 {
    let count = segments.len();
    if count < 2 {
        return 0.0;
    }
    let pairs = if closed { count } else { count - 1 };
    (0..pairs)
        .map(|i| segments[i].end().distance(segments[(i + 1) % count].start()))
        .fold(0.0, f64::max)
}
