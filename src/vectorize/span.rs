//! Span fitting with a per-chain cache.
//!
//! A span is an inclusive range of chain points. Its fit picks the better of
//! a TLS line and an algebraic circle, scores it by the summed squared
//! residual, and is cached by `(first, last)` so the split, refinement and
//! merge phases never refit the same range twice.

use std::collections::HashMap;

use kurbo::{Point, Vec2};

use crate::config::TracingConfig;
use crate::fit::{Primitive, PrefixMoments};
use crate::geom::{angle_of, point_on_circle, project_point_on_line, wrap_to_pi};
use crate::segment::{ArcSegment, LineSegment, Segment, Span};

/// An arc must bring the error below this fraction of the line's error to
/// be preferred; anything closer counts as a tie and the line wins.
const ARC_PREFERENCE: f64 = 0.8;

/// Arcs sweeping less than this (radians) are emitted as lines.
const MIN_ARC_SWEEP: f64 = 1e-3;

/// The fit of one span. Immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub primitive: Primitive,
    /// Sum of squared residuals (plus raw-pixel excess when available).
    pub error: f64,
    pub max_residual: f64,
    pub span: Span,
}

/// Raw stroke pixels grouped by the chain point they sit closest to.
#[derive(Debug, Clone, Default)]
struct RawPixels {
    points: Vec<Point>,
    /// `points[offsets[i]..offsets[i + 1]]` belong to chain point `i`.
    offsets: Vec<usize>,
}

impl RawPixels {
    fn assign(chain: &[Point], raw: &[Point]) -> Self {
        if raw.is_empty() || chain.is_empty() {
            return Self::default();
        }
        let mut tagged: Vec<(usize, Point)> = raw
            .iter()
            .map(|&p| {
                let nearest = chain
                    .iter()
                    .enumerate()
                    .min_by(|a, b| {
                        (*a.1 - p).hypot2().total_cmp(&(*b.1 - p).hypot2())
                    })
                    .map_or(0, |(i, _)| i);
                (nearest, p)
            })
            .collect();
        tagged.sort_by_key(|&(i, _)| i);

        let mut offsets = vec![0; chain.len() + 1];
        for &(i, _) in &tagged {
            offsets[i + 1] += 1;
        }
        for i in 0..chain.len() {
            offsets[i + 1] += offsets[i];
        }
        Self {
            points: tagged.into_iter().map(|(_, p)| p).collect(),
            offsets,
        }
    }

    fn in_range(&self, first: usize, last: usize) -> &[Point] {
        if self.offsets.is_empty() {
            return &[];
        }
        &self.points[self.offsets[first]..self.offsets[last + 1]]
    }
}

pub struct SpanFitter<'a> {
    points: &'a [Point],
    prefix: PrefixMoments,
    raw: RawPixels,
    raw_tolerance: f64,
    max_radius_ratio: f64,
    cache: HashMap<(usize, usize), FitResult>,
}

impl<'a> SpanFitter<'a> {
    pub fn new(points: &'a [Point], raw: &[Point], config: &TracingConfig) -> Self {
        Self {
            points,
            prefix: PrefixMoments::new(points),
            raw: RawPixels::assign(points, raw),
            raw_tolerance: config.raw_tolerance,
            max_radius_ratio: config.max_radius_ratio,
            cache: HashMap::new(),
        }
    }

    pub fn points(&self) -> &'a [Point] {
        self.points
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Fit points `first..=last`.
    pub fn fit(&mut self, first: usize, last: usize) -> FitResult {
        if let Some(hit) = self.cache.get(&(first, last)) {
            return *hit;
        }
        let result = self.compute(first, last);
        self.cache.insert((first, last), result);
        result
    }

    fn compute(&self, first: usize, last: usize) -> FitResult {
        let span = Span::inclusive(first, last);
        let moments = self.prefix.range(first, last);

        let line = moments
            .line()
            .map(Primitive::from)
            .unwrap_or_else(|| {
                let (origin, direction) = self.chord_line(first, last);
                Primitive::Line { origin, direction }
            });
        let (line_error, line_max) = self.score(&line, first, last);
        let line_fit = FitResult {
            primitive: line,
            error: line_error,
            max_residual: line_max,
            span,
        };
        if span.len() < 3 {
            return line_fit;
        }

        let extent = self.extent(first, last);
        let Some(circle) = moments
            .circle()
            .filter(|c| c.radius <= self.max_radius_ratio * extent)
        else {
            return line_fit;
        };
        let circle = Primitive::from(circle);
        let (arc_error, arc_max) = self.score(&circle, first, last);
        if arc_error < line_error * ARC_PREFERENCE {
            FitResult {
                primitive: circle,
                error: arc_error,
                max_residual: arc_max,
                span,
            }
        } else {
            line_fit
        }
    }

    /// Line through the span's end points; the fallback carrier when the
    /// points are coincident or an arc is too flat to keep.
    fn chord_line(&self, first: usize, last: usize) -> (Point, Vec2) {
        let a = self.points[first];
        let d = self.points[last] - a;
        let len = d.hypot();
        let direction = if len > 1e-12 { d / len } else { Vec2::new(1.0, 0.0) };
        (a, direction)
    }

    /// Bounding-box diagonal of the span, so a closed loop whose chord is
    /// zero still has a meaningful size.
    fn extent(&self, first: usize, last: usize) -> f64 {
        let pts = &self.points[first..=last];
        let (mut min, mut max) = (pts[0], pts[0]);
        for p in pts {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        min.distance(max)
    }

    /// Summed squared residual and max residual of `prim` over the span.
    pub fn score(&self, prim: &Primitive, first: usize, last: usize) -> (f64, f64) {
        let mut sse = 0.0;
        let mut max = 0.0f64;
        for &p in &self.points[first..=last] {
            let r = prim.residual(p);
            sse += r * r;
            max = max.max(r);
        }
        for &p in self.raw.in_range(first, last) {
            let excess = (prim.residual(p) - self.raw_tolerance).max(0.0);
            sse += excess * excess;
            max = max.max(excess);
        }
        (sse, max)
    }

    /// Point of maximum distance from the chord `first`–`last`, strictly
    /// inside the span. For a closed span (chord of zero length) this is
    /// the point farthest from the start.
    pub fn farthest_from_chord(&self, first: usize, last: usize) -> Option<usize> {
        if last <= first + 1 {
            return None;
        }
        let a = self.points[first];
        let chord = self.points[last] - a;
        let len = chord.hypot();
        let dist = |p: Point| {
            if len > 1e-9 {
                (chord.cross(p - a) / len).abs()
            } else {
                p.distance(a)
            }
        };
        let (k, d) = (first + 1..last)
            .map(|k| (k, dist(self.points[k])))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        (d > 1e-9).then_some(k)
    }

    /// Turn a fit into a segment whose endpoints lie on the primitive next to
    /// the span's first and last points.
    pub fn to_segment(&self, fit: &FitResult, owned: Span) -> Segment {
        let first = fit.span.start;
        let last = fit.span.last();
        match fit.primitive {
            Primitive::Line { origin, direction } => {
                self.line_segment(fit, owned, origin, direction)
            }
            Primitive::Circle { center, radius } => {
                let start_angle = angle_of(self.points[first], center);
                let sweep: f64 = self.points[first..=last]
                    .windows(2)
                    .map(|w| wrap_to_pi(angle_of(w[1], center) - angle_of(w[0], center)))
                    .sum();
                if sweep.abs() < MIN_ARC_SWEEP {
                    let (origin, direction) = self.chord_line(first, last);
                    return self.line_segment(fit, owned, origin, direction);
                }
                let end_angle = start_angle + sweep;
                Segment::Arc(ArcSegment {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                    start: point_on_circle(center, radius, start_angle),
                    end: point_on_circle(center, radius, end_angle),
                    fit: fit.span,
                    owned,
                    error: fit.error,
                    max_residual: fit.max_residual,
                })
            }
        }
    }

    fn line_segment(&self, fit: &FitResult, owned: Span, origin: Point, direction: Vec2) -> Segment {
        let a = self.points[fit.span.start];
        let b = self.points[fit.span.last()];
        let direction = if direction.dot(b - a) < 0.0 {
            -direction
        } else {
            direction
        };
        Segment::Line(LineSegment {
            origin,
            direction,
            start: project_point_on_line(a, origin, direction),
            end: project_point_on_line(b, origin, direction),
            fit: fit.span,
            owned,
            error: fit.error,
            max_residual: fit.max_residual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn config() -> TracingConfig {
        TracingConfig::default()
    }

    #[test]
    fn straight_span_fits_a_line() {
        let pts: Vec<Point> = (0..10).map(|i| Point::new(i as f64, 2.0)).collect();
        let cfg = config();
        let mut fitter = SpanFitter::new(&pts, &[], &cfg);
        let fit = fitter.fit(0, 9);
        assert!(fit.primitive.is_line());
        assert!(fit.error < 1e-12);
        assert_eq!(fit.span, Span::new(0, 10));
    }

    #[test]
    fn curved_span_fits_an_arc() {
        let pts: Vec<Point> = (0..=30)
            .map(|i| {
                let a = PI * i as f64 / 30.0;
                Point::new(20.0 + 15.0 * a.cos(), 20.0 + 15.0 * a.sin())
            })
            .collect();
        let cfg = config();
        let mut fitter = SpanFitter::new(&pts, &[], &cfg);
        let fit = fitter.fit(0, 30);
        let Primitive::Circle { center, radius } = fit.primitive else {
            panic!("expected a circle, got {:?}", fit.primitive);
        };
        assert!(center.distance(Point::new(20.0, 20.0)) < 1e-6);
        assert!((radius - 15.0).abs() < 1e-6);

        let Segment::Arc(arc) = fitter.to_segment(&fit, Span::new(0, 31)) else {
            panic!("expected an arc segment");
        };
        assert!((arc.sweep() - PI).abs() < 1e-6, "sweep {}", arc.sweep());
    }

    #[test]
    fn results_are_cached() {
        let pts: Vec<Point> = (0..10).map(|i| Point::new(i as f64, (i % 2) as f64)).collect();
        let cfg = config();
        let mut fitter = SpanFitter::new(&pts, &[], &cfg);
        let a = fitter.fit(2, 7);
        let b = fitter.fit(2, 7);
        assert_eq!(a, b);
        assert_eq!(fitter.cached(), 1);
    }

    #[test]
    fn two_points_are_always_a_line() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        let cfg = config();
        let mut fitter = SpanFitter::new(&pts, &[], &cfg);
        assert!(fitter.fit(0, 1).primitive.is_line());
    }

    #[test]
    fn raw_pixels_within_tolerance_are_free() {
        let pts: Vec<Point> = (0..10).map(|i| Point::new(i as f64, 5.0)).collect();
        let near: Vec<Point> = (0..10).map(|i| Point::new(i as f64, 6.0)).collect();
        let far = vec![Point::new(4.0, 9.0)];
        let cfg = config();

        let mut plain = SpanFitter::new(&pts, &near, &cfg);
        assert!(plain.fit(0, 9).error < 1e-12);

        let mut stray = SpanFitter::new(&pts, &far, &cfg);
        let fit = stray.fit(0, 9);
        assert!((fit.max_residual - (4.0 - cfg.raw_tolerance)).abs() < 1e-9);
    }

    #[test]
    fn chord_split_picks_the_corner() {
        let mut pts: Vec<Point> = (0..5).map(|y| Point::new(0.0, y as f64)).collect();
        pts.extend((1..8).map(|x| Point::new(x as f64, 4.0)));
        let cfg = config();
        let fitter = SpanFitter::new(&pts, &[], &cfg);
        assert_eq!(fitter.farthest_from_chord(0, pts.len() - 1), Some(4));
    }
}
