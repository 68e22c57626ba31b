//! Output primitives: lines, circular arcs and corner polylines.
//!
//! Segments are immutable values. Passes that move an endpoint build a new
//! segment with [`Segment::with_start`] / [`Segment::with_end`] and replace
//! the old one in a fresh list.

use kurbo::{Point, Vec2};
use serde::Serialize;

use crate::geom::{angle_of, point_on_circle, unwrap_angle_near};

/// Half-open range of chain point indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// The span covering `first..=last`.
    pub fn inclusive(first: usize, last: usize) -> Self {
        Self::new(first, last + 1)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Last index inside the span.
    pub fn last(&self) -> usize {
        self.end.saturating_sub(1)
    }
}

/// Direction of travel along an arc as seen on screen (pixel y down).
///
/// Clockwise corresponds to increasing `atan2` angle in pixel coordinates,
/// which is `G2` once y is flipped for a machine and SVG sweep-flag 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSegment {
    /// A point on the fitted line.
    pub origin: Point,
    /// Unit direction, oriented from `start` towards `end`.
    pub direction: Vec2,
    pub start: Point,
    pub end: Point,
    /// Chain points the line was fitted to.
    pub fit: Span,
    /// Chain points this segment accounts for.
    pub owned: Span,
    /// Sum of squared residuals over the fitted points.
    pub error: f64,
    pub max_residual: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArcSegment {
    pub center: Point,
    pub radius: f64,
    /// Angle of `start` around `center`.
    pub start_angle: f64,
    /// Unwrapped: `end_angle - start_angle` is the signed sweep.
    pub end_angle: f64,
    pub start: Point,
    pub end: Point,
    pub fit: Span,
    pub owned: Span,
    pub error: f64,
    pub max_residual: f64,
}

impl ArcSegment {
    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    pub fn winding(&self) -> Winding {
        if self.sweep() >= 0.0 {
            Winding::Clockwise
        } else {
            Winding::CounterClockwise
        }
    }

    /// Point at fraction `t` of the sweep.
    pub fn point_at(&self, t: f64) -> Point {
        point_on_circle(self.center, self.radius, self.start_angle + self.sweep() * t)
    }
}

/// A raw polyline through a turn too sharp for a line or arc.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CornerSegment {
    pub points: Vec<Point>,
    pub owned: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Line(LineSegment),
    Arc(ArcSegment),
    Corner(CornerSegment),
}

impl Segment {
    pub fn start(&self) -> Point {
        match self {
            Segment::Line(l) => l.start,
            Segment::Arc(a) => a.start,
            Segment::Corner(c) => c.points[0],
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Segment::Line(l) => l.end,
            Segment::Arc(a) => a.end,
            Segment::Corner(c) => c.points[c.points.len() - 1],
        }
    }

    pub fn owned(&self) -> Span {
        match self {
            Segment::Line(l) => l.owned,
            Segment::Arc(a) => a.owned,
            Segment::Corner(c) => c.owned,
        }
    }

    /// The fitted span, if this is a fitted primitive.
    pub fn fit(&self) -> Option<Span> {
        match self {
            Segment::Line(l) => Some(l.fit),
            Segment::Arc(a) => Some(a.fit),
            Segment::Corner(_) => None,
        }
    }

    pub fn is_corner(&self) -> bool {
        matches!(self, Segment::Corner(_))
    }

    /// Length along the primitive.
    pub fn length(&self) -> f64 {
        match self {
            Segment::Line(l) => l.start.distance(l.end),
            Segment::Arc(a) => a.sweep().abs() * a.radius,
            Segment::Corner(c) => c.points.windows(2).map(|w| w[0].distance(w[1])).sum(),
        }
    }

    /// Unit tangent at the start, in the direction of travel.
    pub fn start_tangent(&self) -> Vec2 {
        match self {
            Segment::Line(l) => l.direction,
            Segment::Arc(a) => arc_tangent(a, a.start_angle),
            Segment::Corner(c) => unit_or_zero(c.points[1.min(c.points.len() - 1)] - c.points[0]),
        }
    }

    /// Unit tangent at the end, in the direction of travel.
    pub fn end_tangent(&self) -> Vec2 {
        match self {
            Segment::Line(l) => l.direction,
            Segment::Arc(a) => arc_tangent(a, a.end_angle),
            Segment::Corner(c) => {
                let n = c.points.len();
                unit_or_zero(c.points[n - 1] - c.points[n.saturating_sub(2)])
            }
        }
    }

    /// A copy with the start moved to `p`. Arcs keep their circle and
    /// re-derive the start angle next to the old one.
    pub fn with_start(&self, p: Point) -> Segment {
        match self {
            Segment::Line(l) => Segment::Line(LineSegment { start: p, ..l.clone() }),
            Segment::Arc(a) => Segment::Arc(ArcSegment {
                start: p,
                start_angle: unwrap_angle_near(angle_of(p, a.center), a.start_angle),
                ..a.clone()
            }),
            Segment::Corner(c) => {
                let mut points = c.points.clone();
                points[0] = p;
                Segment::Corner(CornerSegment {
                    points,
                    owned: c.owned,
                })
            }
        }
    }

    /// A copy with the end moved to `p`.
    pub fn with_end(&self, p: Point) -> Segment {
        match self {
            Segment::Line(l) => Segment::Line(LineSegment { end: p, ..l.clone() }),
            Segment::Arc(a) => Segment::Arc(ArcSegment {
                end: p,
                end_angle: unwrap_angle_near(angle_of(p, a.center), a.end_angle),
                ..a.clone()
            }),
            Segment::Corner(c) => {
                let mut points = c.points.clone();
                let last = points.len() - 1;
                points[last] = p;
                Segment::Corner(CornerSegment {
                    points,
                    owned: c.owned,
                })
            }
        }
    }
}

fn arc_tangent(arc: &ArcSegment, angle: f64) -> Vec2 {
    let radial = Vec2::from_angle(angle);
    let t = Vec2::new(-radial.y, radial.x);
    if arc.sweep() >= 0.0 {
        t
    } else {
        -t
    }
}

fn unit_or_zero(v: Vec2) -> Vec2 {
    let len = v.hypot();
    if len > 1e-12 {
        v / len
    } else {
        Vec2::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn quarter_arc() -> ArcSegment {
        ArcSegment {
            center: Point::ZERO,
            radius: 10.0,
            start_angle: 0.0,
            end_angle: PI / 2.0,
            start: Point::new(10.0, 0.0),
            end: Point::new(0.0, 10.0),
            fit: Span::inclusive(0, 9),
            owned: Span::new(0, 9),
            error: 0.0,
            max_residual: 0.0,
        }
    }

    #[test]
    fn span_helpers() {
        let s = Span::inclusive(3, 7);
        assert_eq!(s.len(), 5);
        assert!(s.contains(7) && !s.contains(8));
        assert_eq!(s.last(), 7);
    }

    #[test]
    fn positive_sweep_is_clockwise_on_screen() {
        let arc = quarter_arc();
        assert_eq!(arc.winding(), Winding::Clockwise);
        // From +x towards +y (down on screen).
        let t = Segment::Arc(arc).start_tangent();
        assert!((t - Vec2::new(0.0, 1.0)).hypot() < 1e-12);
    }

    #[test]
    fn arc_endpoint_move_keeps_unwrapped_sweep() {
        let arc = ArcSegment {
            end_angle: 2.0 * PI - 0.1,
            end: point_on_circle(Point::ZERO, 10.0, 2.0 * PI - 0.1),
            ..quarter_arc()
        };
        let moved = Segment::Arc(arc).with_end(point_on_circle(Point::ZERO, 10.0, -0.05));
        let Segment::Arc(moved) = moved else {
            panic!("still an arc");
        };
        assert!((moved.end_angle - (2.0 * PI - 0.05)).abs() < 1e-9);
        assert!(moved.sweep() > 0.0);
    }

    #[test]
    fn arc_length_and_midpoint() {
        let seg = Segment::Arc(quarter_arc());
        assert!((seg.length() - 5.0 * PI).abs() < 1e-9);
        let Segment::Arc(a) = &seg else { unreachable!() };
        let mid = a.point_at(0.5);
        assert!((mid.to_vec2().hypot() - 10.0).abs() < 1e-9);
        assert!((mid.x - mid.y).abs() < 1e-9);
    }

    #[test]
    fn corner_endpoints_are_replaced() {
        let corner = Segment::Corner(CornerSegment {
            points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0)],
            owned: Span::new(4, 5),
        });
        let moved = corner.with_start(Point::new(-1.0, 0.0)).with_end(Point::new(3.0, 0.0));
        assert_eq!(moved.start(), Point::new(-1.0, 0.0));
        assert_eq!(moved.end(), Point::new(3.0, 0.0));
        assert_eq!(moved.owned(), Span::new(4, 5));
    }
}
