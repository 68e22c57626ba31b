//! Shared geometry utilities: line/circle/arc algebra and analytic
//! intersections.
//!
//! Angles follow `atan2` in pixel coordinates (y grows downward), so a
//! positive sweep turns clockwise on screen. Arc angles are kept unwrapped:
//! `end = start + sweep` with `|sweep|` allowed to reach a full turn.

use std::f64::consts::{PI, TAU};

use kurbo::{Point, Vec2};

/// Default tolerance for parallel/tangent tests.
pub const EPSILON: f64 = 1e-9;

/// Zero, one or two intersection points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intersections {
    None,
    One(Point),
    Two(Point, Point),
}

impl Intersections {
    pub fn iter(&self) -> impl Iterator<Item = Point> {
        let (a, b) = match *self {
            Intersections::None => (None, None),
            Intersections::One(p) => (Some(p), None),
            Intersections::Two(p, q) => (Some(p), Some(q)),
        };
        a.into_iter().chain(b)
    }

    /// The intersection nearest to `target`, if any.
    pub fn nearest_to(&self, target: Point) -> Option<Point> {
        self.iter().min_by(|a, b| {
            (*a - target)
                .hypot2()
                .total_cmp(&(*b - target).hypot2())
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Intersections::None)
    }
}

/// Rotate `v` by `angle` radians.
#[inline]
pub fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (s, c) = angle.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Perpendicular distance from `p` to the infinite line through `origin`
/// along unit vector `dir`.
#[inline]
pub fn distance_to_line(p: Point, origin: Point, dir: Vec2) -> f64 {
    dir.cross(p - origin).abs()
}

/// Orthogonal projection of `p` onto the line through `origin` along unit `dir`.
#[inline]
pub fn project_point_on_line(p: Point, origin: Point, dir: Vec2) -> Point {
    origin + dir * dir.dot(p - origin)
}

/// Intersection of two infinite lines, `None` when (nearly) parallel.
pub fn line_line_intersection(
    p1: Point,
    d1: Vec2,
    p2: Point,
    d2: Vec2,
    eps: f64,
) -> Option<Point> {
    let denom = d1.cross(d2);
    if denom.abs() < eps {
        return None;
    }
    let t = (p2 - p1).cross(d2) / denom;
    Some(p1 + d1 * t)
}

/// Intersections of the infinite line through `p` along unit `dir` with a
/// circle. A line touching the circle, or missing it by at most `tolerance`,
/// yields the foot of the perpendicular from the center.
pub fn line_circle_intersection(
    p: Point,
    dir: Vec2,
    center: Point,
    radius: f64,
    tolerance: f64,
) -> Intersections {
    let foot = project_point_on_line(center, p, dir);
    let d = foot.distance(center);
    if d > radius + tolerance {
        return Intersections::None;
    }
    let half_chord_sq = radius * radius - d * d;
    if half_chord_sq <= EPSILON * radius.max(1.0) {
        return Intersections::One(foot);
    }
    let h = half_chord_sq.sqrt();
    Intersections::Two(foot - dir * h, foot + dir * h)
}

/// Intersections of two circles via the radical line. Circles that touch,
/// or miss each other by at most `tolerance`, yield one point on the line
/// of centers.
pub fn circle_circle_intersection(
    c1: Point,
    r1: f64,
    c2: Point,
    r2: f64,
    tolerance: f64,
) -> Intersections {
    let delta = c2 - c1;
    let d = delta.hypot();
    if d < EPSILON {
        // Concentric: either identical or disjoint, no isolated points.
        return Intersections::None;
    }
    if d > r1 + r2 + tolerance || d < (r1 - r2).abs() - tolerance {
        return Intersections::None;
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h_sq = r1 * r1 - a * a;
    let u = delta / d;
    let mid = c1 + u * a;
    if h_sq <= EPSILON * r1.max(1.0) {
        return Intersections::One(mid);
    }
    let h = h_sq.sqrt();
    let n = Vec2::new(-u.y, u.x);
    Intersections::Two(mid - n * h, mid + n * h)
}

/// Normalize an angle to [0, 2π).
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Wrap an angle to (-π, π].
#[inline]
pub fn wrap_to_pi(angle: f64) -> f64 {
    let a = normalize_angle(angle + PI) - PI;
    if a <= -PI {
        a + TAU
    } else {
        a
    }
}

/// The representative of `angle` (mod 2π) closest to `reference`.
#[inline]
pub fn unwrap_angle_near(angle: f64, reference: f64) -> f64 {
    reference + wrap_to_pi(angle - reference)
}

/// Whether `angle` lies on the arc starting at `start` and sweeping `sweep`
/// radians (positive sweep = increasing angle).
pub fn is_angle_in_arc(angle: f64, start: f64, sweep: f64) -> bool {
    if sweep.abs() >= TAU - EPSILON {
        return true;
    }
    let offset = if sweep >= 0.0 {
        normalize_angle(angle - start)
    } else {
        normalize_angle(start - angle)
    };
    offset <= sweep.abs() + EPSILON
}

/// Polar angle of `p` around `center`.
#[inline]
pub fn angle_of(p: Point, center: Point) -> f64 {
    (p - center).atan2()
}

/// Point on a circle at `angle`.
#[inline]
pub fn point_on_circle(center: Point, radius: f64, angle: f64) -> Point {
    center + Vec2::from_angle(angle) * radius
}

/// Distance from `p` to the circular arc, or to its nearer endpoint when `p`
/// falls outside the swept sector.
pub fn distance_to_arc(p: Point, center: Point, radius: f64, start: f64, sweep: f64) -> f64 {
    let angle = angle_of(p, center);
    if is_angle_in_arc(angle, start, sweep) {
        (p.distance(center) - radius).abs()
    } else {
        let a = point_on_circle(center, radius, start);
        let b = point_on_circle(center, radius, start + sweep);
        p.distance(a).min(p.distance(b))
    }
}

/// Distance from `p` to the segment `a`–`b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq < EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Signed turning angle from direction `a` to direction `b`, in (-π, π].
#[inline]
pub fn turn_angle(a: Vec2, b: Vec2) -> f64 {
    a.cross(b).atan2(a.dot(b))
}

/// Cumulative arc length along a polyline; `out[i]` is the length up to `points[i]`.
pub fn cumulative_length(points: &[Point]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += p.distance(points[i - 1]);
        }
        out.push(acc);
    }
    out
}
