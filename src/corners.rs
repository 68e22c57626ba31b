//! Curvature-peak corner detection and corner primitives.
//!
//! Each chain point gets a discrete curvature from the turn between a
//! direction fitted over the arc length behind it and one fitted over the
//! arc length ahead. Peaks above the threshold are then classified against
//! the fitted segments:
//!
//! - near a breakpoint, the corner is a **junction** and the junction
//!   resolver places it exactly;
//! - inside an arc tight enough to explain the turn, the peak is ignored;
//! - anywhere else the points around it are cut out of their segment into a
//!   **trimmed** corner polyline and the remainders are refit.
//!
//! Open chains also carry an **endpoint** anchor at each end.

use kurbo::{Point, Vec2};
use serde::Serialize;

use crate::config::TracingConfig;
use crate::fit::Moments;
use crate::geom::{cumulative_length, turn_angle};
use crate::segment::{CornerSegment, Segment, Span};
use crate::vectorize::SpanFitter;

/// A peak is explained by an arc when its curvature is at most this multiple
/// of the arc's own curvature `1 / radius`.
const ARC_EXPLAINS: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerKind {
    /// Start or end of an open path.
    Endpoint,
    /// Two fitted primitives meet here.
    Junction,
    /// A corner polyline owns the points around the peak.
    Trimmed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Corner {
    pub kind: CornerKind,
    pub position: Point,
    /// Chain index of the curvature peak (or path end).
    pub index: usize,
    /// Absolute turn between the backward and forward directions.
    pub turn_angle: f64,
    pub curvature: f64,
    /// Arc length on each side of the peak the corner influences.
    pub radius: f64,
    /// Indices of the segments touching the corner, in path order.
    pub segments: Vec<usize>,
    /// Chain points owned by a trimmed corner's polyline.
    pub owned: Option<Span>,
}

/// A local curvature maximum above the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvaturePeak {
    pub index: usize,
    pub turn_angle: f64,
    pub curvature: f64,
}

/// Discrete curvature at every unique chain point.
///
/// Points whose backward or forward window is shorter than half of
/// `window` (the ends of open chains) get zero.
pub fn curvature_profile(points: &[Point], closed: bool, window: f64) -> Vec<f64> {
    turn_profile(points, closed, window)
        .into_iter()
        .map(|(_, k)| k)
        .collect()
}

fn turn_profile(points: &[Point], closed: bool, window: f64) -> Vec<(f64, f64)> {
    let unique = unique_points(points, closed);
    (0..unique.len())
        .map(|i| {
            let back = window_points(unique, closed, i, false, window);
            let fwd = window_points(unique, closed, i, true, window);
            let (Some((back, back_len)), Some((fwd, fwd_len))) = (back, fwd) else {
                return (0.0, 0.0);
            };
            if back_len < window / 2.0 || fwd_len < window / 2.0 {
                return (0.0, 0.0);
            }
            let theta = turn_angle(direction(&back), direction(&fwd)).abs();
            (theta, theta / (back_len + fwd_len))
        })
        .collect()
}

fn unique_points(points: &[Point], closed: bool) -> &[Point] {
    if closed && points.len() > 1 {
        &points[..points.len() - 1]
    } else {
        points
    }
}

/// Points within `window` arc length of `i` in one direction, ordered
/// along the chain, with their arc length.
fn window_points(
    unique: &[Point],
    closed: bool,
    i: usize,
    forward: bool,
    window: f64,
) -> Option<(Vec<Point>, f64)> {
    let m = unique.len();
    let max_steps = if closed { m / 2 } else { m };
    let mut pts = vec![unique[i]];
    let mut len = 0.0;
    let mut j = i;
    for _ in 0..max_steps {
        let next = match (forward, closed) {
            (true, true) => (j + 1) % m,
            (false, true) => (j + m - 1) % m,
            (true, false) if j + 1 < m => j + 1,
            (false, false) if j > 0 => j - 1,
            _ => break,
        };
        let step = unique[j].distance(unique[next]);
        if len + step > window + 1e-9 {
            break;
        }
        len += step;
        pts.push(unique[next]);
        j = next;
    }
    if pts.len() < 2 {
        return None;
    }
    if !forward {
        pts.reverse();
    }
    Some((pts, len))
}

/// TLS direction over `pts`, oriented along the traversal.
fn direction(pts: &[Point]) -> Vec2 {
    let chord = pts[pts.len() - 1] - pts[0];
    let mut moments = Moments::with_origin(pts[0]);
    for &p in pts {
        moments.push(p);
    }
    let dir = match moments.line() {
        Some(line) if pts.len() > 2 => line.direction,
        _ => chord.normalize(),
    };
    if dir.dot(chord) < 0.0 {
        -dir
    } else {
        dir
    }
}

/// Curvature peaks above `config.curvature_threshold`, strongest first
/// within each `corner_window_length` neighborhood, returned in chain order.
pub fn detect_corners(points: &[Point], closed: bool, config: &TracingConfig) -> Vec<CurvaturePeak> {
    let window = config.corner_window_length;
    let profile = turn_profile(points, closed, window);
    let m = profile.len();
    if m < 3 {
        return Vec::new();
    }
    let kappa = |i: usize| profile[i].1;

    let mut candidates: Vec<CurvaturePeak> = (0..m)
        .filter(|&i| {
            let k = kappa(i);
            if k <= config.curvature_threshold {
                return false;
            }
            let prev = if i > 0 {
                Some(i - 1)
            } else {
                closed.then_some(m - 1)
            };
            let next = if i + 1 < m {
                Some(i + 1)
            } else {
                closed.then_some(0)
            };
            prev.map_or(true, |p| k > kappa(p)) && next.map_or(true, |n| k >= kappa(n))
        })
        .map(|i| CurvaturePeak {
            index: i,
            turn_angle: profile[i].0,
            curvature: profile[i].1,
        })
        .collect();

    let cum = cumulative_length(points);
    let total = cum.last().copied().unwrap_or(0.0);
    candidates.sort_by(|a, b| b.curvature.total_cmp(&a.curvature));
    let mut peaks: Vec<CurvaturePeak> = Vec::new();
    for cand in candidates {
        let suppressed = peaks
            .iter()
            .any(|p| arc_distance(&cum, total, closed, p.index, cand.index) <= window);
        if !suppressed {
            peaks.push(cand);
        }
    }
    peaks.sort_by_key(|p| p.index);
    peaks
}

/// Index of the strongest curvature point; where a closed chain should be
/// re-seamed. Ties go to the earliest point.
pub fn seam_index(points: &[Point], config: &TracingConfig) -> usize {
    let profile = curvature_profile(points, true, config.corner_window_length);
    let mut best = 0;
    for (i, &k) in profile.iter().enumerate() {
        if k > profile[best] {
            best = i;
        }
    }
    best
}

fn arc_distance(cum: &[f64], total: f64, closed: bool, a: usize, b: usize) -> f64 {
    let d = (cum[a] - cum[b]).abs();
    if closed {
        d.min(total - d)
    } else {
        d
    }
}

/// Classify peaks against the fitted segments, trimming corner polylines out
/// of the segments that contain unexplained peaks.
///
/// Returns the new segment list and the corners. Corner positions and
/// segment indices are provisional until [`place_corners`] runs on the
/// final segments.
pub fn apply_corners(
    points: &[Point],
    closed: bool,
    raw: &[Point],
    mut segments: Vec<Segment>,
    peaks: &[CurvaturePeak],
    config: &TracingConfig,
) -> (Vec<Segment>, Vec<Corner>) {
    let cum = cumulative_length(points);
    let total = cum.last().copied().unwrap_or(0.0);
    let mut spans = SpanFitter::new(points, raw, config);
    let mut corners = Vec::new();

    if !closed {
        corners.push(anchor(0, config));
    }

    for peak in peaks {
        let c = peak.index;
        let near_break = segments.iter().enumerate().any(|(i, seg)| {
            let b = seg.owned().start;
            (closed || i > 0) && arc_distance(&cum, total, closed, b, c) <= config.corner_radius
        });
        let corner = |kind| Corner {
            kind,
            position: points[c],
            index: c,
            turn_angle: peak.turn_angle,
            curvature: peak.curvature,
            radius: config.corner_radius,
            segments: Vec::new(),
            owned: None,
        };
        if near_break {
            corners.push(corner(CornerKind::Junction));
            continue;
        }

        let Some(s) = segments.iter().position(|seg| seg.owned().contains(c)) else {
            continue;
        };
        match &segments[s] {
            Segment::Arc(arc) if peak.curvature <= ARC_EXPLAINS / arc.radius => continue,
            Segment::Corner(_) => continue,
            _ => {}
        }

        if let Some(pieces) = trim(&mut spans, &cum, &segments[s], c, config.corner_radius) {
            segments.splice(s..=s, pieces);
            corners.push(corner(CornerKind::Trimmed));
        }
    }

    if !closed {
        corners.push(anchor(points.len() - 1, config));
    }
    (segments, corners)
}

fn anchor(index: usize, config: &TracingConfig) -> Corner {
    Corner {
        kind: CornerKind::Endpoint,
        position: Point::ZERO,
        index,
        turn_angle: 0.0,
        curvature: 0.0,
        radius: config.corner_radius,
        segments: Vec::new(),
        owned: None,
    }
}

/// Split `seg` into `[left?, corner, right?]` around chain index `c`.
fn trim(
    spans: &mut SpanFitter<'_>,
    cum: &[f64],
    seg: &Segment,
    c: usize,
    radius: f64,
) -> Option<Vec<Segment>> {
    let fit = seg.fit()?;
    let owned = seg.owned();
    let points = spans.points();

    let c0 = (owned.start..=c)
        .find(|&j| cum[c] - cum[j] <= radius)
        .unwrap_or(c);
    let c1 = (c..owned.end)
        .rev()
        .find(|&j| cum[j] - cum[c] <= radius)
        .unwrap_or(c);

    let mut pieces = Vec::with_capacity(3);
    let mut corner_start = owned.start;
    let mut polyline = Vec::new();

    if c0 >= fit.start + 2 {
        let left = spans.fit(fit.start, c0 - 1);
        let left = spans.to_segment(&left, Span::new(owned.start, c0));
        polyline.push(left.end());
        pieces.push(left);
        corner_start = c0;
    }
    polyline.extend_from_slice(&points[corner_start..=c1]);

    let right_start = c1 + 1;
    let mut corner_end = owned.end;
    let mut right = None;
    if right_start + 1 < fit.end {
        let fitted = spans.fit(right_start, fit.last());
        let seg = spans.to_segment(&fitted, Span::new(right_start, owned.end));
        polyline.push(seg.start());
        corner_end = right_start;
        right = Some(seg);
    } else if fit.last() > c1 {
        polyline.extend_from_slice(&points[c1 + 1..=fit.last()]);
    }

    if polyline.len() < 2 {
        return None;
    }
    pieces.push(Segment::Corner(CornerSegment {
        points: polyline,
        owned: Span::new(corner_start, corner_end),
    }));
    pieces.extend(right);
    Some(pieces)
}

/// Fix corner positions and segment references against the final segment
/// list, and join corner polylines to their neighbors' endpoints.
pub fn place_corners(
    corners: Vec<Corner>,
    segments: &mut [Segment],
    points: &[Point],
    closed: bool,
) -> Vec<Corner> {
    stitch_polylines(segments, closed);
    if segments.is_empty() {
        return Vec::new();
    }
    let count = segments.len();
    let unique = if closed { points.len() - 1 } else { points.len() };

    corners
        .into_iter()
        .map(|mut corner| {
            match corner.kind {
                CornerKind::Endpoint if corner.index == 0 => {
                    corner.position = segments[0].start();
                    corner.segments = vec![0];
                }
                CornerKind::Endpoint => {
                    corner.position = segments[count - 1].end();
                    corner.segments = vec![count - 1];
                }
                CornerKind::Junction => {
                    let first = usize::from(!closed);
                    let next = (first..count)
                        .min_by_key(|&i| {
                            let b = segments[i].owned().start;
                            let d = b.abs_diff(corner.index);
                            if closed {
                                d.min(unique - d)
                            } else {
                                d
                            }
                        })
                        .unwrap_or(0);
                    let prev = (next + count - 1) % count;
                    corner.position = segments[next].start();
                    corner.segments = vec![prev, next];
                }
                CornerKind::Trimmed => {
                    if let Some(k) = segments
                        .iter()
                        .position(|s| s.is_corner() && s.owned().contains(corner.index))
                    {
                        corner.segments = vec![k];
                        corner.owned = Some(segments[k].owned());
                    }
                    corner.position = points[corner.index];
                }
            }
            corner
        })
        .collect()
}

/// Corner polylines start at the previous segment's end and finish at the
/// next segment's start.
fn stitch_polylines(segments: &mut [Segment], closed: bool) {
    let count = segments.len();
    for i in 0..count {
        if !segments[i].is_corner() {
            continue;
        }
        if i > 0 || (closed && count > 1) {
            let prev = segments[(i + count - 1) % count].end();
            segments[i] = segments[i].with_start(prev);
        }
        if i + 1 < count || (closed && count > 1) {
            let next = segments[(i + 1) % count].start();
            segments[i] = segments[i].with_end(next);
        }
    }
}
