use kurbo::{Point, Vec2};

use super::moments::{solve_circle, Central};
use super::{CircleFit, CircleParams, ResidualStats};

/// Algebraic circle fit on centered moments.
///
/// With `X, Y` the coordinates relative to the centroid and `z = X² + Y²`,
/// the center offset solves `[Mxx Mxy; Mxy Myy]·c = ½[Mxz; Myz]` and the
/// radius is `sqrt(cx² + cy² + Mxx + Myy)`. Collinear or coincident points
/// make the system singular and return `None`.
pub fn fit_circle(points: &[Point]) -> Option<CircleFit> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;
    let sum = points
        .iter()
        .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
    let mean = (sum / n).to_point();

    let mut m = Central {
        mean,
        xx: 0.0,
        xy: 0.0,
        yy: 0.0,
        xz: 0.0,
        yz: 0.0,
    };
    for p in points {
        let d = *p - mean;
        let z = d.x * d.x + d.y * d.y;
        m.xx += d.x * d.x;
        m.xy += d.x * d.y;
        m.yy += d.y * d.y;
        m.xz += d.x * z;
        m.yz += d.y * z;
    }
    m.xx /= n;
    m.xy /= n;
    m.yy /= n;
    m.xz /= n;
    m.yz /= n;

    let CircleParams { center, radius } = solve_circle(&m)?;
    let residuals = points
        .iter()
        .map(|p| (p.distance(center) - radius).abs())
        .collect();

    Some(CircleFit {
        params: CircleParams { center, radius },
        stats: ResidualStats::from_residuals(residuals),
    })
}
