use kurbo::{Point, Vec2};

use super::moments::principal_axis;
use super::{LineFit, LineParams, ResidualStats};
use crate::geom::distance_to_line;

/// Total-least-squares line fit.
///
/// The line passes through the centroid along the dominant eigenvector of
/// the point covariance, which minimizes the summed squared perpendicular
/// distance. Returns `None` for fewer than two distinct points.
pub fn fit_line(points: &[Point]) -> Option<LineFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let sum = points
        .iter()
        .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
    let centroid = (sum / n).to_point();

    let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
    for p in points {
        let d = *p - centroid;
        a += d.x * d.x;
        b += d.x * d.y;
        c += d.y * d.y;
    }
    let (direction, _) = principal_axis(a / n, b / n, c / n)?;

    let residuals = points
        .iter()
        .map(|&p| distance_to_line(p, centroid, direction))
        .collect();
    let stats = ResidualStats::from_residuals(residuals);

    Some(LineFit {
        params: LineParams {
            origin: centroid,
            direction,
            rms: stats.rms,
        },
        stats,
    })
}
