//! Closed-form least-squares fitters for lines and circles.
//!
//! Batch fits (`fit_line`, `fit_circle`) take a point slice and report full
//! residual statistics. Incremental fits go through [`Moments`] and
//! [`PrefixMoments`], which give the same parameters in O(1) per query.
//! Degenerate input (coincident or collinear points, singular systems)
//! yields `None`, never a panic.

mod circle;
mod line;
mod moments;

pub use circle::fit_circle;
pub use line::fit_line;
pub use moments::{Moments, PrefixMoments};

use kurbo::{Point, Vec2};
use serde::Serialize;

use crate::geom;

/// Line parameters: a point on the line and a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineParams {
    pub origin: Point,
    pub direction: Vec2,
    /// RMS perpendicular distance, available in O(1) from the moments.
    pub rms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleParams {
    pub center: Point,
    pub radius: f64,
}

/// Summary of absolute residuals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResidualStats {
    pub rms: f64,
    pub median: f64,
    pub max: f64,
    /// Sum of squared residuals.
    pub sse: f64,
}

impl ResidualStats {
    pub fn from_residuals(mut residuals: Vec<f64>) -> Self {
        if residuals.is_empty() {
            return Self::default();
        }
        let n = residuals.len();
        let sse: f64 = residuals.iter().map(|r| r * r).sum();
        let max = residuals.iter().copied().fold(0.0, f64::max);
        residuals.sort_by(f64::total_cmp);
        let median = if n % 2 == 1 {
            residuals[n / 2]
        } else {
            0.5 * (residuals[n / 2 - 1] + residuals[n / 2])
        };
        Self {
            rms: (sse / n as f64).sqrt(),
            median,
            max,
            sse,
        }
    }
}

/// A fitted line with its residuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub params: LineParams,
    pub stats: ResidualStats,
}

/// A fitted circle with its residuals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    pub params: CircleParams,
    pub stats: ResidualStats,
}

/// The geometric carrier of a fitted span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Line { origin: Point, direction: Vec2 },
    Circle { center: Point, radius: f64 },
}

impl Primitive {
    /// Unsigned distance from `p` to the primitive's carrier.
    #[inline]
    pub fn residual(&self, p: Point) -> f64 {
        match *self {
            Primitive::Line { origin, direction } => geom::distance_to_line(p, origin, direction),
            Primitive::Circle { center, radius } => (p.distance(center) - radius).abs(),
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self, Primitive::Line { .. })
    }
}

impl From<LineParams> for Primitive {
    fn from(l: LineParams) -> Self {
        Primitive::Line {
            origin: l.origin,
            direction: l.direction,
        }
    }
}

impl From<CircleParams> for Primitive {
    fn from(c: CircleParams) -> Self {
        Primitive::Circle {
            center: c.center,
            radius: c.radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residual_stats_of_known_values() {
        let stats = ResidualStats::from_residuals(vec![3.0, 0.0, 4.0, 1.0]);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.median, 2.0);
        assert_eq!(stats.sse, 26.0);
        assert!((stats.rms - (26.0f64 / 4.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_residuals_are_zero() {
        assert_eq!(ResidualStats::from_residuals(vec![]), ResidualStats::default());
    }
}
