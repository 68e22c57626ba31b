//! Raw moment sums for O(1) line and circle fits.
//!
//! Sums are taken relative to a fixed origin (the first point of a chain) so
//! the cubic terms stay small. Any sub-range of a chain can be fit in O(1)
//! from the difference of two prefix entries.

use kurbo::{Point, Vec2};

use super::{CircleParams, LineParams};

/// Accumulated sums of x, y and their products up to third order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    origin: Point,
    n: f64,
    x: f64,
    y: f64,
    xx: f64,
    xy: f64,
    yy: f64,
    xxx: f64,
    xxy: f64,
    xyy: f64,
    yyy: f64,
}

/// Second and third order moments about the centroid.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Central {
    pub mean: Point,
    pub xx: f64,
    pub xy: f64,
    pub yy: f64,
    /// Mean of X·(X² + Y²).
    pub xz: f64,
    /// Mean of Y·(X² + Y²).
    pub yz: f64,
}

impl Moments {
    pub fn with_origin(origin: Point) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    /// Add one point. O(1).
    pub fn push(&mut self, p: Point) {
        let x = p.x - self.origin.x;
        let y = p.y - self.origin.y;
        self.n += 1.0;
        self.x += x;
        self.y += y;
        self.xx += x * x;
        self.xy += x * y;
        self.yy += y * y;
        self.xxx += x * x * x;
        self.xxy += x * x * y;
        self.xyy += x * y * y;
        self.yyy += y * y * y;
    }

    pub fn count(&self) -> usize {
        self.n as usize
    }

    /// Sums over the points in `self` but not in `earlier` (same origin).
    pub fn minus(&self, earlier: &Moments) -> Moments {
        Moments {
            origin: self.origin,
            n: self.n - earlier.n,
            x: self.x - earlier.x,
            y: self.y - earlier.y,
            xx: self.xx - earlier.xx,
            xy: self.xy - earlier.xy,
            yy: self.yy - earlier.yy,
            xxx: self.xxx - earlier.xxx,
            xxy: self.xxy - earlier.xxy,
            xyy: self.xyy - earlier.xyy,
            yyy: self.yyy - earlier.yyy,
        }
    }

    pub fn centroid(&self) -> Option<Point> {
        if self.n < 1.0 {
            return None;
        }
        Some(Point::new(
            self.origin.x + self.x / self.n,
            self.origin.y + self.y / self.n,
        ))
    }

    pub(crate) fn central(&self) -> Option<Central> {
        if self.n < 1.0 {
            return None;
        }
        let n = self.n;
        let mx = self.x / n;
        let my = self.y / n;

        let sxx = self.xx / n;
        let sxy = self.xy / n;
        let syy = self.yy / n;

        let cxx = (sxx - mx * mx).max(0.0);
        let cyy = (syy - my * my).max(0.0);
        let cxy = sxy - mx * my;

        // Expand E[X³], E[XY²], E[Y³], E[X²Y] about the mean.
        let x3 = self.xxx / n - 3.0 * mx * sxx + 2.0 * mx * mx * mx;
        let xy2 = self.xyy / n - 2.0 * my * sxy - mx * syy + 2.0 * mx * my * my;
        let y3 = self.yyy / n - 3.0 * my * syy + 2.0 * my * my * my;
        let x2y = self.xxy / n - 2.0 * mx * sxy - my * sxx + 2.0 * my * mx * mx;

        Some(Central {
            mean: Point::new(self.origin.x + mx, self.origin.y + my),
            xx: cxx,
            xy: cxy,
            yy: cyy,
            xz: x3 + xy2,
            yz: y3 + x2y,
        })
    }

    /// Total-least-squares line through the accumulated points.
    pub fn line(&self) -> Option<LineParams> {
        if self.n < 2.0 {
            return None;
        }
        let c = self.central()?;
        let (direction, lambda_min) = principal_axis(c.xx, c.xy, c.yy)?;
        Some(LineParams {
            origin: c.mean,
            direction,
            rms: lambda_min.max(0.0).sqrt(),
        })
    }

    /// Algebraic circle through the accumulated points.
    pub fn circle(&self) -> Option<CircleParams> {
        if self.n < 3.0 {
            return None;
        }
        solve_circle(&self.central()?)
    }
}

/// Cumulative moments over a chain: entry `i` holds the sums of the first
/// `i` points, so any inclusive range is a single subtraction.
#[derive(Debug, Clone)]
pub struct PrefixMoments {
    prefix: Vec<Moments>,
}

impl PrefixMoments {
    pub fn new(points: &[Point]) -> Self {
        let origin = points.first().copied().unwrap_or(Point::ZERO);
        let mut acc = Moments::with_origin(origin);
        let mut prefix = Vec::with_capacity(points.len() + 1);
        prefix.push(acc);
        for &p in points {
            acc.push(p);
            prefix.push(acc);
        }
        Self { prefix }
    }

    pub fn len(&self) -> usize {
        self.prefix.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Moments of points `first..=last`.
    pub fn range(&self, first: usize, last: usize) -> Moments {
        debug_assert!(first <= last && last < self.len());
        self.prefix[last + 1].minus(&self.prefix[first])
    }
}

/// Dominant eigenvector of the 2×2 covariance `[[a, b], [b, c]]` and the
/// smaller eigenvalue. `None` when the points are coincident.
///
/// Eigenvalues are `(a + c ± sqrt((a-c)² + 4b²)) / 2`; the eigenvector for
/// the larger one follows from `(A - λI)v = 0`, picking the better
/// conditioned row.
pub(crate) fn principal_axis(a: f64, b: f64, c: f64) -> Option<(Vec2, f64)> {
    let trace = a + c;
    if trace < 1e-12 {
        return None;
    }
    let disc = ((a - c).powi(2) + 4.0 * b * b).sqrt();
    let lambda_max = (trace + disc) / 2.0;
    let lambda_min = (trace - disc) / 2.0;

    let a2 = a - lambda_max;
    let c2 = c - lambda_max;

    let dir = if a2.abs() >= c2.abs() {
        let len = (b * b + a2 * a2).sqrt();
        if len > 1e-12 {
            Vec2::new(-b / len, a2 / len)
        } else {
            Vec2::new(1.0, 0.0)
        }
    } else {
        let len = (c2 * c2 + b * b).sqrt();
        if len > 1e-12 {
            Vec2::new(-c2 / len, b / len)
        } else {
            Vec2::new(1.0, 0.0)
        }
    };

    Some((dir, lambda_min))
}

/// Solve `[Mxx Mxy; Mxy Myy]·c = ½[Mxz; Myz]` for the center offset.
pub(crate) fn solve_circle(m: &Central) -> Option<CircleParams> {
    let det = m.xx * m.yy - m.xy * m.xy;
    let scale = (m.xx + m.yy).powi(2);
    if scale < 1e-12 || det.abs() < 1e-12 * scale {
        return None;
    }
    let cx = 0.5 * (m.xz * m.yy - m.yz * m.xy) / det;
    let cy = 0.5 * (m.yz * m.xx - m.xz * m.xy) / det;
    let r_sq = cx * cx + cy * cy + m.xx + m.yy;
    if !(r_sq.is_finite() && r_sq > 0.0) {
        return None;
    }
    Some(CircleParams {
        center: Point::new(m.mean.x + cx, m.mean.y + cy),
        radius: r_sq.sqrt(),
    })
}
