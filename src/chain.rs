use kurbo::Point;

use crate::geom::cumulative_length;

/// An ordered run of pixel centers, at least two points long.
///
/// A closed chain repeats its first point at the end, so `points.first() ==
/// points.last()` and the number of distinct pixels is `len() - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelChain {
    points: Vec<Point>,
    closed: bool,
}

impl PixelChain {
    /// Open chain; `None` for fewer than two points.
    pub fn open(points: Vec<Point>) -> Option<Self> {
        (points.len() >= 2).then_some(Self {
            points,
            closed: false,
        })
    }

    /// Closed chain from a loop of distinct points (the closing repeat is
    /// appended here if missing).
    pub fn closed(mut points: Vec<Point>) -> Option<Self> {
        if points.len() >= 2 && points.first() != points.last() {
            let first = points[0];
            points.push(first);
        }
        (points.len() >= 3).then_some(Self {
            points,
            closed: true,
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Points without the closing repeat.
    pub fn unique_points(&self) -> &[Point] {
        if self.closed {
            &self.points[..self.points.len() - 1]
        } else {
            &self.points
        }
    }

    pub fn arc_length(&self) -> f64 {
        cumulative_length(&self.points).last().copied().unwrap_or(0.0)
    }

    /// A closed chain re-seamed to start at unique point `start`.
    /// Open chains are returned unchanged.
    pub fn rotated(&self, start: usize) -> PixelChain {
        if !self.closed {
            return self.clone();
        }
        let unique = self.unique_points();
        let start = start % unique.len();
        let mut points: Vec<Point> = unique[start..]
            .iter()
            .chain(&unique[..start])
            .copied()
            .collect();
        points.push(points[0]);
        PixelChain {
            points,
            closed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn closed_chain_repeats_first_point() {
        let chain = PixelChain::closed(square()).unwrap();
        assert_eq!(chain.len(), 5);
        assert_eq!(chain.points()[0], chain.points()[4]);
        assert_eq!(chain.unique_points().len(), 4);
        assert!((chain.arc_length() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn rotation_keeps_cycle_order() {
        let chain = PixelChain::closed(square()).unwrap().rotated(2);
        assert_eq!(chain.points()[0], Point::new(1.0, 1.0));
        assert_eq!(chain.points()[1], Point::new(0.0, 1.0));
        assert_eq!(chain.points()[4], Point::new(1.0, 1.0));
    }

    #[test]
    fn single_point_is_not_a_chain() {
        assert!(PixelChain::open(vec![Point::ZERO]).is_none());
        assert!(PixelChain::open(vec![Point::ZERO, Point::new(1.0, 0.0)]).is_some());
    }
}
