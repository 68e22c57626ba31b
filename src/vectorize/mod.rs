//! Vectorization pipeline: path graph → lines, arcs and corners.
//!
//! 1. Re-seam node-less loops at their strongest curvature point; a loop
//!    walked from a node keeps that node as its seam
//! 2. Fit each chain with a [`ChainFitter`] (cut-point by default)
//! 3. Detect curvature peaks and trim unexplained ones into corners
//! 4. Snap shared endpoints to exact intersections
//!
//! Chains are independent and run in parallel; results come back in graph
//! edge order.

pub mod cutpoint;
pub mod gradient;
mod span;

pub use cutpoint::CutPointFitter;
pub use gradient::GradientFitter;
pub use span::{FitResult, SpanFitter};

use std::collections::HashMap;

use kurbo::Point;
use log::debug;
use rayon::prelude::*;

use crate::chain::PixelChain;
use crate::config::{FitterKind, TracingConfig};
use crate::corners;
use crate::error::TraceError;
use crate::junction;
use crate::mask::PixelMask;
use crate::segment::Segment;
use crate::trace::{Edge, Graph};
use crate::TracedPath;

/// Turns one pixel chain into an ordered list of primitives whose owned
/// ranges partition the chain's unique points.
pub trait ChainFitter: Send + Sync {
    fn name(&self) -> &'static str;

    /// `raw` holds the stroke pixels assigned to this chain (may be empty).
    fn fit_chain(&self, chain: &PixelChain, raw: &[Point]) -> Vec<Segment>;
}

/// The chain optimizer selected by `config.fitter`.
pub fn fitter_for(config: &TracingConfig) -> Result<Box<dyn ChainFitter>, TraceError> {
    Ok(match config.fitter {
        FitterKind::CutPoint => Box::new(CutPointFitter::new(config)?),
        FitterKind::Gradient => Box::new(GradientFitter::new(config)?),
    })
}

/// Fit every edge of `graph` long enough to carry a primitive.
pub fn vectorize(
    graph: &Graph,
    raw: Option<&PixelMask>,
    config: &TracingConfig,
) -> Result<Vec<TracedPath>, TraceError> {
    let fitter = fitter_for(config)?;
    let edges: Vec<&Edge> = graph
        .iter_edges()
        .filter(|e| e.points.len() >= config.min_chain_points)
        .collect();
    let skipped = graph.edges.len() - edges.len();
    if skipped > 0 {
        debug!("skipping {skipped} edges shorter than {} points", config.min_chain_points);
    }

    let raw_by_edge = match raw {
        Some(mask) => distribute_raw(graph, mask, config.raw_tolerance),
        None => HashMap::new(),
    };

    let paths = edges
        .par_iter()
        .filter_map(|edge| {
            let chain = edge.chain()?;
            let chain = if edge.a.is_none() {
                reseam(&chain, config)
            } else {
                chain
            };
            let raw = raw_by_edge.get(&edge.id).map_or(&[][..], Vec::as_slice);
            let mut path = fit_path(&chain, raw, fitter.as_ref(), config);
            path.start_node = edge.a;
            path.end_node = edge.b;
            Some(path)
        })
        .collect();
    Ok(paths)
}

/// A closed chain rotated to start at its strongest curvature point. Open
/// chains come back unchanged.
pub fn reseam(chain: &PixelChain, config: &TracingConfig) -> PixelChain {
    if chain.is_closed() {
        chain.rotated(corners::seam_index(chain.points(), config))
    } else {
        chain.clone()
    }
}

/// Run the per-chain stages on one chain, starting where the chain starts.
pub fn fit_path(
    chain: &PixelChain,
    raw: &[Point],
    fitter: &dyn ChainFitter,
    config: &TracingConfig,
) -> TracedPath {
    let points = chain.points();
    let closed = chain.is_closed();

    let segments = fitter.fit_chain(chain, raw);
    let peaks = corners::detect_corners(points, closed, config);
    let (segments, found) = corners::apply_corners(points, closed, raw, segments, &peaks, config);
    let mut segments = junction::resolve_junctions(
        &segments,
        closed,
        config.max_junction_extension,
        config.max_segment_error,
    );
    let corners = corners::place_corners(found, &mut segments, points, closed);

    TracedPath {
        points: points.to_vec(),
        closed,
        segments,
        corners,
        start_node: None,
        end_node: None,
    }
}

/// Hand each raw stroke pixel within `tolerance` of a skeleton pixel to the
/// edge that skeleton pixel belongs to. Skeleton pixels themselves are
/// skipped since they are already chain points.
fn distribute_raw(graph: &Graph, raw: &PixelMask, tolerance: f64) -> HashMap<usize, Vec<Point>> {
    let mut owner: HashMap<(i64, i64), usize> = HashMap::new();
    for edge in graph.iter_edges() {
        for p in &edge.points {
            owner.entry((p.x as i64, p.y as i64)).or_insert(edge.id);
        }
    }

    let reach = tolerance.ceil().max(1.0) as i64;
    let mut out: HashMap<usize, Vec<Point>> = HashMap::new();
    for (x, y) in raw.iter_foreground() {
        let (x, y) = (x as i64, y as i64);
        if owner.contains_key(&(x, y)) {
            continue;
        }
        let mut best: Option<(i64, usize)> = None;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let Some(&edge) = owner.get(&(x + dx, y + dy)) else {
                    continue;
                };
                let d2 = dx * dx + dy * dy;
                if (d2 as f64) > tolerance * tolerance {
                    continue;
                }
                if best.map_or(true, |(bd, _)| d2 < bd) {
                    best = Some((d2, edge));
                }
            }
        }
        if let Some((_, edge)) = best {
            out.entry(edge).or_default().push(Point::new(x as f64, y as f64));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corners::CornerKind;
    use crate::trace::build_graph;

    #[test]
    fn fitter_follows_config() {
        let mut config = TracingConfig::default();
        assert_eq!(fitter_for(&config).unwrap().name(), "cut-point");
        config.fitter = FitterKind::Gradient;
        assert_eq!(fitter_for(&config).unwrap().name(), "gradient");
        config.max_segment_error = 0.0;
        assert!(fitter_for(&config).is_err());
    }

    #[test]
    fn short_edges_are_skipped() {
        let mask = PixelMask::from_ascii(
            "
            ##....
            ......
            ..####
            ",
        );
        let graph = build_graph(&mask);
        let config = TracingConfig {
            min_chain_points: 3,
            ..TracingConfig::default()
        };
        let paths = vectorize(&graph, None, &config).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].points.len(), 4);
    }

    #[test]
    fn square_loop_is_re_seamed_at_a_corner() {
        let mask = PixelMask::from_ascii(
            "
            .......
            .#####.
            .#...#.
            .#...#.
            .#####.
            ",
        );
        let graph = build_graph(&mask);
        let paths = vectorize(&graph, None, &TracingConfig::default()).unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert!(path.closed);
        let corners = [(1.0, 1.0), (5.0, 1.0), (5.0, 4.0), (1.0, 4.0)];
        let seam = path.points[0];
        assert!(corners.contains(&(seam.x, seam.y)), "seam at {seam:?}");
        assert!(path.corners.iter().all(|c| c.kind != CornerKind::Endpoint));
    }

    #[test]
    fn raw_pixels_go_to_the_nearest_edge() {
        let skeleton = PixelMask::from_ascii(
            "
            ......
            .####.
            ......
            ",
        );
        let raw = PixelMask::from_ascii(
            "
            .####.
            .####.
            .####.
            ",
        );
        let graph = build_graph(&skeleton);
        let by_edge = distribute_raw(&graph, &raw, 1.5);
        assert_eq!(by_edge.len(), 1);
        assert_eq!(by_edge[&0].len(), 8);
    }
}
