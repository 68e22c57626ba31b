//! img2arc: binary pixel masks → lines and circular arcs.
//!
//! Traces thin (skeletonized) line art into chains of straight lines,
//! circular arcs and short corner polylines, ready for G-code (`G1`/`G2`/
//! `G3`) or SVG output.
//!
//! # Example
//!
//! ```no_run
//! use img2arc::{trace, TracingConfig};
//! use std::path::Path;
//!
//! let config = TracingConfig::default();
//! let result = trace(Path::new("drawing.png"), &config)?;
//! let (lines, arcs, corners) = result.counts();
//! println!("{lines} lines, {arcs} arcs, {corners} corner polylines");
//! # Ok::<(), img2arc::TraceError>(())
//! ```

#![forbid(unsafe_code)]

mod bitmap;
mod config;
mod mask;

pub mod chain;
pub mod corners;
pub mod error;
pub mod fit;
pub mod geom;
pub mod junction;
pub mod output;
pub mod segment;
pub mod trace;
pub mod vectorize;

#[cfg(feature = "render")]
pub mod render;

// Re-export kurbo so downstream users get the same version used by the
// segment geometry.
pub use kurbo;

pub use bitmap::{binarize, load_and_threshold, load_mask};
pub use chain::PixelChain;
pub use config::{FitterKind, ThresholdMethod, TracingConfig};
pub use corners::{Corner, CornerKind};
pub use error::TraceError;
pub use mask::PixelMask;
pub use segment::{ArcSegment, CornerSegment, LineSegment, Segment, Span, Winding};
pub use trace::NodeId;

use std::path::Path;
use std::time::Instant;

use kurbo::Point;
use log::info;
use serde::Serialize;

/// One traced path: an edge of the path graph and its primitives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracedPath {
    /// The chain the primitives were fitted to. A closed path repeats its
    /// first point at the end.
    pub points: Vec<Point>,
    pub closed: bool,
    /// Primitives in path order; their owned ranges partition the unique
    /// points.
    pub segments: Vec<Segment>,
    pub corners: Vec<Corner>,
    /// Graph node the path starts at; `None` for node-less loops.
    pub start_node: Option<NodeId>,
    /// Graph node the path ends at; `None` for loops and truncated walks.
    pub end_node: Option<NodeId>,
}

/// The result of tracing a mask.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceResult {
    pub width: u32,
    pub height: u32,
    pub paths: Vec<TracedPath>,
}

impl TraceResult {
    /// Number of (lines, arcs, corner polylines) over all paths.
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for seg in self.paths.iter().flat_map(|p| &p.segments) {
            match seg {
                Segment::Line(_) => counts.0 += 1,
                Segment::Arc(_) => counts.1 += 1,
                Segment::Corner(_) => counts.2 += 1,
            }
        }
        counts
    }
}

/// Full pipeline: image file → lines and arcs.
///
/// The image is thresholded (Otsu or fixed, see [`TracingConfig::threshold`])
/// and traced as-is; it should already be thin line art.
pub fn trace(image_path: &Path, config: &TracingConfig) -> Result<TraceResult, TraceError> {
    config.validate()?;
    let mask = bitmap::load_mask(image_path, config)?;
    info!(
        "loaded {}: {}x{} px, {} foreground",
        image_path.display(),
        mask.width(),
        mask.height(),
        mask.count_foreground(),
    );
    let result = trace_mask(&mask, config)?;
    if result.paths.is_empty() {
        return Err(TraceError::NoPaths);
    }
    Ok(result)
}

/// Trace a mask into lines and arcs. An empty mask gives an empty result.
pub fn trace_mask(mask: &PixelMask, config: &TracingConfig) -> Result<TraceResult, TraceError> {
    trace_mask_with_raw(mask, None, config)
}

/// Trace a skeleton mask, scoring fits against the raw (pre-skeleton)
/// stroke pixels near each chain as well.
pub fn trace_mask_with_raw(
    mask: &PixelMask,
    raw: Option<&PixelMask>,
    config: &TracingConfig,
) -> Result<TraceResult, TraceError> {
    config.validate()?;
    if let Some(raw) = raw {
        if (raw.width(), raw.height()) != (mask.width(), mask.height()) {
            return Err(TraceError::InvalidMask(format!(
                "raw mask is {}x{} but the skeleton is {}x{}",
                raw.width(),
                raw.height(),
                mask.width(),
                mask.height()
            )));
        }
    }
    let t_start = Instant::now();

    // ── Path graph ────────────────────────────────────────
    let graph = trace::build_graph(mask);
    info!(
        "graph: {} nodes ({} junctions), {} edges",
        graph.nodes.len(),
        graph.num_junctions(),
        graph.edges.len(),
    );

    // ── Fit, corners, junctions ──────────────────────────
    let paths = vectorize::vectorize(&graph, raw, config)?;
    let result = TraceResult {
        width: mask.width(),
        height: mask.height(),
        paths,
    };

    let (lines, arcs, corners) = result.counts();
    info!(
        "traced {} paths -> {} lines, {} arcs, {} corner polylines ({}ms)",
        result.paths.len(),
        lines,
        arcs,
        corners,
        t_start.elapsed().as_millis(),
    );
    Ok(result)
}

/// Fit a single chain directly, without a mask. A closed chain is re-seamed
/// at its strongest curvature point first.
pub fn trace_chain(chain: &PixelChain, config: &TracingConfig) -> Result<TracedPath, TraceError> {
    let fitter = vectorize::fitter_for(config)?;
    let chain = vectorize::reseam(chain, config);
    Ok(vectorize::fit_path(&chain, &[], fitter.as_ref(), config))
}
