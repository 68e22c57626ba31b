//! Cut-point optimizer: greedy split, breakpoint refinement, merge.
//!
//! ## Phases
//!
//! 1. **Greedy split** — fit the whole chain; while a span's max residual
//!    exceeds the error budget, split it at the point farthest from its
//!    chord (Douglas–Peucker style). Spans shorter than
//!    `min_segment_length` are never split. A closed chain that fits one
//!    line is split at the point farthest from its seam.
//! 2. **Refinement** — slide each breakpoint within `refinement_window`
//!    points to the position minimizing the two adjacent spans' error,
//!    until nothing moves or `max_iterations` is reached.
//! 3. **Merge** — repeatedly drop the breakpoint whose merged span is
//!    cheaper than keeping both halves plus `segment_penalty`, as long as
//!    the merged span still meets the error budget and a closed chain keeps
//!    more than a single line.
//!
//! All three phases share one [`SpanFitter`] cache.

use kurbo::Point;
use log::trace;

use super::span::{FitResult, SpanFitter};
use super::ChainFitter;
use crate::chain::PixelChain;
use crate::config::TracingConfig;
use crate::error::TraceError;
use crate::segment::{Segment, Span};

#[derive(Debug, Clone)]
pub struct CutPointFitter {
    config: TracingConfig,
}

impl CutPointFitter {
    pub fn new(config: &TracingConfig) -> Result<Self, TraceError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }
}

impl ChainFitter for CutPointFitter {
    fn name(&self) -> &'static str {
        "cut-point"
    }

    fn fit_chain(&self, chain: &PixelChain, raw: &[Point]) -> Vec<Segment> {
        let mut spans = SpanFitter::new(chain.points(), raw, &self.config);
        let closed = chain.is_closed();
        let mut breaks = greedy_breakpoints(&mut spans, closed, &self.config);
        let greedy = breaks.len() - 1;
        let iterations = refine_breakpoints(&mut spans, &mut breaks, &self.config);
        let merges = merge_breakpoints(&mut spans, &mut breaks, closed, &self.config);
        trace!(
            "chain of {} points: {} greedy spans, {} refinement passes, {} merges \
             adding {:.3} squared error, {} fits cached",
            chain.len(),
            greedy,
            iterations,
            merges.len(),
            merges.iter().map(Merge::added_error).sum::<f64>(),
            spans.cached(),
        );
        segments_from_breakpoints(&mut spans, &breaks, closed)
    }
}

/// Phase 1. Returns sorted breakpoints including both chain ends.
pub(crate) fn greedy_breakpoints(
    spans: &mut SpanFitter<'_>,
    closed: bool,
    config: &TracingConfig,
) -> Vec<usize> {
    let last = spans.points().len() - 1;
    let mut breaks = vec![0, last];
    let mut stack = vec![(0, last)];

    while let Some((first, last)) = stack.pop() {
        if last - first + 1 < config.min_segment_length {
            continue;
        }
        if spans.fit(first, last).max_residual <= config.max_segment_error {
            continue;
        }
        let Some(k) = spans.farthest_from_chord(first, last) else {
            continue;
        };
        breaks.push(k);
        stack.push((first, k));
        stack.push((k, last));
    }

    breaks.sort_unstable();
    breaks.dedup();

    // One line over a loop would start and end on the seam.
    if closed && breaks.len() == 2 && spans.fit(0, last).primitive.is_line() {
        if let Some(k) = spans.farthest_from_chord(0, last) {
            breaks.insert(1, k);
        }
    }
    breaks
}

/// Phase 2. Returns the number of passes run.
pub(crate) fn refine_breakpoints(
    spans: &mut SpanFitter<'_>,
    breaks: &mut [usize],
    config: &TracingConfig,
) -> usize {
    let window = config.refinement_window;
    if window == 0 || breaks.len() < 3 {
        return 0;
    }

    let pair = |spans: &mut SpanFitter<'_>, a: usize, b: usize, c: usize| {
        let left = spans.fit(a, b);
        let right = spans.fit(b, c);
        (left.error + right.error, left.max_residual.max(right.max_residual))
    };

    let mut passes = 0;
    while passes < config.max_iterations {
        passes += 1;
        let mut moved = false;
        for i in 1..breaks.len() - 1 {
            let (a, b, c) = (breaks[i - 1], breaks[i], breaks[i + 1]);
            let lo = b.saturating_sub(window).max(a + 1);
            let hi = (b + window).min(c - 1);
            if lo > hi {
                continue;
            }

            let (mut best_cost, current_max) = pair(spans, a, b, c);
            let budget = current_max.max(config.max_segment_error);
            let mut best = b;
            for cand in lo..=hi {
                if cand == b {
                    continue;
                }
                let (cost, max) = pair(spans, a, cand, c);
                if max <= budget && cost < best_cost - 1e-9 {
                    best = cand;
                    best_cost = cost;
                }
            }
            if best != b {
                breaks[i] = best;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
    passes
}

/// One accepted merge.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Merge {
    pub merged: FitResult,
    pub left: FitResult,
    pub right: FitResult,
}

impl Merge {
    /// Squared error the merged fit adds over the two halves.
    pub fn added_error(&self) -> f64 {
        self.merged.error - (self.left.error + self.right.error)
    }
}

/// Phase 3. Removes breakpoints best-gain first.
pub(crate) fn merge_breakpoints(
    spans: &mut SpanFitter<'_>,
    breaks: &mut Vec<usize>,
    closed: bool,
    config: &TracingConfig,
) -> Vec<Merge> {
    let mut merges = Vec::new();
    loop {
        let mut best: Option<(usize, f64, Merge)> = None;
        for i in 1..breaks.len().saturating_sub(1) {
            let (a, b, c) = (breaks[i - 1], breaks[i], breaks[i + 1]);
            let merged = spans.fit(a, c);
            if merged.max_residual > config.max_segment_error {
                continue;
            }
            if closed && breaks.len() == 3 && merged.primitive.is_line() {
                continue;
            }
            let left = spans.fit(a, b);
            let right = spans.fit(b, c);
            let keep = left.error + right.error + config.segment_penalty;
            if merged.error >= keep {
                continue;
            }
            let gain = keep - merged.error;
            if best.as_ref().map_or(true, |(_, g, _)| gain > *g) {
                best = Some((i, gain, Merge { merged, left, right }));
            }
        }
        let Some((i, _, merge)) = best else {
            break;
        };
        breaks.remove(i);
        merges.push(merge);
    }
    merges
}

/// Build segments; adjacent fits share their breakpoint while ownership
/// hands each breakpoint to the span that starts there.
pub(crate) fn segments_from_breakpoints(
    spans: &mut SpanFitter<'_>,
    breaks: &[usize],
    closed: bool,
) -> Vec<Segment> {
    let n = spans.points().len();
    let owned_end = if closed { n - 1 } else { n };
    let count = breaks.len() - 1;
    (0..count)
        .map(|i| {
            let (a, b) = (breaks[i], breaks[i + 1]);
            let fit = spans.fit(a, b);
            let end = if i + 1 == count { owned_end } else { b };
            spans.to_segment(&fit, Span::new(a, end))
        })
        .collect()
}
