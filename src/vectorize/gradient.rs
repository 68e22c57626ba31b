//! Node/sagitta gradient optimizer.
//!
//! Seeds a polyline with Douglas–Peucker (`geo`), gives every span a
//! sagitta (signed bulge of its midpoint off the chord), then moves interior
//! nodes and sagittas downhill on the summed squared distance from the chain
//! points to their span's line or arc. Chain ends and the seam of a closed
//! chain stay fixed.
//!
//! Raw stroke pixels are not used by this optimizer.

use std::f64::consts::FRAC_PI_2;

use geo::{Coord, LineString, SimplifyIdx};
use kurbo::{Point, Vec2};
use log::trace;

use super::ChainFitter;
use crate::chain::PixelChain;
use crate::config::TracingConfig;
use crate::error::TraceError;
use crate::geom::{angle_of, distance_to_arc, distance_to_segment, rotate, wrap_to_pi};
use crate::segment::{ArcSegment, LineSegment, Segment, Span};

/// Sagittas smaller than this (pixels) are emitted as lines.
const FLAT_SAGITTA: f64 = 0.05;

/// Central-difference step for the numeric gradient.
const GRADIENT_STEP: f64 = 1e-4;

/// Gradient steps per configured iteration.
const STEPS_PER_ITERATION: usize = 8;

#[derive(Debug, Clone)]
pub struct GradientFitter {
    config: TracingConfig,
}

impl GradientFitter {
    pub fn new(config: &TracingConfig) -> Result<Self, TraceError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }
}

impl ChainFitter for GradientFitter {
    fn name(&self) -> &'static str {
        "gradient"
    }

    fn fit_chain(&self, chain: &PixelChain, _raw: &[Point]) -> Vec<Segment> {
        let points = chain.points();
        let breaks = seed_breakpoints(points, chain.is_closed(), self.config.max_segment_error);
        let mut problem = Problem::new(points, breaks);
        let initial = problem.cost(&problem.params);
        let steps = problem.descend(self.config.max_iterations * STEPS_PER_ITERATION);
        trace!(
            "gradient fit of {} points: {} spans, cost {:.3} -> {:.3} in {} steps",
            points.len(),
            problem.breaks.len() - 1,
            initial,
            problem.cost(&problem.params),
            steps,
        );
        problem.segments(chain.is_closed(), self.config.max_radius_ratio)
    }
}

/// Douglas–Peucker vertex indices, always including both chain ends.
fn seed_breakpoints(points: &[Point], closed: bool, epsilon: f64) -> Vec<usize> {
    let line: LineString<f64> = points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    let mut breaks = line.simplify_idx(&epsilon);
    let last = points.len() - 1;
    breaks.push(0);
    breaks.push(last);
    breaks.sort_unstable();
    breaks.dedup();

    if closed && breaks.len() < 3 {
        let far = (1..last).max_by(|&a, &b| {
            points[a]
                .distance(points[0])
                .total_cmp(&points[b].distance(points[0]))
        });
        if let Some(k) = far {
            breaks.insert(1, k);
        }
    }
    breaks
}

/// A span's carrier: the chord, or the arc bulging `sagitta` off it.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Chord {
        a: Point,
        b: Point,
    },
    Arc {
        center: Point,
        radius: f64,
        start: f64,
        sweep: f64,
    },
}

impl Shape {
    fn new(a: Point, b: Point, sagitta: f64) -> Shape {
        let chord = b - a;
        let c = chord.hypot();
        if c < 1e-9 || sagitta.abs() < 1e-6 {
            return Shape::Chord { a, b };
        }
        let d = chord / c;
        let nrm = rotate(d, FRAC_PI_2);
        let h = c / 2.0;
        let radius = (h * h + sagitta * sagitta) / (2.0 * sagitta.abs());
        let bulge = a.midpoint(b) + nrm * sagitta;
        let center = bulge - nrm * sagitta.signum() * radius;
        let a0 = angle_of(a, center);
        let am = angle_of(bulge, center);
        let a1 = angle_of(b, center);
        Shape::Arc {
            center,
            radius,
            start: a0,
            sweep: wrap_to_pi(am - a0) + wrap_to_pi(a1 - am),
        }
    }

    fn distance(&self, p: Point) -> f64 {
        match *self {
            Shape::Chord { a, b } => distance_to_segment(p, a, b),
            Shape::Arc {
                center,
                radius,
                start,
                sweep,
            } => distance_to_arc(p, center, radius, start, sweep),
        }
    }
}

/// Parameters: free node coordinates (x, y per interior node) followed by
/// one sagitta per span.
struct Problem<'a> {
    points: &'a [Point],
    breaks: Vec<usize>,
    params: Vec<f64>,
}

impl<'a> Problem<'a> {
    fn new(points: &'a [Point], breaks: Vec<usize>) -> Self {
        let spans = breaks.len() - 1;
        let mut params = Vec::with_capacity(2 * (spans - 1) + spans);
        for &k in &breaks[1..spans] {
            params.push(points[k].x);
            params.push(points[k].y);
        }
        for w in breaks.windows(2) {
            let (a, b) = (points[w[0]], points[w[1]]);
            let mid = points[(w[0] + w[1]) / 2];
            let chord = b - a;
            let c = chord.hypot();
            let s = if c > 1e-9 {
                let nrm = rotate(chord, FRAC_PI_2) / c;
                (mid - a.midpoint(b)).dot(nrm)
            } else {
                0.0
            };
            params.push(s);
        }
        Self {
            points,
            breaks,
            params,
        }
    }

    fn spans(&self) -> usize {
        self.breaks.len() - 1
    }

    fn node(&self, params: &[f64], i: usize) -> Point {
        if i == 0 || i == self.spans() {
            self.points[self.breaks[i]]
        } else {
            Point::new(params[2 * (i - 1)], params[2 * (i - 1) + 1])
        }
    }

    fn sagitta(&self, params: &[f64], span: usize) -> f64 {
        params[2 * (self.spans() - 1) + span]
    }

    fn shape(&self, params: &[f64], span: usize) -> Shape {
        Shape::new(
            self.node(params, span),
            self.node(params, span + 1),
            self.sagitta(params, span),
        )
    }

    fn cost(&self, params: &[f64]) -> f64 {
        (0..self.spans())
            .map(|j| {
                let shape = self.shape(params, j);
                self.points[self.breaks[j]..=self.breaks[j + 1]]
                    .iter()
                    .map(|&p| shape.distance(p).powi(2))
                    .sum::<f64>()
            })
            .sum()
    }

    fn gradient(&self, params: &[f64]) -> Vec<f64> {
        let mut probe = params.to_vec();
        (0..params.len())
            .map(|k| {
                let x = probe[k];
                probe[k] = x + GRADIENT_STEP;
                let up = self.cost(&probe);
                probe[k] = x - GRADIENT_STEP;
                let down = self.cost(&probe);
                probe[k] = x;
                (up - down) / (2.0 * GRADIENT_STEP)
            })
            .collect()
    }

    /// Steepest descent with a backtracking line search. Returns the
    /// number of accepted steps.
    fn descend(&mut self, max_steps: usize) -> usize {
        let mut cost = self.cost(&self.params);
        let mut step = 1.0;
        for taken in 0..max_steps {
            let grad = self.gradient(&self.params);
            let norm_sq: f64 = grad.iter().map(|g| g * g).sum();
            if norm_sq < 1e-18 {
                return taken;
            }
            let mut accepted = None;
            for _ in 0..30 {
                let trial: Vec<f64> = self
                    .params
                    .iter()
                    .zip(&grad)
                    .map(|(x, g)| x - step * g)
                    .collect();
                let trial_cost = self.cost(&trial);
                if trial_cost < cost - 1e-4 * step * norm_sq {
                    accepted = Some((trial, trial_cost));
                    break;
                }
                step *= 0.5;
            }
            let Some((params, new_cost)) = accepted else {
                return taken;
            };
            self.params = params;
            cost = new_cost;
            step *= 2.0;
        }
        max_steps
    }

    fn segments(&self, closed: bool, max_radius_ratio: f64) -> Vec<Segment> {
        let n = self.points.len();
        let owned_end = if closed { n - 1 } else { n };
        let count = self.spans();
        (0..count)
            .map(|j| {
                let (first, last) = (self.breaks[j], self.breaks[j + 1]);
                let fit = Span::inclusive(first, last);
                let owned = Span::new(first, if j + 1 == count { owned_end } else { last });
                let a = self.node(&self.params, j);
                let b = self.node(&self.params, j + 1);
                let chord = a.distance(b);
                let sagitta = self.sagitta(&self.params, j);

                let shape = match self.shape(&self.params, j) {
                    Shape::Arc { radius, .. }
                        if sagitta.abs() < FLAT_SAGITTA || radius > max_radius_ratio * chord =>
                    {
                        Shape::Chord { a, b }
                    }
                    shape => shape,
                };
                let (error, max_residual) = self.points[first..=last].iter().fold(
                    (0.0, 0.0f64),
                    |(sse, max), &p| {
                        let r = shape.distance(p);
                        (sse + r * r, max.max(r))
                    },
                );

                match shape {
                    Shape::Arc {
                        center,
                        radius,
                        start,
                        sweep,
                    } => Segment::Arc(ArcSegment {
                        center,
                        radius,
                        start_angle: start,
                        end_angle: start + sweep,
                        start: a,
                        end: b,
                        fit,
                        owned,
                        error,
                        max_residual,
                    }),
                    Shape::Chord { a, b } => {
                        let d = b - a;
                        let len = d.hypot();
                        let direction = if len > 1e-12 { d / len } else { Vec2::new(1.0, 0.0) };
                        Segment::Line(LineSegment {
                            origin: a,
                            direction,
                            start: a,
                            end: b,
                            fit,
                            owned,
                            error,
                            max_residual,
                        })
                    }
                }
            })
            .collect()
    }
}
