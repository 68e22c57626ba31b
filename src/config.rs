use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TraceError;

/// All tracing parameters in one struct.
/// Serializable so presets can be saved and loaded as JSON; every field has
/// a default, so a preset only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    // -- Bitmap stage --
    /// Threshold method for converting a grayscale image to a mask.
    pub threshold: ThresholdMethod,
    /// If true, invert the image (swap foreground/background) before tracing.
    pub invert: bool,

    // -- Tracer --
    /// Chains with fewer points than this are not fitted.
    /// Their pixels still count as traced.
    pub min_chain_points: usize,

    // -- Segment fitting --
    /// Which chain optimizer turns pixel chains into primitives.
    pub fitter: FitterKind,
    /// Maximum allowed residual (pixels) between a primitive and any point
    /// it accounts for. Spans above this are split.
    pub max_segment_error: f64,
    /// Spans with fewer points than this are never split further.
    pub min_segment_length: usize,
    /// Cost added per primitive when deciding whether to merge two spans,
    /// in squared pixels. Higher = fewer, longer primitives.
    pub segment_penalty: f64,
    /// Breakpoint search radius (in chain points) for local refinement.
    pub refinement_window: usize,
    /// Iteration cap for refinement and for the gradient optimizer.
    pub max_iterations: usize,
    /// Arcs whose radius exceeds this multiple of the span extent are
    /// emitted as lines instead.
    pub max_radius_ratio: f64,
    /// Distance (pixels) within which raw stroke pixels count as on the
    /// primitive when a raw mask is supplied.
    pub raw_tolerance: f64,

    // -- Corner detection --
    /// Arc length (pixels) of each of the backward/forward windows used to
    /// estimate the local direction.
    pub corner_window_length: f64,
    /// Minimum curvature (radians of turn per pixel of window) for a
    /// curvature peak to be a corner.
    pub curvature_threshold: f64,
    /// Arc length (pixels) on each side of a corner that the corner claims.
    pub corner_radius: f64,

    // -- Junctions --
    /// How far (pixels) a shared endpoint may move to reach the exact
    /// intersection of its two primitives.
    pub max_junction_extension: f64,
}

/// Threshold method for converting a grayscale image to binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdMethod {
    /// Fixed brightness threshold (0-255).
    Fixed(u8),
    /// Otsu's method (automatic).
    Otsu,
}

/// Chain optimizer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitterKind {
    /// Greedy split, breakpoint refinement, then merge.
    #[default]
    CutPoint,
    /// Node/sagitta gradient descent seeded by Douglas-Peucker.
    Gradient,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdMethod::Otsu,
            invert: false,
            min_chain_points: 2,
            fitter: FitterKind::CutPoint,
            max_segment_error: 1.0,
            min_segment_length: 4,
            segment_penalty: 2.0,
            refinement_window: 3,
            max_iterations: 10,
            max_radius_ratio: 5.0,
            raw_tolerance: 1.5,
            corner_window_length: 3.0,
            curvature_threshold: 0.22,
            corner_radius: 1.5,
            max_junction_extension: 3.0,
        }
    }
}

impl TracingConfig {
    /// Load a preset from a JSON file and validate it.
    pub fn from_json_file(path: &Path) -> Result<Self, TraceError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations no chain could be fitted with.
    pub fn validate(&self) -> Result<(), TraceError> {
        fn positive(name: &str, value: f64) -> Result<(), TraceError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(TraceError::InvalidConfig(format!(
                    "{name} must be a positive finite number, got {value}"
                )))
            }
        }

        positive("max_segment_error", self.max_segment_error)?;
        positive("max_radius_ratio", self.max_radius_ratio)?;
        positive("corner_window_length", self.corner_window_length)?;
        positive("curvature_threshold", self.curvature_threshold)?;
        positive("corner_radius", self.corner_radius)?;

        if !(self.segment_penalty.is_finite() && self.segment_penalty >= 0.0) {
            return Err(TraceError::InvalidConfig(format!(
                "segment_penalty must be non-negative, got {}",
                self.segment_penalty
            )));
        }
        if !(self.max_junction_extension.is_finite() && self.max_junction_extension >= 0.0) {
            return Err(TraceError::InvalidConfig(format!(
                "max_junction_extension must be non-negative, got {}",
                self.max_junction_extension
            )));
        }
        if !(self.raw_tolerance.is_finite() && self.raw_tolerance >= 0.0) {
            return Err(TraceError::InvalidConfig(format!(
                "raw_tolerance must be non-negative, got {}",
                self.raw_tolerance
            )));
        }
        if self.min_segment_length < 2 {
            return Err(TraceError::InvalidConfig(format!(
                "min_segment_length must be at least 2, got {}",
                self.min_segment_length
            )));
        }
        if self.min_chain_points < 2 {
            return Err(TraceError::InvalidConfig(format!(
                "min_chain_points must be at least 2, got {}",
                self.min_chain_points
            )));
        }
        if self.max_iterations == 0 {
            return Err(TraceError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.corner_radius >= self.corner_window_length * 4.0 {
            return Err(TraceError::InvalidConfig(format!(
                "corner_radius {} is too large for corner_window_length {}",
                self.corner_radius, self.corner_window_length
            )));
        }
        Ok(())
    }
}
