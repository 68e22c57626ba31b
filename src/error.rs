use thiserror::Error;

/// Errors that can occur while tracing a mask.
///
/// Algorithmic degeneracies (collinear circle fits, parallel junction lines,
/// walks that dead-end) are not errors: they surface as `None` or as flags on
/// the traced output and the pipeline keeps going.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TraceError {
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    #[error("no foreground paths found in image")]
    NoPaths,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid pixel mask: {0}")]
    InvalidMask(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config preset error: {0}")]
    Json(#[from] serde_json::Error),
}
