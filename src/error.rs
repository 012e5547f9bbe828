// ============================================================================
// ERRORS — construction-time failures surfaced to the caller
// ============================================================================
//
// Per-pixel conditions (bounds, selection membership, tolerance) are never
// errors; they are silent control flow inside the painters. Only invalid
// arguments at construction / replay time end up here.

use std::path::PathBuf;

use crate::surface::SurfaceId;

/// Failures creating or resizing a [`crate::surface::PixelSurface`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("invalid surface dimensions {width}x{height} (both must be >= 1)")]
    InvalidDimension { width: i64, height: i64 },

    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("required argument `{0}` is missing")]
    NullArgument(&'static str),
}

/// Failures raised by painters and change-record replay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaintError {
    #[error("operation targets surface {expected} but was given surface {actual}")]
    SurfaceMismatch {
        expected: SurfaceId,
        actual: SurfaceId,
    },

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Failures loading or saving tool settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}
