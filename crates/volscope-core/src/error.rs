//! Error types for volscope.

use std::path::PathBuf;

use thiserror::Error;

use crate::transfer_function::CurveKind;

/// The main error type for volscope operations.
#[derive(Error, Debug)]
pub enum VolscopeError {
    /// A volume file could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A curve replacement was rejected.
    #[error(transparent)]
    InvalidCurve(#[from] InvalidCurveError),

    /// A volume could not be constructed from the given data.
    #[error(transparent)]
    Volume(#[from] VolumeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (configuration) error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for volscope operations.
pub type Result<T> = std::result::Result<T, VolscopeError>;

/// Failure to turn a file into a [`Volume`](crate::Volume).
///
/// A load error only ever skips the offending batch entry.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its contents do not describe a valid volume.
    #[error("malformed volume '{path}': {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// The file uses a feature this loader does not implement.
    #[error("unsupported volume '{path}': {reason}")]
    Unsupported { path: PathBuf, reason: String },
}

impl LoadError {
    /// Returns the path of the file that failed to load.
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::Io { path, .. }
            | LoadError::Malformed { path, .. }
            | LoadError::Unsupported { path, .. } => path,
        }
    }
}

/// Invalid data passed to [`Volume::new`](crate::Volume::new).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VolumeError {
    /// One of the dimensions is zero.
    #[error("volume dimensions must be positive, got {0:?}")]
    EmptyDimension([usize; 3]),

    /// A spacing component is zero, negative, or not finite.
    #[error("volume spacing must be positive and finite, got {0:?}")]
    InvalidSpacing([f32; 3]),

    /// depth x height x width does not fit in `usize`.
    #[error("volume dimensions {0:?} overflow the voxel count")]
    TooManyVoxels([usize; 3]),

    /// Sample count does not match depth x height x width.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A sample is NaN or infinite.
    #[error("sample {index} is not finite")]
    NonFiniteSample { index: usize },
}

/// The way a proposed curve breaks the curve invariants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveViolation {
    /// The curve has no control points.
    Empty,
    /// A control point's domain value is NaN or infinite.
    NonFiniteDomain { index: usize },
    /// A control point's domain value is smaller than its predecessor's.
    DecreasingDomain {
        index: usize,
        previous: f32,
        current: f32,
    },
    /// A control point's output is outside [0, 1] or not finite.
    OutputOutOfRange { index: usize },
}

impl std::fmt::Display for CurveViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurveViolation::Empty => write!(f, "curve has no control points"),
            CurveViolation::NonFiniteDomain { index } => {
                write!(f, "point {index} has a non-finite domain value")
            }
            CurveViolation::DecreasingDomain {
                index,
                previous,
                current,
            } => write!(
                f,
                "point {index} has domain {current} after {previous} (domain must be non-decreasing)"
            ),
            CurveViolation::OutputOutOfRange { index } => {
                write!(f, "point {index} has an output outside [0, 1]")
            }
        }
    }
}

/// A rejected transfer-function curve replacement.
///
/// The curve named by `kind` is left exactly as it was before the attempt.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid {kind} curve: {violation}")]
pub struct InvalidCurveError {
    /// The curve the replacement was meant for.
    pub kind: CurveKind,
    /// What was wrong with it.
    pub violation: CurveViolation,
}
