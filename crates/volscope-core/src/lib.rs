//! Core model for volscope.
//!
//! This crate holds everything about interactive volume rendering that does not
//! touch the GPU:
//! - [`Volume`], the immutable scalar grid being rendered
//! - [`TransferFunction`] and its piecewise-linear [`Curve`]s
//! - [`BindingSet`], which turns slider values into replacement curves
//! - [`InteractionController`], the slider drag state machine
//! - [`Options`] and the [`VolumeLoader`] seam (with an NRRD implementation)

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Voxel counts and pixel coordinates are converted to f32 on purpose
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod binding;
pub mod controls;
pub mod curve;
pub mod error;
pub mod interaction;
pub mod loader;
pub mod options;
pub mod transfer_function;
pub mod volume;

pub use binding::{BindingSet, BindingTemplate, OpacityCurve, ParameterBinding};
pub use controls::{ControlId, ControlSet, ControlValues, Rect, Slider};
pub use curve::{ColorPoint, ControlPoint, Curve, CurveValue, OpacityPoint};
pub use error::{
    CurveViolation, InvalidCurveError, LoadError, Result, VolscopeError, VolumeError,
};
pub use interaction::{ControlChange, InteractionController, InteractionOutcome, InteractionState, PointerEvent};
pub use loader::{NrrdLoader, VolumeLoader};
pub use options::{ControlLayout, Options, RenderQuality, ShadingOptions, WindowOptions};
pub use transfer_function::{CurveKind, CurveSample, CurveUpdate, TransferFunction};
pub use volume::{IntensityRange, Volume};

// Re-export glam types for convenience
pub use glam::{Vec3, Vec4};
