//! volscope: interactive volume ray casting with slider-driven transfer functions.
//!
//! Each volume in a batch gets its own session: the volume is uploaded once,
//! a default transfer function is built over its intensity range, and five
//! sliders reshape the scalar-opacity, gradient-opacity and color curves while
//! the view re-renders.
//!
//! # Quick start
//!
//! ```no_run
//! use volscope::*;
//!
//! let options = Options::default();
//! let paths = collect_volume_paths(&["data/".into()], &options.volume_extension).unwrap();
//! let runner = WindowedRunner::new().unwrap();
//! let mut driver = SessionDriver::new(NrrdLoader, runner, options);
//! let report = driver.run_batch(&paths);
//! println!("{report}");
//! ```

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

mod app;
mod driver;
mod error;
mod headless;
mod scripted;
mod session;

pub use app::WindowedRunner;
pub use driver::{collect_volume_paths, BatchEntry, BatchReport, SessionDriver, SessionOutcome, SessionRunner};
pub use error::SessionError;
pub use headless::{render_volume_to_file, render_volume_to_image, HeadlessRunner};
pub use scripted::{FinishedSession, ScriptedRunner};
pub use session::Session;

pub use volscope_core::{
    BindingSet, ColorPoint, ControlChange, ControlId, ControlLayout, ControlPoint, ControlSet, ControlValues, Curve,
    CurveKind, CurveSample, CurveUpdate, CurveValue, CurveViolation, IntensityRange, InteractionController,
    InteractionOutcome, InteractionState, InvalidCurveError, LoadError, NrrdLoader, OpacityPoint, Options,
    ParameterBinding, PointerEvent, Rect, RenderQuality, ShadingOptions, Slider, TransferFunction, Vec3, Vec4,
    Volume, VolumeError, VolumeLoader, VolscopeError, WindowOptions,
};
pub use volscope_render::{
    Camera, GpuBackend, GpuContext, RenderBackend, RenderError, RenderPipeline, SoftwareBackend, UploadError,
};

/// Opens one window per path in turn and blocks until the last is closed.
///
/// Initializes logging if the caller has not.
pub fn show(paths: &[std::path::PathBuf], options: Options) -> Result<BatchReport, SessionError> {
    let _ = env_logger::try_init();
    let runner = WindowedRunner::new()?;
    let mut driver = SessionDriver::new(NrrdLoader, runner, options);
    Ok(driver.run_batch(paths))
}
