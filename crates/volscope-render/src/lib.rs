//! Rendering backend for volscope.
//!
//! This crate provides:
//! - Lookup-table tabulation of transfer-function curves
//! - [`RenderPipeline`] over the [`RenderBackend`] seam
//! - A wgpu backend ray-casting the volume in WGSL
//! - A CPU [`SoftwareBackend`] sharing the same ray-casting math
//! - Camera, slider overlay geometry and screenshots

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Pixel and texel math converts between integers and floats throughout
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
// GPU uniform structs carry explicit padding fields
#![allow(clippy::pub_underscore_fields)]

pub mod camera;
pub mod error;
pub mod gpu;
pub mod lut;
pub mod overlay;
pub mod pipeline;
pub mod raycast;
pub mod screenshot;
pub mod software;

pub use camera::{Camera, ProjectionMode, Ray};
pub use error::{RenderError, RenderResult, UploadError};
pub use gpu::{GpuBackend, GpuContext, RaycastUniforms};
pub use lut::{ColorLut, Lut, LutSet, LutTable, ScalarLut, DEFAULT_LUT_RESOLUTION};
pub use overlay::{rasterize_quads, slider_quads, OverlayQuad};
pub use pipeline::{FrameParams, RenderBackend, RenderPipeline, BYTES_PER_VOXEL};
pub use raycast::{intersect_box, RayCaster, RaySample};
pub use screenshot::{encode_png, save_image, ScreenshotError};
pub use software::SoftwareBackend;
