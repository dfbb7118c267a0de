//! One interactive session: a volume, its transfer function, the sliders
//! bound to it and the pipeline drawing it.

use std::path::Path;

use volscope_core::{
    BindingSet, ControlChange, ControlSet, InteractionController, InteractionOutcome, Options, PointerEvent,
    TransferFunction, Volume,
};
use volscope_render::{save_image, Camera, RenderBackend, RenderPipeline, RenderResult};

use crate::error::SessionError;

/// Radians of orbit per pixel of pointer motion.
const ORBIT_SPEED: f32 = 0.01;

/// Glue between input, bindings and rendering for one volume.
///
/// Every control change is bound, rebuilt into its lookup table and drawn
/// before [`Session::handle_pointer`] returns.
pub struct Session<B: RenderBackend> {
    label: String,
    volume: Volume,
    transfer_function: TransferFunction,
    bindings: BindingSet,
    controller: InteractionController,
    camera: Camera,
    pipeline: RenderPipeline<B>,
}

impl<B: RenderBackend> Session<B> {
    /// Uploads `volume` through `backend` and sets up the default transfer
    /// function, sliders and a camera framing the volume.
    pub fn new(label: impl Into<String>, volume: Volume, backend: B, options: &Options) -> Result<Self, SessionError> {
        let label = label.into();
        let transfer_function = TransferFunction::with_defaults(volume.intensity_range());
        let pipeline = RenderPipeline::initialize(backend, &volume, &transfer_function, options)?;

        let (width, height) = pipeline.size();
        let mut camera = Camera::new(width as f32 / height.max(1) as f32);
        let (min, max) = volume.bounds();
        camera.fit_box(min, max);

        log::info!(
            "session '{label}': {:?} voxels, intensity {:?}",
            volume.dimensions(),
            volume.intensity_range()
        );

        Ok(Self {
            label,
            volume,
            transfer_function,
            bindings: BindingSet::default(),
            controller: InteractionController::new(ControlSet::with_defaults(&options.controls)),
            camera,
            pipeline,
        })
    }

    /// Runs `event` through the slider state machine and applies any
    /// resulting control change.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> RenderResult<InteractionOutcome> {
        let before = self.controller.state();
        let outcome = self.controller.handle(event);
        if self.controller.state() != before {
            log::debug!("interaction {before:?} -> {:?}", self.controller.state());
        }
        if let InteractionOutcome::ControlChanged(change) = outcome {
            self.apply_control_change(change)?;
        }
        Ok(outcome)
    }

    fn apply_control_change(&mut self, change: ControlChange) -> RenderResult<()> {
        let snapshot = self.controller.controls().snapshot();
        match self
            .bindings
            .apply_control_change(change.control, change.value, &snapshot, &mut self.transfer_function)
        {
            Ok(Some(kind)) => {
                self.pipeline.rebuild_lut(kind, &self.transfer_function);
                self.render()
            }
            Ok(None) => Ok(()),
            Err(err) => {
                log::warn!("'{}' = {}: {err}", change.control, change.value);
                Ok(())
            }
        }
    }

    /// Draws one frame with the current camera and sliders.
    pub fn render(&mut self) -> RenderResult<()> {
        self.pipeline
            .render_frame(&self.camera, self.controller.controls().sliders())
    }

    /// Marks the session closed.
    pub fn close(&mut self) {
        self.controller.close();
    }

    /// Returns whether the session was closed.
    pub fn is_closed(&self) -> bool {
        self.controller.is_closed()
    }

    /// Resizes the render target and keeps the camera's aspect ratio in step.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.pipeline.resize(width, height);
        self.camera.set_aspect_ratio(width as f32 / height as f32);
    }

    /// Orbits the camera by a pointer motion in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.camera.orbit(dx * ORBIT_SPEED, dy * ORBIT_SPEED);
    }

    /// Pans the camera by a pointer motion in pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let (_, height) = self.pipeline.size();
        let world_per_pixel = 2.0 * self.camera.distance() * (self.camera.fov * 0.5).tan() / height.max(1) as f32;
        self.camera.pan(-dx * world_per_pixel, dy * world_per_pixel);
    }

    /// Zooms the camera; positive moves closer.
    pub fn zoom(&mut self, delta: f32) {
        self.camera.zoom(delta);
    }

    /// Frames the whole volume again.
    pub fn refit_camera(&mut self) {
        let (min, max) = self.volume.bounds();
        self.camera.fit_box(min, max);
    }

    /// Scales the ray step by `factor` within the allowed range.
    pub fn scale_step(&mut self, factor: f32) {
        let quality = self.pipeline.quality().with_step_scaled(factor);
        self.pipeline.set_quality(quality);
    }

    /// Reads the last frame back as RGBA8.
    pub fn read_pixels(&mut self) -> RenderResult<Vec<u8>> {
        self.pipeline.read_pixels()
    }

    /// Saves the last frame to `path` (PNG or JPEG by extension).
    pub fn save_screenshot(&mut self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let pixels = self.pipeline.read_pixels()?;
        let (width, height) = self.pipeline.size();
        save_image(path, &pixels, width, height)?;
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.transfer_function
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn pipeline(&self) -> &RenderPipeline<B> {
        &self.pipeline
    }

    /// Returns how many frames this session has drawn.
    pub fn frames_rendered(&self) -> u64 {
        self.pipeline.frames_rendered()
    }
}
