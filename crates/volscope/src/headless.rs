//! Headless rendering: one frame per volume, written to a PNG.
//!
//! Uses an offscreen GPU target when an adapter is available and falls back
//! to the software backend otherwise.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use volscope_core::{Options, Volume};
use volscope_render::{GpuBackend, GpuContext, RenderBackend, SoftwareBackend};

use crate::driver::SessionRunner;
use crate::error::SessionError;
use crate::session::Session;

/// Renders `volume` with the default transfer function and returns RGBA8
/// pixels of `options.window` size.
pub fn render_volume_to_image(volume: Volume, options: &Options, software: bool) -> Result<Vec<u8>, SessionError> {
    let (width, height) = (options.window.width, options.window.height);
    match gpu_context(software) {
        Some(context) => snapshot_pixels(GpuBackend::headless(context, width, height), volume, options),
        None => snapshot_pixels(SoftwareBackend::new(width, height), volume, options),
    }
}

/// Renders `volume` and saves the frame to `path` (PNG or JPEG).
pub fn render_volume_to_file(
    volume: Volume,
    options: &Options,
    software: bool,
    path: impl AsRef<Path>,
) -> Result<(), SessionError> {
    let pixels = render_volume_to_image(volume, options, software)?;
    volscope_render::save_image(path, &pixels, options.window.width, options.window.height)?;
    Ok(())
}

fn gpu_context(software: bool) -> Option<Arc<GpuContext>> {
    if software {
        return None;
    }
    match GpuContext::headless() {
        Ok(context) => Some(context),
        Err(err) => {
            log::warn!("no GPU adapter ({err}), using the software renderer");
            None
        }
    }
}

fn snapshot_pixels<B: RenderBackend>(backend: B, volume: Volume, options: &Options) -> Result<Vec<u8>, SessionError> {
    let mut session = Session::new("snapshot", volume, backend, options)?;
    session.render()?;
    Ok(session.read_pixels()?)
}

/// Writes one `<label>.png` per volume into a directory.
///
/// The GPU context is created on first use and shared by later sessions.
pub struct HeadlessRunner {
    output_dir: PathBuf,
    software: bool,
    context: Option<Arc<GpuContext>>,
    written: Vec<PathBuf>,
}

impl HeadlessRunner {
    /// Creates a runner writing into `output_dir`; `software` skips the GPU.
    pub fn new(output_dir: impl Into<PathBuf>, software: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            software,
            context: None,
            written: Vec::new(),
        }
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn snapshot<B: RenderBackend>(&mut self, backend: B, label: &str, volume: Volume, options: &Options) -> Result<u64, SessionError> {
        let mut session = Session::new(label, volume, backend, options)?;
        session.render()?;
        let path = self.output_dir.join(format!("{label}.png"));
        session.save_screenshot(&path)?;
        session.close();
        self.written.push(path);
        Ok(session.frames_rendered())
    }
}

impl SessionRunner for HeadlessRunner {
    fn run_session(&mut self, label: &str, volume: Volume, options: &Options) -> Result<u64, SessionError> {
        std::fs::create_dir_all(&self.output_dir).map_err(volscope_render::ScreenshotError::from)?;
        if self.context.is_none() && !self.software {
            self.context = gpu_context(false);
            // Only probe once.
            self.software = self.context.is_none();
        }

        let (width, height) = (options.window.width, options.window.height);
        match self.context.clone() {
            Some(context) => self.snapshot(GpuBackend::headless(context, width, height), label, volume, options),
            None => self.snapshot(SoftwareBackend::new(width, height), label, volume, options),
        }
    }
}
