//! A runner that replays recorded pointer events on the software backend.

use volscope_core::{Options, PointerEvent, TransferFunction, Volume};
use volscope_render::SoftwareBackend;

use crate::driver::SessionRunner;
use crate::error::SessionError;
use crate::session::Session;

/// Replays the same event script in every session, then closes it.
///
/// Sessions render into a small CPU framebuffer, so batches run without a
/// window or GPU.
pub struct ScriptedRunner {
    script: Vec<PointerEvent>,
    width: u32,
    height: u32,
    max_dimension: u32,
    finished: Vec<FinishedSession>,
}

/// State captured when a scripted session closed.
#[derive(Debug, Clone)]
pub struct FinishedSession {
    pub label: String,
    pub transfer_function: TransferFunction,
    pub frames: u64,
}

impl ScriptedRunner {
    pub fn new(script: Vec<PointerEvent>) -> Self {
        Self {
            script,
            width: 64,
            height: 48,
            max_dimension: u32::MAX,
            finished: Vec::new(),
        }
    }

    /// Sets the framebuffer size.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Rejects volumes with a dimension above `limit` at upload.
    #[must_use]
    pub fn with_max_dimension(mut self, limit: u32) -> Self {
        self.max_dimension = limit;
        self
    }

    /// Sessions that ran to completion, in order.
    pub fn finished(&self) -> &[FinishedSession] {
        &self.finished
    }
}

impl SessionRunner for ScriptedRunner {
    fn run_session(&mut self, label: &str, volume: Volume, options: &Options) -> Result<u64, SessionError> {
        let backend = SoftwareBackend::new(self.width, self.height).with_max_dimension(self.max_dimension);
        let mut session = Session::new(label, volume, backend, options)?;
        session.render()?;

        for &event in &self.script {
            if session.is_closed() {
                break;
            }
            session.handle_pointer(event)?;
        }
        if !session.is_closed() {
            session.handle_pointer(PointerEvent::CloseRequested)?;
        }

        let frames = session.frames_rendered();
        self.finished.push(FinishedSession {
            label: label.to_owned(),
            transfer_function: session.transfer_function().clone(),
            frames,
        });
        Ok(frames)
    }
}
