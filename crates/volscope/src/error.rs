//! Session error types.

use thiserror::Error;
use volscope_render::{RenderError, ScreenshotError, UploadError};

/// Failure of one session. The batch moves on to the next volume.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The volume could not be made GPU-resident.
    #[error("volume upload failed: {0}")]
    Upload(#[from] UploadError),

    /// Device creation or frame rendering failed.
    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),

    /// The window or event loop failed.
    #[error("event loop error: {0}")]
    EventLoop(String),

    /// A snapshot could not be written.
    #[error("snapshot failed: {0}")]
    Snapshot(#[from] ScreenshotError),
}

impl From<winit::error::EventLoopError> for SessionError {
    fn from(err: winit::error::EventLoopError) -> Self {
        Self::EventLoop(err.to_string())
    }
}

impl From<winit::error::OsError> for SessionError {
    fn from(err: winit::error::OsError) -> Self {
        Self::EventLoop(err.to_string())
    }
}
