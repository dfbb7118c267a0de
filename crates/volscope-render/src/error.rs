//! Rendering error types.

use thiserror::Error;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(#[from] wgpu::CreateSurfaceError),

    /// The surface has no format usable for presenting.
    #[error("surface configuration failed")]
    SurfaceConfigurationFailed,

    /// Surface lost.
    #[error("surface lost")]
    SurfaceLost,

    /// Surface outdated.
    #[error("surface outdated")]
    SurfaceOutdated,

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Timeout waiting for GPU.
    #[error("timeout waiting for GPU")]
    Timeout,

    /// Reading back the rendered frame failed.
    #[error("frame readback failed")]
    ReadbackFailed,

    /// A frame was requested before the volume and lookup tables were uploaded.
    #[error("nothing to render: volume or lookup tables not uploaded")]
    NotInitialized,
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Failure to make a volume GPU-resident. Fatal to the session it occurs in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    /// A dimension exceeds the device's 3D texture limit.
    #[error("volume dimension {dimension} exceeds the device limit of {limit}")]
    TooLarge { dimension: u32, limit: u32 },

    /// The voxel payload exceeds the configured byte budget.
    #[error("volume needs {bytes} bytes, budget is {budget}")]
    ExceedsBudget { bytes: u64, budget: u64 },

    /// The device ran out of memory while allocating or filling the texture.
    #[error("out of device memory during volume upload: {0}")]
    OutOfMemory(String),
}
