//! wgpu backend.
//!
//! A [`GpuContext`] (instance, adapter, device, queue) is created once per
//! process and shared by every session; each session owns a [`GpuBackend`]
//! with its own textures and render target.

mod backend;
mod overlay_pass;
mod present_pass;
mod raycast_pass;
mod textures;

use std::sync::Arc;

use pollster::FutureExt;

use crate::error::{RenderError, RenderResult};

pub use backend::GpuBackend;
pub use overlay_pass::{OverlayPass, OverlayVertex};
pub use present_pass::PresentPass;
pub use raycast_pass::{RaycastPass, RaycastUniforms};

/// Format of the internal frame every pass renders into.
pub const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Device handles shared across sessions.
pub struct GpuContext {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The wgpu adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Creates a wgpu instance for all backends.
    pub fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        })
    }

    /// Requests an adapter and device, compatible with `surface` if given.
    pub async fn request(
        instance: wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> RenderResult<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("volscope device"),
                required_features: wgpu::Features::empty(),
                // Large CT volumes need the adapter's full 3D texture limit.
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let info = adapter.get_info();
        log::info!("using {} ({:?})", info.name, info.backend);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Creates a context without a surface, blocking until the device is ready.
    pub fn headless() -> RenderResult<Arc<Self>> {
        Self::request(Self::create_instance(), None)
            .block_on()
            .map(Arc::new)
    }

    /// Creates a context and a surface for `window`, blocking until ready.
    pub fn for_window(
        window: Arc<winit::window::Window>,
    ) -> RenderResult<(Arc<Self>, wgpu::Surface<'static>)> {
        let instance = Self::create_instance();
        let surface = instance.create_surface(window)?;
        let context = Self::request(instance, Some(&surface)).block_on()?;
        Ok((Arc::new(context), surface))
    }

    /// Creates a surface for another window on the same instance.
    pub fn create_surface(
        &self,
        window: Arc<winit::window::Window>,
    ) -> RenderResult<wgpu::Surface<'static>> {
        Ok(self.instance.create_surface(window)?)
    }

    /// Returns the largest 3D texture dimension the device accepts.
    pub fn max_volume_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_3d
    }
}
