//! [`RenderBackend`] on wgpu.

use std::sync::Arc;

use volscope_core::{CurveKind, Volume};

use super::overlay_pass::OverlayPass;
use super::present_pass::PresentPass;
use super::raycast_pass::{RaycastPass, RaycastUniforms};
use super::textures::{LutTexture, VolumeTexture};
use super::{GpuContext, FRAME_FORMAT};
use crate::error::{RenderError, RenderResult, UploadError};
use crate::lut::LutTable;
use crate::overlay::slider_quads;
use crate::pipeline::{FrameParams, RenderBackend};

/// The internal frame every pass draws into.
struct FrameTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl FrameTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FRAME_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// A window surface plus the pass that copies frames onto it.
struct SurfaceTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    present: PresentPass,
    bind_group: wgpu::BindGroup,
}

/// Draws with the GPU, to a window surface or offscreen.
pub struct GpuBackend {
    context: Arc<GpuContext>,
    width: u32,
    height: u32,
    frame: FrameTarget,
    surface: Option<SurfaceTarget>,
    raycast: RaycastPass,
    overlay: OverlayPass,
    volume: Option<VolumeTexture>,
    scalar_opacity: Option<LutTexture>,
    gradient_opacity: Option<LutTexture>,
    color: Option<LutTexture>,
    lut_size: u32,
    bind_group: Option<wgpu::BindGroup>,
}

impl GpuBackend {
    /// Creates a backend rendering offscreen only.
    pub fn headless(context: Arc<GpuContext>, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let device = &context.device;
        Self {
            frame: FrameTarget::new(device, width, height),
            raycast: RaycastPass::new(device, FRAME_FORMAT),
            overlay: OverlayPass::new(device, FRAME_FORMAT),
            context,
            width,
            height,
            surface: None,
            volume: None,
            scalar_opacity: None,
            gradient_opacity: None,
            color: None,
            lut_size: 0,
            bind_group: None,
        }
    }

    /// Creates a backend presenting to `surface`.
    pub fn windowed(
        context: Arc<GpuContext>,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let mut backend = Self::headless(context, width, height);
        let device = &backend.context.device;

        let caps = surface.get_capabilities(&backend.context.adapter);
        // Frames are already display-encoded; a linear surface avoids a decode.
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(RenderError::SurfaceConfigurationFailed)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: backend.width,
            height: backend.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(device, &config);

        let present = PresentPass::new(device, format);
        let bind_group = present.create_bind_group(device, &backend.frame.view);
        log::debug!("configured {format:?} surface {}x{}", backend.width, backend.height);

        backend.surface = Some(SurfaceTarget {
            surface,
            config,
            present,
            bind_group,
        });
        Ok(backend)
    }

    /// Returns the shared device context.
    pub fn context(&self) -> &Arc<GpuContext> {
        &self.context
    }

    fn ensure_bind_group(&mut self) -> RenderResult<()> {
        if self.bind_group.is_some() {
            return Ok(());
        }
        match (&self.volume, &self.scalar_opacity, &self.gradient_opacity, &self.color) {
            (Some(volume), Some(scalar_opacity), Some(gradient_opacity), Some(color)) => {
                self.bind_group = Some(self.raycast.create_bind_group(
                    &self.context.device,
                    volume,
                    scalar_opacity,
                    gradient_opacity,
                    color,
                ));
                Ok(())
            }
            _ => Err(RenderError::NotInitialized),
        }
    }

    fn acquire_surface_texture(&self) -> RenderResult<Option<wgpu::SurfaceTexture>> {
        let Some(target) = &self.surface else {
            return Ok(None);
        };
        match target.surface.get_current_texture() {
            Ok(texture) => Ok(Some(texture)),
            Err(wgpu::SurfaceError::Timeout) => Err(RenderError::Timeout),
            Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::OutOfMemory),
            Err(wgpu::SurfaceError::Outdated) => {
                target.surface.configure(&self.context.device, &target.config);
                Err(RenderError::SurfaceOutdated)
            }
            Err(_) => {
                target.surface.configure(&self.context.device, &target.config);
                Err(RenderError::SurfaceLost)
            }
        }
    }

    fn aligned_bytes_per_row(width: u32) -> u32 {
        let unaligned = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        unaligned.div_ceil(align) * align
    }
}

impl RenderBackend for GpuBackend {
    fn upload_volume(&mut self, volume: &Volume) -> Result<(), UploadError> {
        let texture = VolumeTexture::upload(&self.context.device, &self.context.queue, volume)?;
        self.volume = Some(texture);
        self.bind_group = None;
        Ok(())
    }

    fn upload_lut(&mut self, table: &LutTable) {
        let (device, queue) = (&self.context.device, &self.context.queue);
        let slot = match table.kind() {
            CurveKind::ScalarOpacity => &mut self.scalar_opacity,
            CurveKind::GradientOpacity => &mut self.gradient_opacity,
            CurveKind::Color => &mut self.color,
        };
        match slot {
            Some(texture) if texture.fits(table) => texture.write(queue, table),
            _ => {
                *slot = Some(LutTexture::new(device, queue, table));
                self.bind_group = None;
            }
        }
        self.lut_size = table.len() as u32;
    }

    fn draw(&mut self, frame: &FrameParams<'_>) -> RenderResult<()> {
        self.ensure_bind_group()?;
        let volume = self.volume.as_ref().ok_or(RenderError::NotInitialized)?;
        let bind_group = self.bind_group.as_ref().ok_or(RenderError::NotInitialized)?;
        let (device, queue) = (&self.context.device, &self.context.queue);

        let uniforms = RaycastUniforms::from_frame(frame, volume, self.lut_size, (self.width, self.height));
        self.raycast.update_uniforms(queue, &uniforms);
        self.overlay
            .prepare(device, queue, &slider_quads(frame.overlay), self.width, self.height);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("volscope frame encoder"),
        });
        self.raycast
            .render(&mut encoder, &self.frame.view, bind_group, frame.background);
        self.overlay.render(&mut encoder, &self.frame.view);

        let surface_texture = self.acquire_surface_texture();
        let surface_texture = match surface_texture {
            Ok(texture) => texture,
            Err(err) => {
                // The offscreen frame is still valid for read-back.
                self.context.queue.submit(std::iter::once(encoder.finish()));
                return Err(err);
            }
        };

        if let (Some(texture), Some(target)) = (&surface_texture, &self.surface) {
            let view = texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            target.present.render(&mut encoder, &view, &target.bind_group);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        if let Some(texture) = surface_texture {
            texture.present();
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        let device = &self.context.device;
        self.frame = FrameTarget::new(device, width, height);

        if let Some(target) = &mut self.surface {
            target.config.width = width;
            target.config.height = height;
            target.surface.configure(device, &target.config);
            target.bind_group = target.present.create_bind_group(device, &self.frame.view);
        }
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_pixels(&mut self) -> RenderResult<Vec<u8>> {
        let (device, queue) = (&self.context.device, &self.context.queue);
        let (width, height) = (self.width, self.height);
        let bytes_per_row = Self::aligned_bytes_per_row(width);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.frame.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(|_| RenderError::ReadbackFailed)?
            .map_err(|_| RenderError::ReadbackFailed)?;

        // Strip row padding.
        let data = buffer_slice.get_mapped_range();
        let row_bytes = (width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height {
            let start = (row * bytes_per_row) as usize;
            pixels.extend_from_slice(&data[start..start + row_bytes]);
        }
        drop(data);
        buffer.unmap();

        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(GpuBackend::aligned_bytes_per_row(64), 256);
        assert_eq!(GpuBackend::aligned_bytes_per_row(65), 512);
        assert_eq!(GpuBackend::aligned_bytes_per_row(1), 256);
    }
}
