//! Volume and lookup-table textures.

use glam::Vec3;
use half::f16;
use pollster::FutureExt;
use volscope_core::{IntensityRange, Volume};

use crate::error::UploadError;
use crate::lut::LutTable;

/// A volume resident on the device as normalized half floats.
pub struct VolumeTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub bounds: (Vec3, Vec3),
    /// Texels along x, y, z.
    pub dims: Vec3,
    /// Voxel spacing along x, y, z.
    pub spacing: Vec3,
    pub range: IntensityRange,
}

impl VolumeTexture {
    /// Uploads `volume` as an `R16Float` 3D texture.
    ///
    /// Dimensions are checked against the device limit before allocation and
    /// allocation failures are caught with an out-of-memory error scope.
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, volume: &Volume) -> Result<Self, UploadError> {
        let [nz, ny, nx] = volume.dimensions();
        let limit = device.limits().max_texture_dimension_3d;
        let size = [nx, ny, nz].map(|n| u32::try_from(n).unwrap_or(u32::MAX));
        if let Some(&dimension) = size.iter().max() {
            if dimension > limit {
                return Err(UploadError::TooLarge { dimension, limit });
            }
        }

        let texels: Vec<u16> = volume
            .normalized_samples()
            .into_iter()
            .map(|v| f16::from_f32(v).to_bits())
            .collect();

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("volume texture"),
            size: wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: size[2],
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: wgpu::TextureFormat::R16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size[0] * 2),
                rows_per_image: Some(size[1]),
            },
            wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: size[2],
            },
        );
        if let Some(err) = device.pop_error_scope().block_on() {
            return Err(UploadError::OutOfMemory(err.to_string()));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("volume sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            bounds: volume.bounds(),
            dims: Vec3::new(nx as f32, ny as f32, nz as f32),
            spacing: volume.spacing_xyz(),
            range: volume.intensity_range(),
        })
    }
}

/// One lookup table as a 1D texture.
pub struct LutTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    len: u32,
}

impl LutTexture {
    /// Creates a texture sized for `table` and fills it.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, table: &LutTable) -> Self {
        let len = table.len() as u32;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(match table {
                LutTable::ScalarOpacity(_) => "scalar opacity lut",
                LutTable::GradientOpacity(_) => "gradient opacity lut",
                LutTable::Color(_) => "color lut",
            }),
            size: wgpu::Extent3d {
                width: len,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D1,
            format: lut_format(table),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D1),
            ..Default::default()
        });
        let lut = Self { texture, view, len };
        lut.write(queue, table);
        lut
    }

    /// Returns whether `table` fits this texture without reallocation.
    pub fn fits(&self, table: &LutTable) -> bool {
        self.len == table.len() as u32
    }

    /// Overwrites the whole texture with `table`.
    ///
    /// The write is queued before the next submission, so a frame sees either
    /// the old table or the new one.
    pub fn write(&self, queue: &wgpu::Queue, table: &LutTable) {
        let texels = lut_texels(table);
        let texel_bytes = if matches!(table, LutTable::Color(_)) { 8 } else { 2 };
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.len * texel_bytes),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: self.len,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }
}

fn lut_format(table: &LutTable) -> wgpu::TextureFormat {
    match table {
        LutTable::ScalarOpacity(_) | LutTable::GradientOpacity(_) => wgpu::TextureFormat::R16Float,
        LutTable::Color(_) => wgpu::TextureFormat::Rgba16Float,
    }
}

/// Converts a table to half-float texel bits.
fn lut_texels(table: &LutTable) -> Vec<u16> {
    let bits = |v: f32| f16::from_f32(v).to_bits();
    match table {
        LutTable::ScalarOpacity(lut) | LutTable::GradientOpacity(lut) => {
            lut.entries().iter().map(|&v| bits(v)).collect()
        }
        LutTable::Color(lut) => lut
            .entries()
            .iter()
            .flat_map(|c| [bits(c.x), bits(c.y), bits(c.z), bits(1.0)])
            .collect(),
    }
}
