//! Fullscreen ray-casting pass.

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use super::textures::{LutTexture, VolumeTexture};
use crate::pipeline::FrameParams;

/// GPU representation of the ray-casting uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RaycastUniforms {
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub box_min: [f32; 4],
    pub box_max: [f32; 4],
    pub dims: [f32; 4],
    /// xyz: voxel spacing, w: world-space step length.
    pub spacing: [f32; 4],
    pub background: [f32; 4],
    /// ambient, diffuse, specular, specular power.
    pub shading: [f32; 4],
    pub intensity_min: f32,
    pub intensity_max: f32,
    pub unit_distance: f32,
    pub termination_alpha: f32,
    pub max_steps: u32,
    pub shading_enabled: u32,
    pub lut_size: u32,
    pub _pad: u32,
    pub viewport: [f32; 4],
}

impl Default for RaycastUniforms {
    fn default() -> Self {
        Self {
            inv_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_pos: [0.0, 0.0, 0.0, 1.0],
            box_min: [0.0; 4],
            box_max: [1.0, 1.0, 1.0, 0.0],
            dims: [1.0, 1.0, 1.0, 0.0],
            spacing: [1.0, 1.0, 1.0, 0.5],
            background: [0.1, 0.1, 0.1, 1.0],
            shading: [0.1, 0.9, 0.2, 10.0],
            intensity_min: 0.0,
            intensity_max: 1.0,
            unit_distance: 1.0,
            termination_alpha: 0.995,
            max_steps: 2048,
            shading_enabled: 1,
            lut_size: 256,
            _pad: 0,
            viewport: [1.0, 1.0, 0.0, 0.0],
        }
    }
}

impl RaycastUniforms {
    /// Packs one frame's state for `volume` into uniforms.
    pub fn from_frame(frame: &FrameParams<'_>, volume: &VolumeTexture, lut_size: u32, viewport: (u32, u32)) -> Self {
        let (box_min, box_max) = volume.bounds;
        let step = (frame.quality.step_size * volume.spacing.min_element()).max(1e-6);
        let shading = frame.shading;
        Self {
            inv_view_proj: frame.camera.view_projection_matrix().inverse().to_cols_array_2d(),
            camera_pos: frame.camera.position.extend(1.0).to_array(),
            box_min: box_min.extend(0.0).to_array(),
            box_max: box_max.extend(0.0).to_array(),
            dims: volume.dims.extend(0.0).to_array(),
            spacing: volume.spacing.extend(step).to_array(),
            background: frame.background.extend(1.0).to_array(),
            shading: [shading.ambient, shading.diffuse, shading.specular, shading.specular_power],
            intensity_min: volume.range.min,
            intensity_max: volume.range.max,
            unit_distance: frame.quality.opacity_unit_distance,
            termination_alpha: frame.quality.early_termination_alpha,
            max_steps: frame.quality.max_steps,
            shading_enabled: u32::from(shading.enabled),
            lut_size: lut_size.max(2),
            _pad: 0,
            viewport: [viewport.0 as f32, viewport.1 as f32, 0.0, 0.0],
        }
    }
}

/// Ray-casting render resources.
pub struct RaycastPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

impl RaycastPass {
    /// Creates the pass for targets of `output_format`.
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Self {
        let lut_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D1,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Raycast Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                lut_entry(3),
                lut_entry(4),
                lut_entry(5),
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Raycast Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/volume_raycast.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Raycast Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Raycast Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Raycast Uniform Buffer"),
            contents: bytemuck::cast_slice(&[RaycastUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
        }
    }

    /// Uploads this frame's uniforms.
    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: &RaycastUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
    }

    /// Creates a bind group over the volume and the three lookup tables.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        volume: &VolumeTexture,
        scalar_opacity: &LutTexture,
        gradient_opacity: &LutTexture,
        color: &LutTexture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Raycast Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&volume.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&volume.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&scalar_opacity.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&gradient_opacity.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&color.view),
                },
            ],
        })
    }

    /// Ray-casts into `view`, clearing it to `background` first.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
        background: Vec3,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Raycast Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(background.x),
                        g: f64::from(background.y),
                        b: f64::from(background.z),
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_size() {
        let size = std::mem::size_of::<RaycastUniforms>();
        assert_eq!(size, 224);
        assert_eq!(size % 16, 0, "uniform size must be 16-byte aligned");
    }
}
