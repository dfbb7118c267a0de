//! CPU backend built on the reference ray caster.

use volscope_core::{CurveKind, Volume};

use crate::error::{RenderError, RenderResult, UploadError};
use crate::lut::{LutSet, LutTable};
use crate::overlay::{rasterize_quads, slider_quads};
use crate::pipeline::{FrameParams, RenderBackend};
use crate::raycast::RayCaster;

/// Renders into an RGBA8 framebuffer on the CPU.
///
/// Used when no graphics adapter is available and by tests.
pub struct SoftwareBackend {
    width: u32,
    height: u32,
    framebuffer: Vec<u8>,
    volume: Option<Volume>,
    /// Tables received before all three kinds have arrived.
    pending: [Option<LutTable>; 3],
    luts: Option<LutSet>,
    max_dimension: u32,
}

impl SoftwareBackend {
    /// Creates a backend with a `width` x `height` framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            framebuffer: vec![0; (width * height * 4) as usize],
            volume: None,
            pending: Default::default(),
            luts: None,
            max_dimension: u32::MAX,
        }
    }

    /// Rejects volumes with any dimension above `limit`, like a device's 3D
    /// texture limit.
    #[must_use]
    pub fn with_max_dimension(mut self, limit: u32) -> Self {
        self.max_dimension = limit;
        self
    }

    /// Returns the framebuffer (RGBA8, top-left origin).
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Returns the tables frames are drawn with, once all three are uploaded.
    pub fn luts(&self) -> Option<&LutSet> {
        self.luts.as_ref()
    }

    fn assemble_luts(&mut self) {
        if self.pending.iter().any(Option::is_none) {
            return;
        }
        if let [Some(LutTable::ScalarOpacity(scalar_opacity)), Some(LutTable::GradientOpacity(gradient_opacity)), Some(LutTable::Color(color))] =
            std::mem::take(&mut self.pending)
        {
            self.luts = Some(LutSet {
                scalar_opacity,
                gradient_opacity,
                color,
            });
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn upload_volume(&mut self, volume: &Volume) -> Result<(), UploadError> {
        if let Some(&dimension) = volume.dimensions().iter().max() {
            let dimension = u32::try_from(dimension).unwrap_or(u32::MAX);
            if dimension > self.max_dimension {
                return Err(UploadError::TooLarge {
                    dimension,
                    limit: self.max_dimension,
                });
            }
        }
        self.volume = Some(volume.clone());
        Ok(())
    }

    fn upload_lut(&mut self, table: &LutTable) {
        if let Some(luts) = &mut self.luts {
            match table {
                LutTable::ScalarOpacity(lut) => luts.scalar_opacity.clone_from(lut),
                LutTable::GradientOpacity(lut) => luts.gradient_opacity.clone_from(lut),
                LutTable::Color(lut) => luts.color.clone_from(lut),
            }
            return;
        }
        let slot = match table.kind() {
            CurveKind::ScalarOpacity => 0,
            CurveKind::GradientOpacity => 1,
            CurveKind::Color => 2,
        };
        self.pending[slot] = Some(table.clone());
        self.assemble_luts();
    }

    fn draw(&mut self, frame: &FrameParams<'_>) -> RenderResult<()> {
        let luts = self.luts.as_ref().ok_or(RenderError::NotInitialized)?;
        let volume = self.volume.as_ref().ok_or(RenderError::NotInitialized)?;
        let caster = RayCaster::new(volume, luts, frame.quality, frame.shading, frame.background);

        let (width, height) = (self.width, self.height);
        for py in 0..height {
            for px in 0..width {
                let ray = frame.camera.ray_for_pixel(px, py, width, height);
                let rgba = caster.cast_rgba(&ray);
                let offset = ((py * width + px) * 4) as usize;
                for (channel, value) in rgba.to_array().into_iter().enumerate() {
                    self.framebuffer[offset + channel] = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
                }
            }
        }

        rasterize_quads(&slider_quads(frame.overlay), &mut self.framebuffer, width, height);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.framebuffer = vec![0; (self.width * self.height * 4) as usize];
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_pixels(&mut self) -> RenderResult<Vec<u8>> {
        Ok(self.framebuffer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::pipeline::RenderPipeline;
    use glam::Vec3;
    use volscope_core::{ControlLayout, ControlSet, CurveUpdate, OpacityPoint, Options, TransferFunction};

    fn volume() -> Volume {
        let samples = (0..1000).map(|i| (i % 100) as f32).collect();
        Volume::new([10, 10, 10], [1.0; 3], samples).unwrap()
    }

    fn fitted_camera(volume: &Volume) -> Camera {
        let (min, max) = volume.bounds();
        let mut camera = Camera::new(1.0);
        camera.fit_box(min, max);
        camera
    }

    #[test]
    fn test_draw_before_upload_fails() {
        let mut backend = SoftwareBackend::new(4, 4);
        let camera = Camera::default();
        let frame = FrameParams {
            camera: &camera,
            quality: Default::default(),
            shading: Default::default(),
            background: Vec3::ZERO,
            overlay: &[],
        };
        assert!(matches!(backend.draw(&frame), Err(RenderError::NotInitialized)));
    }

    #[test]
    fn test_corner_pixel_is_background_and_center_is_not() {
        let volume = volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let options = Options::default();
        let mut pipeline = RenderPipeline::initialize(SoftwareBackend::new(32, 32), &volume, &tf, &options).unwrap();
        let camera = fitted_camera(&volume);
        pipeline.render_frame(&camera, &[]).unwrap();

        let pixels = pipeline.read_pixels().unwrap();
        let background = (0.1f32 * 255.0).round() as u8;
        assert_eq!(&pixels[0..4], &[background, background, background, 255]);

        let center = ((16 * 32 + 16) * 4) as usize;
        assert_ne!(&pixels[center..center + 3], &[background, background, background]);
    }

    #[test]
    fn test_same_state_renders_same_image() {
        let volume = volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let mut pipeline =
            RenderPipeline::initialize(SoftwareBackend::new(16, 16), &volume, &tf, &Options::default()).unwrap();
        let camera = fitted_camera(&volume);

        pipeline.render_frame(&camera, &[]).unwrap();
        let first = pipeline.read_pixels().unwrap();
        pipeline.render_frame(&camera, &[]).unwrap();
        assert_eq!(first, pipeline.read_pixels().unwrap());
    }

    #[test]
    fn test_overlay_is_drawn() {
        let volume = volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let mut pipeline =
            RenderPipeline::initialize(SoftwareBackend::new(320, 240), &volume, &tf, &Options::default()).unwrap();
        let controls = ControlSet::with_defaults(&ControlLayout::default());
        let camera = fitted_camera(&volume);
        pipeline.render_frame(&camera, controls.sliders()).unwrap();

        // Knob of the first slider is opaque white-ish.
        let slider = &controls.sliders()[0];
        let x = (slider.region.x + slider.region.width * slider.value).round() as u32;
        let y = (slider.region.y + slider.region.height * 0.5) as u32;
        let offset = ((y * 320 + x) * 4) as usize;
        assert!(pipeline.read_pixels().unwrap()[offset] > 200);
    }

    #[test]
    fn test_lut_updates_replace_tables_in_place() {
        let volume = volume();
        let mut tf = TransferFunction::with_defaults(volume.intensity_range());
        let mut pipeline =
            RenderPipeline::initialize(SoftwareBackend::new(32, 32), &volume, &tf, &Options::default()).unwrap();
        assert_eq!(pipeline.backend().luts(), Some(pipeline.luts()));

        let range = volume.intensity_range();
        tf.replace_curve(CurveUpdate::ScalarOpacity(vec![
            OpacityPoint::new(range.min, 0.0),
            OpacityPoint::new(range.max, 0.0),
        ]))
        .unwrap();
        pipeline.rebuild_lut(CurveKind::ScalarOpacity, &tf);
        assert_eq!(pipeline.backend().luts(), Some(pipeline.luts()));

        pipeline.render_frame(&fitted_camera(&volume), &[]).unwrap();
        let pixels = pipeline.read_pixels().unwrap();
        let background = (0.1f32 * 255.0).round() as u8;
        let center = ((16 * 32 + 16) * 4) as usize;
        assert_eq!(&pixels[center..center + 3], &[background, background, background]);
    }

    #[test]
    fn test_dimension_limit() {
        let volume = volume();
        let mut backend = SoftwareBackend::new(4, 4).with_max_dimension(8);
        assert_eq!(
            backend.upload_volume(&volume),
            Err(UploadError::TooLarge { dimension: 10, limit: 8 })
        );
    }
}
