//! The render pipeline: volume upload, LUT maintenance and frame submission.

use std::time::{Duration, Instant};

use glam::Vec3;
use volscope_core::{CurveKind, Options, RenderQuality, ShadingOptions, Slider, TransferFunction, Volume};

use crate::camera::Camera;
use crate::error::{RenderResult, UploadError};
use crate::lut::{LutSet, LutTable};

/// Bytes one voxel occupies on the device (half-float texels).
pub const BYTES_PER_VOXEL: u64 = 2;

/// Everything a backend needs to draw one frame.
pub struct FrameParams<'a> {
    pub camera: &'a Camera,
    pub quality: RenderQuality,
    pub shading: ShadingOptions,
    pub background: Vec3,
    /// Sliders drawn on top of the volume.
    pub overlay: &'a [Slider],
}

/// Device-side resources and draw submission.
///
/// Implemented by the wgpu backend and the CPU software backend.
pub trait RenderBackend {
    /// Makes `volume` resident. Called once per session.
    fn upload_volume(&mut self, volume: &Volume) -> Result<(), UploadError>;

    /// Replaces the table for `table.kind()` as a whole.
    fn upload_lut(&mut self, table: &LutTable);

    /// Ray-casts one frame and draws the overlay on top.
    fn draw(&mut self, frame: &FrameParams<'_>) -> RenderResult<()>;

    /// Resizes the render target.
    fn resize(&mut self, width: u32, height: u32);

    /// Returns the render target size.
    fn size(&self) -> (u32, u32);

    /// Reads the last drawn frame back as tightly packed RGBA8.
    fn read_pixels(&mut self) -> RenderResult<Vec<u8>>;
}

/// Owns a backend plus the CPU copy of the lookup tables.
pub struct RenderPipeline<B: RenderBackend> {
    backend: B,
    luts: LutSet,
    quality: RenderQuality,
    shading: ShadingOptions,
    background: Vec3,
    lut_resolution: u32,
    rebuild_budget: Duration,
    frames_rendered: u64,
}

impl<B: RenderBackend> RenderPipeline<B> {
    /// Uploads `volume` once and builds all three lookup tables from `tf`.
    pub fn initialize(
        mut backend: B,
        volume: &Volume,
        tf: &TransferFunction,
        options: &Options,
    ) -> Result<Self, UploadError> {
        let bytes = volume.voxel_count() as u64 * BYTES_PER_VOXEL;
        if bytes > options.max_volume_bytes {
            return Err(UploadError::ExceedsBudget {
                bytes,
                budget: options.max_volume_bytes,
            });
        }

        let start = Instant::now();
        backend.upload_volume(volume)?;
        log::info!(
            "uploaded {:?} volume ({:.1} MiB) in {:.1?}",
            volume.dimensions(),
            bytes as f64 / (1024.0 * 1024.0),
            start.elapsed()
        );

        let lut_resolution = options.lut_resolution.max(2);
        let luts = LutSet::from_transfer_function(tf, lut_resolution);
        for kind in CurveKind::ALL {
            backend.upload_lut(&luts.table(kind));
        }

        Ok(Self {
            backend,
            luts,
            quality: options.quality,
            shading: options.shading,
            background: options.background_color,
            lut_resolution,
            rebuild_budget: Duration::from_secs_f32(options.lut_rebuild_budget_ms.max(0.0) / 1000.0),
            frames_rendered: 0,
        })
    }

    /// Re-tabulates curve `kind` of `tf` and replaces its device table.
    pub fn rebuild_lut(&mut self, kind: CurveKind, tf: &TransferFunction) {
        let start = Instant::now();
        let table = LutTable::from_transfer_function(tf, kind, self.lut_resolution);
        self.backend.upload_lut(&table);
        self.luts.replace(table);

        let elapsed = start.elapsed();
        if elapsed > self.rebuild_budget {
            log::warn!("{kind} LUT rebuild took {elapsed:.1?}, over the {:.1?} frame budget", self.rebuild_budget);
        } else {
            log::debug!("rebuilt {kind} LUT in {elapsed:.1?}");
        }
    }

    /// Draws one frame.
    pub fn render_frame(&mut self, camera: &Camera, overlay: &[Slider]) -> RenderResult<()> {
        self.backend.draw(&FrameParams {
            camera,
            quality: self.quality,
            shading: self.shading,
            background: self.background,
            overlay,
        })?;
        self.frames_rendered += 1;
        Ok(())
    }

    /// Returns the current quality settings.
    pub fn quality(&self) -> RenderQuality {
        self.quality
    }

    /// Replaces the quality settings used by later frames.
    pub fn set_quality(&mut self, quality: RenderQuality) {
        log::debug!("render quality: step {} voxels, max {} steps", quality.step_size, quality.max_steps);
        self.quality = quality;
    }

    /// Returns the shading settings.
    pub fn shading(&self) -> ShadingOptions {
        self.shading
    }

    /// Replaces the shading settings used by later frames.
    pub fn set_shading(&mut self, shading: ShadingOptions) {
        self.shading = shading;
    }

    /// Resizes the backend's render target.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.backend.resize(width, height);
    }

    /// Returns the render target size.
    pub fn size(&self) -> (u32, u32) {
        self.backend.size()
    }

    /// Returns how many frames were drawn.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Returns the CPU copy of the current lookup tables.
    pub fn luts(&self) -> &LutSet {
        &self.luts
    }

    /// Reads the last frame back as RGBA8.
    pub fn read_pixels(&mut self) -> RenderResult<Vec<u8>> {
        self.backend.read_pixels()
    }

    /// Returns the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the backend mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consumes the pipeline, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volscope_core::{CurveUpdate, IntensityRange, OpacityPoint};

    /// Records calls instead of drawing.
    #[derive(Default)]
    struct RecordingBackend {
        volumes: usize,
        luts: Vec<CurveKind>,
        draws: usize,
        reject_upload: Option<UploadError>,
    }

    impl RenderBackend for RecordingBackend {
        fn upload_volume(&mut self, _volume: &Volume) -> Result<(), UploadError> {
            if let Some(err) = self.reject_upload.clone() {
                return Err(err);
            }
            self.volumes += 1;
            Ok(())
        }

        fn upload_lut(&mut self, table: &LutTable) {
            self.luts.push(table.kind());
        }

        fn draw(&mut self, _frame: &FrameParams<'_>) -> RenderResult<()> {
            self.draws += 1;
            Ok(())
        }

        fn resize(&mut self, _width: u32, _height: u32) {}

        fn size(&self) -> (u32, u32) {
            (1, 1)
        }

        fn read_pixels(&mut self) -> RenderResult<Vec<u8>> {
            Ok(vec![0; 4])
        }
    }

    fn volume() -> Volume {
        Volume::new([4, 4, 4], [1.0; 3], (0..64).map(|i| i as f32).collect()).unwrap()
    }

    #[test]
    fn test_initialize_uploads_once_and_builds_all_luts() {
        let volume = volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let pipeline = RenderPipeline::initialize(RecordingBackend::default(), &volume, &tf, &Options::default()).unwrap();

        assert_eq!(pipeline.backend().volumes, 1);
        assert_eq!(pipeline.backend().luts, CurveKind::ALL.to_vec());
        assert_eq!(pipeline.luts().scalar_opacity.len(), 256);
    }

    #[test]
    fn test_budget_is_checked_before_upload() {
        let volume = volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let options = Options {
            max_volume_bytes: 100,
            ..Options::default()
        };
        let err = RenderPipeline::initialize(RecordingBackend::default(), &volume, &tf, &options)
            .err()
            .unwrap();
        assert_eq!(err, UploadError::ExceedsBudget { bytes: 128, budget: 100 });
    }

    #[test]
    fn test_backend_upload_error_propagates() {
        let volume = volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let backend = RecordingBackend {
            reject_upload: Some(UploadError::TooLarge { dimension: 4, limit: 2 }),
            ..RecordingBackend::default()
        };
        assert!(RenderPipeline::initialize(backend, &volume, &tf, &Options::default()).is_err());
    }

    #[test]
    fn test_rebuild_replaces_only_changed_table() {
        let volume = volume();
        let mut tf = TransferFunction::with_defaults(IntensityRange::new(0.0, 63.0));
        let mut pipeline = RenderPipeline::initialize(RecordingBackend::default(), &volume, &tf, &Options::default()).unwrap();
        let color_before = pipeline.luts().color.clone();

        tf.replace_curve(CurveUpdate::ScalarOpacity(vec![OpacityPoint::new(0.0, 1.0)]))
            .unwrap();
        pipeline.rebuild_lut(CurveKind::ScalarOpacity, &tf);

        assert_eq!(pipeline.backend().luts.last(), Some(&CurveKind::ScalarOpacity));
        assert!(pipeline.luts().scalar_opacity.entries().iter().all(|&v| v == 1.0));
        assert_eq!(pipeline.luts().color, color_before);
    }

    #[test]
    fn test_frames_are_counted() {
        let volume = volume();
        let tf = TransferFunction::with_defaults(volume.intensity_range());
        let mut pipeline = RenderPipeline::initialize(RecordingBackend::default(), &volume, &tf, &Options::default()).unwrap();
        let camera = Camera::default();
        pipeline.render_frame(&camera, &[]).unwrap();
        pipeline.render_frame(&camera, &[]).unwrap();
        assert_eq!(pipeline.frames_rendered(), 2);
        assert_eq!(pipeline.backend().draws, 2);
    }
}
