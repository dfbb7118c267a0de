//! Headless GPU rendering integration tests.
//!
//! These need a GPU adapter (real or software fallback). Without one they
//! print a message and return early.

use volscope_core::{CurveKind, CurveUpdate, OpacityPoint, Options, TransferFunction, Volume};
use volscope_render::*;

/// A sphere of bright voxels in a dark 24^3 grid.
fn sphere_volume() -> Volume {
    let n = 24usize;
    let center = (n as f32 - 1.0) * 0.5;
    let mut samples = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let d = ((x as f32 - center).powi(2) + (y as f32 - center).powi(2) + (z as f32 - center).powi(2)).sqrt();
                samples.push(if d < 8.0 { 1000.0 } else { 0.0 });
            }
        }
    }
    Volume::new([n, n, n], [1.0; 3], samples).unwrap()
}

fn fitted_camera(volume: &Volume, aspect: f32) -> Camera {
    let (min, max) = volume.bounds();
    let mut camera = Camera::new(aspect);
    camera.fit_box(min, max);
    camera
}

fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let offset = ((y * width + x) * 4) as usize;
    [pixels[offset], pixels[offset + 1], pixels[offset + 2], pixels[offset + 3]]
}

#[test]
fn headless_render_tests() {
    let context = match GpuContext::headless() {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Skipping headless tests: no GPU adapter available ({e})");
            return;
        }
    };

    let volume = sphere_volume();
    let mut tf = TransferFunction::with_defaults(volume.intensity_range());
    let options = Options::default();
    let (width, height) = (96, 72);
    let camera = fitted_camera(&volume, width as f32 / height as f32);

    let backend = GpuBackend::headless(context.clone(), width, height);
    let mut pipeline = RenderPipeline::initialize(backend, &volume, &tf, &options).expect("upload failed");

    // --- Frame content ---
    pipeline.render_frame(&camera, &[]).expect("render failed");
    let first = pipeline.read_pixels().expect("readback failed");
    assert_eq!(first.len(), (width * height * 4) as usize);

    let background = (0.1f32 * 255.0).round() as u8;
    let corner = pixel(&first, width, 0, 0);
    assert!(corner[..3].iter().all(|&c| c.abs_diff(background) <= 1), "corner is {corner:?}");
    let center = pixel(&first, width, width / 2, height / 2);
    assert!(center[..3].iter().any(|&c| c.abs_diff(background) > 10), "center is {center:?}");

    // --- Same state, same image ---
    pipeline.render_frame(&camera, &[]).expect("render failed");
    assert_eq!(first, pipeline.read_pixels().unwrap());

    // --- Agreement with the CPU backend ---
    let mut software = RenderPipeline::initialize(SoftwareBackend::new(width, height), &volume, &tf, &options).unwrap();
    software.render_frame(&camera, &[]).unwrap();
    let reference = software.read_pixels().unwrap();
    let total_diff: u64 = first
        .iter()
        .zip(&reference)
        .map(|(&a, &b)| u64::from(a.abs_diff(b)))
        .sum();
    let mean_diff = total_diff as f64 / first.len() as f64;
    assert!(mean_diff < 8.0, "GPU and CPU frames differ by {mean_diff:.2} on average");

    // --- A LUT change is visible in the next frame ---
    tf.replace_curve(CurveUpdate::ScalarOpacity(vec![OpacityPoint::new(0.0, 0.0)]))
        .unwrap();
    pipeline.rebuild_lut(CurveKind::ScalarOpacity, &tf);
    pipeline.render_frame(&camera, &[]).unwrap();
    let transparent = pipeline.read_pixels().unwrap();
    let center = pixel(&transparent, width, width / 2, height / 2);
    assert!(center[..3].iter().all(|&c| c.abs_diff(background) <= 1), "center is {center:?}");

    // --- Resize ---
    pipeline.resize(40, 30);
    pipeline.render_frame(&fitted_camera(&volume, 40.0 / 30.0), &[]).unwrap();
    assert_eq!(pipeline.read_pixels().unwrap().len(), 40 * 30 * 4);

    // --- Over-limit volumes are rejected before allocation ---
    let limit = context.max_volume_dimension();
    if limit < 1 << 16 {
        let long = Volume::new([1, 1, limit as usize + 1], [1.0; 3], vec![0.0; limit as usize + 1]).unwrap();
        let backend = GpuBackend::headless(context.clone(), 8, 8);
        let err = RenderPipeline::initialize(backend, &long, &tf, &options).err().unwrap();
        assert_eq!(err, UploadError::TooLarge { dimension: limit + 1, limit });
    }
}
