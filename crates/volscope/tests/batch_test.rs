//! Batch and session integration tests on the software backend.
//!
//! Volumes are written as NRRD files to a temporary directory, loaded through
//! the real loader and driven by scripted pointer input; no window or GPU is
//! needed.

use std::path::{Path, PathBuf};

use proptest::prelude::*;
use volscope::*;

struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("volscope_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Writes an `n`^3 float ramp as a raw little-endian NRRD file.
fn write_ramp(dir: &Path, name: &str, n: usize) -> PathBuf {
    let mut bytes = format!(
        "NRRD0004\ntype: float\ndimension: 3\nsizes: {n} {n} {n}\nspacings: 1 1 1\nencoding: raw\nendian: little\n\n"
    )
    .into_bytes();
    for i in 0..n * n * n {
        bytes.extend_from_slice(&((i % n) as f32 * 10.0).to_le_bytes());
    }
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Writes a 10^3 volume whose intensities cycle through 0..=99.
fn write_hundred_levels(dir: &Path, name: &str) -> PathBuf {
    let mut bytes = b"NRRD0004\ntype: float\ndimension: 3\nsizes: 10 10 10\nencoding: raw\nendian: little\n\n".to_vec();
    for i in 0..1000 {
        bytes.extend_from_slice(&((i % 100) as f32).to_le_bytes());
    }
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn slider_center(options: &Options, index: usize, fraction: f32) -> (f32, f32) {
    let layout = &options.controls;
    let x = layout.left + layout.width * fraction;
    let y = layout.top + index as f32 * (layout.height + layout.spacing) + layout.height * 0.5;
    (x, y)
}

#[test]
fn batch_continues_past_load_failures() {
    let dir = TempDir::new("load_failures");
    let first = write_ramp(dir.path(), "first.nrrd", 4);
    let broken = dir.path().join("broken.nrrd");
    std::fs::write(&broken, b"NRRD0004\ntype: float\ndimension: 3\n\n").unwrap();
    let second = write_ramp(dir.path(), "second.nrrd", 4);
    let missing = dir.path().join("missing.nrrd");

    let paths = vec![missing, first, broken, second];
    let mut driver = SessionDriver::new(NrrdLoader, ScriptedRunner::new(Vec::new()), Options::default());
    let report = driver.run_batch(&paths);

    assert_eq!(report.entries.len(), 4);
    assert!(matches!(report.entries[0].outcome, SessionOutcome::LoadFailed(LoadError::Io { .. })));
    assert!(report.entries[1].outcome.is_completed());
    assert!(matches!(report.entries[2].outcome, SessionOutcome::LoadFailed(_)));
    assert!(report.entries[3].outcome.is_completed());
    assert_eq!(report.completed(), 2);

    let labels: Vec<_> = driver.runner().finished().iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, ["first", "second"]);
}

#[test]
fn unreadable_first_volume_does_not_stop_the_second() {
    let dir = TempDir::new("two_paths");
    let unreadable = dir.path().join("unreadable.nrrd");
    let volume = write_hundred_levels(dir.path(), "levels.nrrd");

    let mut driver = SessionDriver::new(NrrdLoader, ScriptedRunner::new(Vec::new()), Options::default());
    let report = driver.run_batch(&[unreadable, volume]);

    assert_eq!(report.entries.len(), 2);
    assert!(matches!(report.entries[0].outcome, SessionOutcome::LoadFailed(_)));
    match report.entries[1].outcome {
        SessionOutcome::Completed { frames } => assert!(frames >= 1),
        ref other => panic!("second volume did not complete: {other:?}"),
    }

    let finished = &driver.runner().finished()[0];
    assert_eq!(finished.label, "levels");
    let tf = &finished.transfer_function;
    assert_eq!(tf.domain().min, 0.0);
    assert_eq!(tf.domain().max, 99.0);
    assert_eq!(tf.scalar_opacity().sample(0.0), 0.0);
}

#[test]
fn upload_failure_aborts_only_that_session() {
    let dir = TempDir::new("upload_failure");
    let large = write_ramp(dir.path(), "large.nrrd", 8);
    let small = write_ramp(dir.path(), "small.nrrd", 4);

    let runner = ScriptedRunner::new(Vec::new()).with_max_dimension(4);
    let mut driver = SessionDriver::new(NrrdLoader, runner, Options::default());
    let report = driver.run_batch(&[large, small]);

    assert!(matches!(
        report.entries[0].outcome,
        SessionOutcome::SessionFailed(SessionError::Upload(UploadError::TooLarge { dimension: 8, limit: 4 }))
    ));
    assert!(report.entries[1].outcome.is_completed());
}

#[test]
fn volume_over_byte_budget_is_rejected() {
    let dir = TempDir::new("budget");
    let path = write_ramp(dir.path(), "ramp.nrrd", 4);
    let options = Options {
        max_volume_bytes: 64,
        ..Options::default()
    };

    let mut driver = SessionDriver::new(NrrdLoader, ScriptedRunner::new(Vec::new()), options);
    let report = driver.run_batch(&[path]);
    assert!(matches!(
        report.entries[0].outcome,
        SessionOutcome::SessionFailed(SessionError::Upload(UploadError::ExceedsBudget { bytes: 128, budget: 64 }))
    ));
}

#[test]
fn scripted_drags_reshape_the_transfer_function() {
    let dir = TempDir::new("script");
    let path = write_ramp(dir.path(), "ramp.nrrd", 4);
    let options = Options::default();

    let (ox, oy) = slider_center(&options, 0, 0.3);
    let (rx, ry) = slider_center(&options, 2, 1.0);
    let script = vec![
        PointerEvent::Down { x: ox, y: oy },
        PointerEvent::Up,
        PointerEvent::Down { x: rx, y: ry },
        PointerEvent::Up,
    ];
    let mut driver = SessionDriver::new(NrrdLoader, ScriptedRunner::new(script), options);
    let report = driver.run_batch(&[path]);

    // One initial frame plus one per applied change.
    assert!(matches!(report.entries[0].outcome, SessionOutcome::Completed { frames: 3 }));

    let tf = &driver.runner().finished()[0].transfer_function;
    let opacity = tf.scalar_opacity().points();
    assert_eq!(opacity[0].output, 0.0);
    assert!((opacity[1].output - 0.3).abs() < 1e-3);
    assert!((opacity[2].output - 0.3).abs() < 1e-3);

    let first_color = tf.color().first().output;
    assert!((first_color.x - 1.0).abs() < 1e-3);
    assert!((first_color.y - 0.25098).abs() < 1e-4);
    assert!((first_color.z - 0.14902).abs() < 1e-4);
}

#[test]
fn directory_inputs_expand_in_sorted_order() {
    let dir = TempDir::new("collect");
    write_ramp(dir.path(), "b.nrrd", 4);
    write_ramp(dir.path(), "a.NRRD", 4);
    std::fs::write(dir.path().join("readme.txt"), b"not a volume").unwrap();

    let paths = collect_volume_paths(&[dir.path().to_path_buf()], "nrrd").unwrap();
    let names: Vec<_> = paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
    assert_eq!(names, ["a.NRRD", "b.nrrd"]);
}

fn pointer_event(options: &Options) -> impl Strategy<Value = PointerEvent> {
    let width = options.controls.left * 2.0 + options.controls.width;
    let height = options.controls.top * 2.0 + 5.0 * (options.controls.height + options.controls.spacing);
    prop_oneof![
        4 => (0.0..width, 0.0..height).prop_map(|(x, y)| PointerEvent::Down { x, y }),
        4 => (0.0..width, 0.0..height).prop_map(|(x, y)| PointerEvent::Move { x, y }),
        3 => Just(PointerEvent::Up),
        1 => Just(PointerEvent::CloseRequested),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn touched_curves_match_slider_values(events in prop::collection::vec(pointer_event(&Options::default()), 1..24)) {
        let options = Options::default();
        let volume = Volume::new([4, 4, 4], [1.0; 3], (0..64).map(|i| i as f32).collect()).unwrap();
        let mut session = Session::new("prop", volume, SoftwareBackend::new(8, 8), &options).unwrap();
        let mut closed = false;
        let mut touched = Vec::new();

        for event in events {
            let outcome = session.handle_pointer(event).unwrap();
            if closed {
                prop_assert_eq!(outcome, InteractionOutcome::Ignored);
            }
            if let InteractionOutcome::ControlChanged(change) = outcome {
                touched.push(change.control);
            }
            closed |= event == PointerEvent::CloseRequested;
        }

        let controls = session.controller().controls();
        let tf = session.transfer_function();
        if touched.contains(&ControlId::SCALAR_OPACITY) {
            let scalar = controls.value(ControlId::SCALAR_OPACITY).unwrap();
            prop_assert!((tf.scalar_opacity().last().output - scalar).abs() < 1e-6);
        }
        if touched.contains(&ControlId::GRADIENT_OPACITY) {
            let gradient = controls.value(ControlId::GRADIENT_OPACITY).unwrap();
            prop_assert!((tf.gradient_opacity().last().output - gradient).abs() < 1e-6);
        }

        let channels = [ControlId::COLOR_R, ControlId::COLOR_G, ControlId::COLOR_B];
        if channels.iter().any(|id| touched.contains(id)) {
            let first = tf.color().first().output;
            for (channel, id) in channels.into_iter().enumerate() {
                prop_assert!((first[channel] - controls.value(id).unwrap()).abs() < 1e-6);
            }
        }

        // Every LUT entry stays a valid opacity.
        let luts = session.pipeline().luts();
        prop_assert!(luts.scalar_opacity.entries().iter().all(|v| (0.0..=1.0).contains(v)));
        prop_assert!(luts.gradient_opacity.entries().iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
