//! Batch driver: one session per volume, strictly in order.

use std::fmt;
use std::path::{Path, PathBuf};

use volscope_core::{LoadError, Options, Volume, VolumeLoader};

use crate::error::SessionError;

/// Runs one session for a loaded volume until it is closed.
pub trait SessionRunner {
    /// Blocks until the session for `volume` is closed and returns the number
    /// of frames it rendered.
    fn run_session(&mut self, label: &str, volume: Volume, options: &Options) -> Result<u64, SessionError>;
}

/// What happened to one batch entry.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The session ran until it was closed.
    Completed { frames: u64 },
    /// The file could not be read; no session was started.
    LoadFailed(LoadError),
    /// The session was started but failed.
    SessionFailed(SessionError),
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// One processed path and its outcome.
#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub outcome: SessionOutcome,
}

/// Per-path outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Number of sessions that ran to completion.
    pub fn completed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_completed()).count()
    }

    /// Number of entries that were skipped or failed.
    pub fn failed(&self) -> usize {
        self.entries.len() - self.completed()
    }

    /// Returns whether every entry completed.
    pub fn all_completed(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} volumes completed", self.completed(), self.entries.len())
    }
}

/// Loads each volume and hands it to a [`SessionRunner`].
pub struct SessionDriver<L: VolumeLoader, R: SessionRunner> {
    loader: L,
    runner: R,
    options: Options,
}

impl<L: VolumeLoader, R: SessionRunner> SessionDriver<L, R> {
    pub fn new(loader: L, runner: R, options: Options) -> Self {
        Self { loader, runner, options }
    }

    /// Runs one session per path, in order. Failures skip to the next path.
    pub fn run_batch(&mut self, paths: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();
        for (index, path) in paths.iter().enumerate() {
            log::info!("Processing file: {} ({}/{})", path.display(), index + 1, paths.len());
            let outcome = self.run_one(path);
            match &outcome {
                SessionOutcome::Completed { frames } => {
                    log::info!("closed {} after {frames} frames", path.display());
                }
                SessionOutcome::LoadFailed(err) => log::error!("skipping {}: {err}", path.display()),
                SessionOutcome::SessionFailed(err) => log::error!("session for {} failed: {err}", path.display()),
            }
            report.entries.push(BatchEntry {
                path: path.clone(),
                outcome,
            });
        }
        log::info!("batch finished: {report}");
        report
    }

    fn run_one(&mut self, path: &Path) -> SessionOutcome {
        let volume = match self.loader.load(path) {
            Ok(volume) => volume,
            Err(err) => return SessionOutcome::LoadFailed(err),
        };
        log::debug!("{} loaded {} with {} voxels", self.loader.name(), path.display(), volume.voxel_count());

        let label = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
        match self.runner.run_session(&label, volume, &self.options) {
            Ok(frames) => SessionOutcome::Completed { frames },
            Err(err) => SessionOutcome::SessionFailed(err),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn into_runner(self) -> R {
        self.runner
    }
}

/// Expands `inputs` into volume files.
///
/// Directories contribute their files whose extension matches `extension`
/// (case-insensitive), sorted by path; other inputs pass through unchanged.
pub fn collect_volume_paths(inputs: &[PathBuf], extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.');
    let mut paths = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in std::fs::read_dir(input)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension));
            if path.is_file() && matches {
                found.push(path);
            }
        }
        found.sort();
        log::debug!("found {} .{extension} files in {}", found.len(), input.display());
        paths.extend(found);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_filters_and_sorts_directory() {
        let dir = std::env::temp_dir().join(format!("volscope_collect_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.NRRD", "a.nrrd", "notes.txt", "c.nhdr"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        let explicit = PathBuf::from("elsewhere/explicit.raw");

        let paths = collect_volume_paths(&[dir.clone(), explicit.clone()], "nrrd").unwrap();
        assert_eq!(paths, vec![dir.join("a.nrrd"), dir.join("b.NRRD"), explicit]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            entries: vec![
                BatchEntry {
                    path: "a".into(),
                    outcome: SessionOutcome::Completed { frames: 3 },
                },
                BatchEntry {
                    path: "b".into(),
                    outcome: SessionOutcome::SessionFailed(SessionError::EventLoop("gone".into())),
                },
            ],
        };
        assert_eq!(report.completed(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_completed());
        assert_eq!(report.to_string(), "1 of 2 volumes completed");
    }
}
