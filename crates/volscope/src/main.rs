//! volscope CLI: opens one window per volume, or writes PNG snapshots.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use volscope::{collect_volume_paths, HeadlessRunner, NrrdLoader, Options, SessionDriver, WindowedRunner};

#[derive(Parser, Debug)]
#[command(name = "volscope")]
#[command(about = "Interactive volume rendering with slider-driven transfer functions", long_about = None)]
struct Cli {
    /// Volume files or directories of volumes, processed in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Extension of volume files picked from directories (overrides the config)
    #[arg(short, long)]
    extension: Option<String>,

    /// JSON options file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render one PNG per volume into this directory instead of opening windows
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Render snapshots on the CPU even if a GPU is available
    #[arg(long, requires = "snapshot_dir")]
    software: bool,
}

fn main() -> ExitCode {
    let _ = env_logger::try_init();
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => match Options::from_json_file(path) {
            Ok(options) => options,
            Err(err) => {
                log::error!("failed to read {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Options::default(),
    };

    let extension = cli.extension.as_deref().unwrap_or(&options.volume_extension);
    let paths = match collect_volume_paths(&cli.inputs, extension) {
        Ok(paths) => paths,
        Err(err) => {
            log::error!("failed to list inputs: {err}");
            return ExitCode::FAILURE;
        }
    };
    if paths.is_empty() {
        log::error!("no .{extension} volumes found");
        return ExitCode::FAILURE;
    }

    let report = match cli.snapshot_dir {
        Some(dir) => SessionDriver::new(NrrdLoader, HeadlessRunner::new(dir, cli.software), options).run_batch(&paths),
        None => match WindowedRunner::new() {
            Ok(runner) => SessionDriver::new(NrrdLoader, runner, options).run_batch(&paths),
            Err(err) => {
                log::error!("{err}");
                return ExitCode::FAILURE;
            }
        },
    };

    if report.all_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
