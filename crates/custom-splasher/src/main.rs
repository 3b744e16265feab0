use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::filter::EnvFilter;

use custom_splasher::{ConfigStore, DEFAULT_CONFIG_PATH, app};

const MEDIA_HELP: &str = "\
Still images (png, jpg, jpeg, jfif, bmp) and GIF animations play in every build.
mp4, flv, avi and ogv need a build with the `ffmpeg` feature. Without it the
default `video.mp4` cannot be opened: point `media.file` in the config at an
image or GIF instead.";

#[derive(Parser, Debug)]
#[command(
    name = "custom-splasher",
    version,
    about = "Show a splash overlay while a program launches",
    after_help = MEDIA_HELP
)]
struct Cli {
    /// Configuration file, created with defaults if missing
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Do not write the configuration back after loading it
    #[arg(long)]
    no_save: bool,

    /// Run without a window (timers and launching only)
    #[arg(long)]
    headless: bool,
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let store = ConfigStore::new(&cli.config);
    let config = store.load();
    if !cli.no_save {
        if let Err(e) = store.save(&config) {
            tracing::warn!("failed to save config: {e}");
        }
    }
    let snapshot = config.snapshot();

    if cli.headless {
        let state = app::run_headless(snapshot);
        tracing::info!(?state, "splash finished");
    } else if let Err(e) = app::run(snapshot) {
        tracing::error!("event loop failed: {e}");
    }

    // Failures are reported through the log only.
    ExitCode::SUCCESS
}
