//! Error types for the splash application.

use std::io;
use std::path::PathBuf;

use custom_splasher_media::MediaError;
use thiserror::Error;

/// Errors from the overlay surface.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The overlay window could not be created.
    #[error("failed to create overlay window: {0}")]
    Window(#[from] winit::error::OsError),

    /// Failed to create the GPU surface for the window.
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    /// No suitable graphics adapter was found.
    #[error("no suitable graphics adapter found")]
    NoAdapter,

    /// Failed to request a graphics device.
    #[error("failed to request graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// The surface cannot present frames the way the overlay needs.
    #[error("surface unsupported: {0}")]
    Unsupported(String),

    /// Acquiring or presenting a frame failed.
    #[error("failed to present frame: {0}")]
    Present(#[from] wgpu::SurfaceError),

    /// The overlay could not be brought to the foreground.
    #[error("foreground request failed: {0}")]
    Foreground(String),

    /// The surface was used after it was closed.
    #[error("surface is closed")]
    Closed,
}

/// Errors from starting the target program or the pre-launch command.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The command could not be started.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The pre-launch command ran but reported failure.
    #[error("`{command}` exited with {status}")]
    ExitStatus { command: String, status: String },
}

/// Errors that abort a run before the overlay shows anything.
#[derive(Error, Debug)]
pub enum InitError {
    /// The media file could not be opened.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// The overlay surface could not be styled.
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    /// `start` was called on a lifecycle that already left `Initializing`.
    #[error("splash lifecycle already started")]
    AlreadyStarted,
}

/// Errors from reading or writing the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error on the configuration file.
    #[error("config I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration could not be parsed or serialized.
    #[error("invalid config JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A configuration value that was out of range and got clamped.
///
/// Never fatal; reported as a warning when the snapshot is taken.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("config field `{field}` = {value} is out of range, using {coerced}")]
pub struct ConfigCoercionError {
    pub field: &'static str,
    pub value: String,
    pub coerced: String,
}
