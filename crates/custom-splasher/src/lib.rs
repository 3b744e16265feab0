//! Custom Splasher: a splash overlay shown while a program launches.
//!
//! The overlay plays a still image or a video in a borderless, always-on-top
//! window centred on screen. After a configurable delay it starts the target
//! program, and a second delay later it tears itself down.
//!
//! - [`config`]: the JSON configuration file and the per-run [`Snapshot`]
//! - [`lifecycle`]: the [`SplashLifecycle`] state machine driving a run
//! - [`surface`] and [`launcher`]: the window and process collaborators
//! - [`overlay`]: the winit + wgpu overlay window
//! - [`app`]: event-loop and headless drivers
//!
//! # Headless Example
//!
//! ```no_run
//! use custom_splasher::{ConfigStore, app};
//!
//! let config = ConfigStore::default().load();
//! app::run_headless(config.snapshot());
//! ```

pub mod app;
pub mod config;
mod error;
pub mod geometry;
pub mod launcher;
pub mod lifecycle;
pub mod overlay;
pub mod surface;

pub use config::{ConfigStore, DEFAULT_CONFIG_PATH, SplashConfig, Snapshot};
pub use error::{ConfigCoercionError, ConfigError, InitError, LaunchError, SurfaceError};
pub use geometry::OverlayGeometry;
pub use launcher::{ProcessLauncher, SystemLauncher};
pub use lifecycle::{LifecycleState, ShutdownReason, SplashAction, SplashLifecycle};
pub use surface::{NullSurface, Surface};
